// In-memory document model
//
// Mirrors the shape of a word-processing document as far as text rewriting
// needs it: body paragraphs, tables, and per-section headers and footers.
// Runs keep an anchor back into the container they were read from so a
// store can write modified runs back in place.

use super::docx::{DocxPackage, ParagraphAnchor, RunAnchor};
use crate::types::HeaderFooterKind;

/// Smallest writable text segment of a paragraph
#[derive(Debug, Clone, Default)]
pub struct Run {
    text: String,
    modified: bool,
    pub(crate) anchor: Option<RunAnchor>,
}

impl Run {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            modified: false,
            anchor: None,
        }
    }

    pub(crate) fn anchored(text: String, anchor: RunAnchor) -> Self {
        Self {
            text,
            modified: false,
            anchor: Some(anchor),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the run's text and mark it for write-back
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Run created in memory, not read from a container
    pub fn is_detached(&self) -> bool {
        self.anchor.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    runs: Vec<Run>,
    pub(crate) anchor: Option<ParagraphAnchor>,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraph holding one run per segment
    pub fn from_runs<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            runs: segments.into_iter().map(|s| Run::new(s.as_ref())).collect(),
            anchor: None,
        }
    }

    pub(crate) fn with_anchor(runs: Vec<Run>, anchor: ParagraphAnchor) -> Self {
        Self {
            runs,
            anchor: Some(anchor),
        }
    }

    /// Full paragraph text: the concatenation of its runs
    pub fn text(&self) -> String {
        self.runs.iter().map(Run::text).collect()
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn runs_mut(&mut self) -> &mut [Run] {
        &mut self.runs
    }

    /// Append a new run holding `text`
    pub fn add_run(&mut self, text: &str) -> &mut Run {
        self.runs.push(Run {
            text: text.to_string(),
            modified: true,
            anchor: None,
        });
        let last = self.runs.len() - 1;
        &mut self.runs[last]
    }

    /// Collapse the paragraph to a single piece of text. The first run gets
    /// the whole string, every other run is emptied, and a run is added when
    /// the paragraph had none. Run-level formatting boundaries are lost.
    pub fn replace_text(&mut self, text: &str) {
        match self.runs.split_first_mut() {
            Some((first, rest)) => {
                first.set_text(text);
                for run in rest {
                    run.set_text("");
                }
            }
            None => {
                self.add_run(text);
            }
        }
    }

    pub fn is_modified(&self) -> bool {
        self.runs.iter().any(|r| r.modified)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cell {
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default)]
pub struct Row {
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<Row>,
}

/// One header or footer part referenced by a section
#[derive(Debug, Clone)]
pub struct HeaderFooter {
    pub kind: HeaderFooterKind,
    /// Container part the paragraphs were read from (e.g. `word/header1.xml`)
    pub part: String,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default)]
pub struct Section {
    pub headers: Vec<HeaderFooter>,
    pub footers: Vec<HeaderFooter>,
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    pub body: Vec<Paragraph>,
    pub tables: Vec<Table>,
    pub sections: Vec<Section>,
    pub(crate) package: Option<DocxPackage>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the document was read from a container it can be saved back to
    pub fn has_package(&self) -> bool {
        self.package.is_some()
    }

    /// Every paragraph in traversal order
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        let cells = self
            .tables
            .iter()
            .flat_map(|t| &t.rows)
            .flat_map(|r| &r.cells)
            .flat_map(|c| &c.paragraphs);
        let headers = self
            .sections
            .iter()
            .flat_map(|s| &s.headers)
            .flat_map(|h| &h.paragraphs);
        let footers = self
            .sections
            .iter()
            .flat_map(|s| &s.footers)
            .flat_map(|f| &f.paragraphs);
        self.body.iter().chain(cells).chain(headers).chain(footers)
    }

    pub fn is_modified(&self) -> bool {
        self.paragraphs().any(Paragraph::is_modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_text_concatenates_runs() {
        let paragraph = Paragraph::from_runs(["The ", "quick", " fox"]);
        assert_eq!(paragraph.text(), "The quick fox");
        assert!(!paragraph.is_modified());
    }

    #[test]
    fn test_replace_text_collapses_runs() {
        let mut paragraph = Paragraph::from_runs(["absent ", "the", " deadline"]);
        paragraph.replace_text("without the deadline");

        let texts: Vec<&str> = paragraph.runs().iter().map(Run::text).collect();
        assert_eq!(texts, vec!["without the deadline", "", ""]);
        assert!(paragraph.runs().iter().all(Run::is_modified));
        assert_eq!(paragraph.text(), "without the deadline");
    }

    #[test]
    fn test_replace_text_adds_run_when_empty() {
        let mut paragraph = Paragraph::new();
        paragraph.replace_text("fresh");
        assert_eq!(paragraph.runs().len(), 1);
        assert_eq!(paragraph.runs()[0].text(), "fresh");
        assert!(paragraph.runs()[0].is_detached());
        assert!(paragraph.is_modified());
    }

    #[test]
    fn test_document_paragraph_order() {
        let document = Document {
            body: vec![Paragraph::from_runs(["body"])],
            tables: vec![Table {
                rows: vec![Row {
                    cells: vec![Cell {
                        paragraphs: vec![Paragraph::from_runs(["cell"])],
                    }],
                }],
            }],
            sections: vec![Section {
                headers: vec![HeaderFooter {
                    kind: HeaderFooterKind::Default,
                    part: "word/header1.xml".to_string(),
                    paragraphs: vec![Paragraph::from_runs(["header"])],
                }],
                footers: vec![HeaderFooter {
                    kind: HeaderFooterKind::Default,
                    part: "word/footer1.xml".to_string(),
                    paragraphs: vec![Paragraph::from_runs(["footer"])],
                }],
            }],
            package: None,
        };

        let texts: Vec<String> = document.paragraphs().map(Paragraph::text).collect();
        assert_eq!(texts, vec!["body", "cell", "header", "footer"]);
        assert!(!document.is_modified());
        assert!(!document.has_package());
    }
}
