// Document traversal and reconciliation
//
// Enumerates every text-bearing paragraph of a document exactly once, in a
// fixed order (body, table cells, headers, footers), runs each one through
// the pipeline, and writes changed text back into the paragraph's runs.

use crate::config::PipelineConfig;
use crate::document::{Document, Paragraph};
use crate::pipeline::TextPipeline;
use crate::types::{StageFailure, UnitChange, UnitLocation};
use tracing::debug;

/// One paragraph-equivalent block of text plus a handle to write it back
#[derive(Debug)]
pub struct TextUnit<'a> {
    pub location: UnitLocation,
    pub original_text: String,
    paragraph: &'a mut Paragraph,
}

impl<'a> TextUnit<'a> {
    fn new(location: UnitLocation, paragraph: &'a mut Paragraph) -> Self {
        Self {
            location,
            original_text: paragraph.text(),
            paragraph,
        }
    }

    pub fn paragraph(&self) -> &Paragraph {
        self.paragraph
    }

    /// Replace the unit's text as a single run (see [`Paragraph::replace_text`])
    pub fn rewrite(&mut self, text: &str) {
        self.paragraph.replace_text(text);
    }
}

/// Every text unit of `document` in traversal order:
/// body paragraphs, table cells (row by row), then all section headers,
/// then all section footers.
pub fn text_units(document: &mut Document) -> Vec<TextUnit<'_>> {
    let Document {
        body,
        tables,
        sections,
        ..
    } = document;
    let mut units = Vec::new();

    for (index, paragraph) in body.iter_mut().enumerate() {
        units.push(TextUnit::new(UnitLocation::Body { paragraph: index }, paragraph));
    }

    for (t, table) in tables.iter_mut().enumerate() {
        for (r, row) in table.rows.iter_mut().enumerate() {
            for (c, cell) in row.cells.iter_mut().enumerate() {
                for (p, paragraph) in cell.paragraphs.iter_mut().enumerate() {
                    let location = UnitLocation::TableCell {
                        table: t,
                        row: r,
                        cell: c,
                        paragraph: p,
                    };
                    units.push(TextUnit::new(location, paragraph));
                }
            }
        }
    }

    let (headers, footers): (Vec<_>, Vec<_>) = sections
        .iter_mut()
        .map(|s| (&mut s.headers, &mut s.footers))
        .unzip();

    for (s, parts) in headers.into_iter().enumerate() {
        for part in parts {
            let variant = part.kind;
            for (p, paragraph) in part.paragraphs.iter_mut().enumerate() {
                let location = UnitLocation::Header {
                    section: s,
                    variant,
                    paragraph: p,
                };
                units.push(TextUnit::new(location, paragraph));
            }
        }
    }

    for (s, parts) in footers.into_iter().enumerate() {
        for part in parts {
            let variant = part.kind;
            for (p, paragraph) in part.paragraphs.iter_mut().enumerate() {
                let location = UnitLocation::Footer {
                    section: s,
                    variant,
                    paragraph: p,
                };
                units.push(TextUnit::new(location, paragraph));
            }
        }
    }

    units
}

/// What a traversal did to a document
#[derive(Debug, Clone, Default)]
pub struct TraversalSummary {
    pub units_visited: usize,
    pub changes: Vec<UnitChange>,
    pub stage_failures: Vec<StageFailure>,
}

/// Run `pipeline` over every text unit and rewrite the units whose text
/// changed. Units whose text comes back identical are not touched.
pub fn rewrite_document(
    document: &mut Document,
    pipeline: &TextPipeline,
    config: &PipelineConfig,
) -> TraversalSummary {
    let mut summary = TraversalSummary::default();

    for mut unit in text_units(document) {
        summary.units_visited += 1;
        let (processed, failures) = pipeline.process_traced(&unit.original_text, config);
        summary.stage_failures.extend(failures);

        if processed == unit.original_text {
            continue;
        }

        debug!(location = %unit.location, "rewriting text unit");
        unit.rewrite(&processed);
        summary.changes.push(UnitChange {
            location: unit.location.clone(),
            before: std::mem::take(&mut unit.original_text),
            after: processed,
        });
    }

    summary
}
