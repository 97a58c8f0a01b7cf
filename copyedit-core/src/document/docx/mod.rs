//! Word (.docx) document store
//!
//! Reads the zip package, exposes the text-bearing structure of the main
//! document part and its header/footer parts as a [`Document`], and writes
//! modified runs back into the original markup.
//!
//! ```text
//! .docx ──▶ DocxPackage (zip entries + parsed parts) ──▶ Document
//!                                                          │ rewrite runs
//! .docx ◀── re-serialize modified parts, copy the rest ◀───┘
//! ```

mod package;
mod reader;
mod writer;
mod xml;

pub(crate) use package::DocxPackage;

use super::model::Document;
use super::store::{has_extension, DocumentStore};
use crate::error::{CopyeditError, CopyeditResult};
use std::path::Path;
use tracing::info;

/// Where a paragraph lives in its part's event list
#[derive(Debug, Clone)]
pub(crate) struct ParagraphAnchor {
    pub part: usize,
    pub start: usize,
    pub end: usize,
}

/// Where a run and its text children live in its part's event list
#[derive(Debug, Clone)]
pub(crate) struct RunAnchor {
    pub part: usize,
    pub start: usize,
    pub end: usize,
    /// (start, end) event indices of each text child
    pub content: Vec<(usize, usize)>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxStore;

impl DocxStore {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore for DocxStore {
    fn name(&self) -> &str {
        "docx"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["docx"])
    }

    fn open(&self, path: &Path) -> CopyeditResult<Document> {
        if !self.supports_file_type(path) {
            return Err(CopyeditError::UnsupportedFormat(path.to_path_buf()));
        }
        let package = DocxPackage::read(path)?;
        let document = reader::read_document(package)?;
        info!(path = %path.display(), "opened docx document");
        Ok(document)
    }

    fn save(&self, document: &Document, path: &Path) -> CopyeditResult<()> {
        writer::write_document(document, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HeaderFooterKind;
    use std::io::{Cursor, Read, Write};
    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::{ZipArchive, ZipWriter};

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body><w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>Absent the </w:t></w:r><w:r><w:t>plan</w:t><w:tab/><w:t>now</w:t></w:r></w:p><w:p/><w:p><w:hyperlink r:id="rId9"><w:r><w:t>link</w:t></w:r></w:hyperlink></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>a1</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>b1</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:sectPr><w:headerReference w:type="first" r:id="rId3"/><w:headerReference w:type="default" r:id="rId2"/><w:footerReference w:type="default" r:id="rId4"/></w:sectPr></w:body></w:document>"#;

    const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header2.xml"/><Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer" Target="footer1.xml"/><Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/></Relationships>"#;

    fn header_part(root: &str, text: &str) -> String {
        format!(
            r#"<w:{root} xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:{root}>"#
        )
    }

    fn write_sample(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("sample.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        let header1 = header_part("hdr", "Default header");
        let header2 = header_part("hdr", "First page header");
        let footer1 = header_part("ftr", "Page footer");
        let files: [(&str, &str); 6] = [
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", DOCUMENT),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS),
            ("word/header1.xml", &header1),
            ("word/header2.xml", &header2),
            ("word/footer1.xml", &footer1),
        ];
        for (name, content) in files {
            zip.start_file(name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    fn read_entry(path: &Path, name: &str) -> String {
        let bytes = std::fs::read(path).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_open_reads_structure() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir);
        let document = DocxStore::new().open(&path).unwrap();

        let body: Vec<String> = document.body.iter().map(|p| p.text()).collect();
        assert_eq!(body, vec!["Absent the plan\tnow", "", "link"]);
        assert_eq!(document.body[0].runs().len(), 2);
        assert!(document.body[1].runs().is_empty());

        assert_eq!(document.tables.len(), 1);
        assert_eq!(document.tables[0].rows[0].cells.len(), 2);
        assert_eq!(document.tables[0].rows[0].cells[1].paragraphs[0].text(), "b1");

        assert_eq!(document.sections.len(), 1);
        let section = &document.sections[0];
        let header_kinds: Vec<HeaderFooterKind> = section.headers.iter().map(|h| h.kind).collect();
        assert_eq!(
            header_kinds,
            vec![HeaderFooterKind::Default, HeaderFooterKind::FirstPage]
        );
        assert_eq!(section.headers[0].paragraphs[0].text(), "Default header");
        assert_eq!(section.footers[0].part, "word/footer1.xml");
        assert!(document.has_package());
    }

    #[test]
    fn test_save_rewrites_only_modified_parts() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir);
        let store = DocxStore::new();
        let mut document = store.open(&path).unwrap();

        document.body[0].replace_text("Without the plan\tnow & then");
        document.body[1].replace_text("Second");
        let output = dir.path().join("out.docx");
        store.save(&document, &output).unwrap();

        let xml = read_entry(&output, "word/document.xml");
        assert!(xml.contains(
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Without the plan</w:t><w:tab/><w:t xml:space="preserve">now &amp; then</w:t></w:r>"#
        ));
        assert!(xml.contains(r#"<w:p><w:r><w:t xml:space="preserve">Second</w:t></w:r></w:p>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="Title"/>"#));
        // untouched header is copied verbatim
        assert_eq!(
            read_entry(&output, "word/header1.xml"),
            header_part("hdr", "Default header")
        );

        let reopened = store.open(&output).unwrap();
        assert_eq!(reopened.body[0].text(), "Without the plan\tnow & then");
        assert_eq!(reopened.body[1].text(), "Second");
        assert_eq!(reopened.body[2].text(), "link");
        assert_eq!(reopened.tables[0].rows[0].cells[0].paragraphs[0].text(), "a1");
    }

    #[test]
    fn test_save_unmodified_is_identical() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir);
        let store = DocxStore::new();
        let document = store.open(&path).unwrap();

        let output = dir.path().join("copy.docx");
        store.save(&document, &output).unwrap();
        assert_eq!(read_entry(&output, "word/document.xml"), DOCUMENT);
    }

    #[test]
    fn test_header_edits_stay_in_header_part() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir);
        let store = DocxStore::new();
        let mut document = store.open(&path).unwrap();

        document.sections[0].footers[0].paragraphs[0].replace_text("Confidential");
        let output = dir.path().join("footer.docx");
        store.save(&document, &output).unwrap();

        assert!(read_entry(&output, "word/footer1.xml").contains("Confidential"));
        assert_eq!(read_entry(&output, "word/document.xml"), DOCUMENT);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = DocxStore::new().open(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, CopyeditError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_save_without_package() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("never.docx");
        let err = DocxStore::new().save(&Document::new(), &output).unwrap_err();
        assert!(matches!(err, CopyeditError::NoPackage));
        assert!(!output.exists());
    }

    #[test]
    fn test_corrupt_package_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(
            DocxStore::new().open(&path),
            Err(CopyeditError::Zip(_))
        ));
    }
}
