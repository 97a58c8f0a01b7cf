//! Document layer
//!
//! ```text
//! file ──[DocumentStore::open]──▶ Document ──[traversal]──▶ Document ──[DocumentStore::save]──▶ file
//! ```
//!
//! - `model` - in-memory paragraphs, runs, tables, sections
//! - `store` - the `DocumentStore` seam
//! - `docx` - Word package implementation

pub mod docx;
pub mod model;
pub mod store;

pub use docx::DocxStore;
pub use model::{Cell, Document, HeaderFooter, Paragraph, Row, Run, Section, Table};
pub use store::DocumentStore;
