// Document container abstraction
//
// This is the boundary between the on-disk document format and the text
// pipeline. Everything above it works on the in-memory `Document` model.

use super::model::Document;
use crate::error::CopyeditResult;
use std::path::Path;

/// Opens and saves one document container format
pub trait DocumentStore {
    /// Store name for logging
    fn name(&self) -> &str;

    /// Check if this store handles the given path
    fn supports_file_type(&self, path: &Path) -> bool;

    /// Read a document and its text-bearing structure
    fn open(&self, path: &Path) -> CopyeditResult<Document>;

    /// Write `document` to `path`, including every modified run.
    ///
    /// Implementations must either write a complete document or leave
    /// `path` untouched.
    fn save(&self, document: &Document, path: &Path) -> CopyeditResult<()>;
}

/// Case-insensitive extension check shared by stores
pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}
