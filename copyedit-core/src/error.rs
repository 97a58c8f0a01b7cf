// Error types for document container operations.
//
// Everything above the container boundary (rules, transforms, grammar,
// pipeline) degrades to pass-through instead of failing, so these are the
// only hard failures a caller sees from a processing run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CopyeditError {
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid docx package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed XML in {part}: {reason}")]
    Xml { part: String, reason: String },

    #[error("docx package is missing required part: {0}")]
    MissingPart(String),

    #[error("unsupported document type: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("document has no backing package to save")]
    NoPackage,
}

impl CopyeditError {
    pub(crate) fn xml(part: &str, reason: impl ToString) -> Self {
        Self::Xml {
            part: part.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type CopyeditResult<T> = std::result::Result<T, CopyeditError>;
