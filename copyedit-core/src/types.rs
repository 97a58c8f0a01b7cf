use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ===== TEXT UNIT LOCATIONS =====
// Coordinates of a paragraph-equivalent block inside a document. Indices are
// 0-based and follow the traversal order of the document model.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderFooterKind {
    Default,
    FirstPage,
    EvenPage,
}

impl HeaderFooterKind {
    /// Value of the `w:type` attribute on header/footer references
    pub fn from_ooxml(value: &str) -> Option<Self> {
        match value {
            "default" => Some(Self::Default),
            "first" => Some(Self::FirstPage),
            "even" => Some(Self::EvenPage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitLocation {
    Body {
        paragraph: usize,
    },
    TableCell {
        table: usize,
        row: usize,
        cell: usize,
        paragraph: usize,
    },
    Header {
        section: usize,
        variant: HeaderFooterKind,
        paragraph: usize,
    },
    Footer {
        section: usize,
        variant: HeaderFooterKind,
        paragraph: usize,
    },
}

impl fmt::Display for UnitLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitLocation::Body { paragraph } => write!(f, "body/p{paragraph}"),
            UnitLocation::TableCell {
                table,
                row,
                cell,
                paragraph,
            } => write!(f, "table{table}/r{row}/c{cell}/p{paragraph}"),
            UnitLocation::Header {
                section,
                variant,
                paragraph,
            } => write!(f, "section{section}/header({variant:?})/p{paragraph}"),
            UnitLocation::Footer {
                section,
                variant,
                paragraph,
            } => write!(f, "section{section}/footer({variant:?})/p{paragraph}"),
        }
    }
}

// ===== PIPELINE STAGES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Transforms,
    LocalRules,
    Grammar,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Transforms => "transforms",
            StageKind::LocalRules => "local_rules",
            StageKind::Grammar => "grammar",
        };
        f.write_str(name)
    }
}

/// A stage (or a single transform inside the transform stage) that failed and
/// was treated as a pass-through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: StageKind,
    /// Transform name when the failure came from one function of the chain
    pub source: Option<String>,
    pub reason: String,
}

// ===== RUN REPORT =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitChange {
    pub location: UnitLocation,
    pub before: String,
    pub after: String,
}

/// Summary of one document-processing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub input: String,
    pub output: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub units_visited: usize,
    pub units_changed: usize,
    pub stage_failures: Vec<StageFailure>,
    pub changes: Vec<UnitChange>,
}

impl ProcessingReport {
    pub fn new(input: &str) -> Self {
        let now = Utc::now();
        Self {
            input: input.to_string(),
            output: None,
            started_at: now,
            finished_at: now,
            units_visited: 0,
            units_changed: 0,
            stage_failures: Vec::new(),
            changes: Vec::new(),
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let location = UnitLocation::TableCell {
            table: 0,
            row: 2,
            cell: 1,
            paragraph: 0,
        };
        assert_eq!(location.to_string(), "table0/r2/c1/p0");

        let header = UnitLocation::Header {
            section: 1,
            variant: HeaderFooterKind::FirstPage,
            paragraph: 3,
        };
        assert_eq!(header.to_string(), "section1/header(FirstPage)/p3");
    }

    #[test]
    fn test_header_footer_kind_from_ooxml() {
        assert_eq!(
            HeaderFooterKind::from_ooxml("default"),
            Some(HeaderFooterKind::Default)
        );
        assert_eq!(
            HeaderFooterKind::from_ooxml("even"),
            Some(HeaderFooterKind::EvenPage)
        );
        assert_eq!(HeaderFooterKind::from_ooxml("odd"), None);
    }
}
