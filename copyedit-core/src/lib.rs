// Copyedit Core Library
//
// Rewrites the text of word-processing documents through an ordered pipeline
// of built-in transforms, user-defined replacement rules and an optional
// grammar-correction step.

pub mod config;
pub mod document;
pub mod error;
pub mod grammar;
pub mod pipeline;
pub mod processor;
pub mod rules;
pub mod transforms;
pub mod traversal;
pub mod types;

// Re-export main types and functions for easy use
pub use config::{CopyeditConfig, GrammarConfig, PipelineConfig, StageOrder, TransformConfig};
pub use document::{Document, DocumentStore, DocxStore, Paragraph, Run};
pub use error::{CopyeditError, CopyeditResult};
pub use grammar::{ChatGrammarCorrector, GrammarCorrector};
pub use pipeline::{StageOutcome, TextPipeline};
pub use processor::DocumentProcessor;
pub use rules::{MatchType, NewRule, Rule, RuleEngine, RuleStore, RuleUpdate};
pub use transforms::{Transform, TransformRunner};
pub use traversal::{rewrite_document, text_units, TextUnit, TraversalSummary};
pub use types::*;
