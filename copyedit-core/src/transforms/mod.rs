//! External text transforms
//!
//! Transforms are pluggable `text -> text` functions composed into the
//! pipeline by the caller. They come in two flavours:
//!
//! ```text
//! Transform::immediate(name, |text: &str| ...)          -> returns text
//! Transform::suspending(name, |text: String| async ...) -> returns a future
//! ```
//!
//! The [`TransformRunner`] executes a list of them strictly in order and
//! isolates failures per function. [`builtin`] holds the catalogue of
//! transforms that ship with the crate.

pub mod builtin;
pub mod chain;

pub use builtin::{
    builtin_transform, builtin_transforms, BUILTIN_TRANSFORMS, CORRECT_A_AN, REPLACE_ABSENT_THE,
    REPLACE_ABU_DHABI_EXPAND,
};
pub use chain::{ChainOutcome, IntoTransformOutput, Transform, TransformRunner};
