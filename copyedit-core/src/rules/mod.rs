// Local replacement rules.
// - rule.rs: Rule record, MatchType, add/update payloads
// - store.rs: JSON persistence of the ordered rule collection
// - engine.rs: RuleEngine (administration + ordered application)

pub mod engine;
pub mod rule;
pub mod store;

pub use engine::RuleEngine;
pub use rule::{MatchType, NewRule, Rule, RuleUpdate};
pub use store::{RuleStore, DEFAULT_RULES_FILE};
