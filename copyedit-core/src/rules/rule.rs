use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How a rule's `pattern` is interpreted.
///
/// Values outside the known three are kept verbatim so they survive a
/// load/save round-trip; the engine skips them when applying rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchType {
    #[default]
    Exact,
    CaseInsensitive,
    Regex,
    Unknown(String),
}

impl MatchType {
    pub fn as_str(&self) -> &str {
        match self {
            MatchType::Exact => "exact",
            MatchType::CaseInsensitive => "case_insensitive",
            MatchType::Regex => "regex",
            MatchType::Unknown(other) => other,
        }
    }
}

impl From<String> for MatchType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "exact" => MatchType::Exact,
            "case_insensitive" => MatchType::CaseInsensitive,
            "regex" => MatchType::Regex,
            _ => MatchType::Unknown(value),
        }
    }
}

impl From<&str> for MatchType {
    fn from(value: &str) -> Self {
        MatchType::from(value.to_string())
    }
}

impl From<MatchType> for String {
    fn from(value: MatchType) -> Self {
        match value {
            MatchType::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn generate_rule_id() -> String {
    Uuid::new_v4().to_string()
}

/// One pattern → replacement mapping. Field order matches the on-disk record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default = "generate_rule_id")]
    pub id: String,
    pub name: String,
    pub pattern: String,
    pub replacement: String,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub notes: String,
}

/// Fields for a rule that has not been stored yet
#[derive(Debug, Clone, Default)]
pub struct NewRule {
    pub id: Option<String>,
    pub name: String,
    pub pattern: String,
    pub replacement: String,
    pub match_type: MatchType,
    pub notes: String,
}

impl NewRule {
    pub fn new(name: &str, pattern: &str, replacement: &str, match_type: MatchType) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            match_type,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    pub fn into_rule(self) -> Rule {
        Rule {
            id: self.id.unwrap_or_else(generate_rule_id),
            name: self.name,
            pattern: self.pattern,
            replacement: self.replacement,
            match_type: self.match_type,
            notes: self.notes,
        }
    }
}

/// Partial update: only `Some` fields overwrite the stored rule.
#[derive(Debug, Clone, Default)]
pub struct RuleUpdate {
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub replacement: Option<String>,
    pub match_type: Option<MatchType>,
    pub notes: Option<String>,
}

impl RuleUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.pattern.is_none()
            && self.replacement.is_none()
            && self.match_type.is_none()
            && self.notes.is_none()
    }

    pub(crate) fn apply_to(self, rule: &mut Rule) {
        if let Some(name) = self.name {
            rule.name = name;
        }
        if let Some(pattern) = self.pattern {
            rule.pattern = pattern;
        }
        if let Some(replacement) = self.replacement {
            rule.replacement = replacement;
        }
        if let Some(match_type) = self.match_type {
            rule.match_type = match_type;
        }
        if let Some(notes) = self.notes {
            rule.notes = notes;
        }
    }
}
