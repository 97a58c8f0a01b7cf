use super::rule::{MatchType, NewRule, Rule, RuleUpdate};
use super::store::RuleStore;
use anyhow::Result;
use regex::{NoExpand, Regex, RegexBuilder};
use std::sync::LazyLock;
use tracing::{debug, warn};

// Replacement templates written for Python's `re.sub`: \1, \g<1>, \g<name>,
// the character escapes it expands, and `$` (literal there, special here).
static LEGACY_TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\g<(\w+)>|\\(\d{1,2})|\\([\\abfnrtv])|\$")
        .expect("legacy template regex is valid")
});

/// A rule paired with its ready-to-run matcher
#[derive(Debug)]
enum CompiledRule {
    Exact {
        pattern: String,
        replacement: String,
    },
    CaseInsensitive {
        regex: Regex,
        replacement: String,
    },
    Regex {
        regex: Regex,
        replacement: String,
    },
    /// Invalid pattern or unknown match type: the rule has no effect
    Skipped { reason: String },
}

impl CompiledRule {
    fn compile(rule: &Rule) -> Self {
        match &rule.match_type {
            MatchType::Exact => CompiledRule::Exact {
                pattern: rule.pattern.clone(),
                replacement: rule.replacement.clone(),
            },
            MatchType::CaseInsensitive => {
                match RegexBuilder::new(&regex::escape(&rule.pattern))
                    .case_insensitive(true)
                    .build()
                {
                    Ok(regex) => CompiledRule::CaseInsensitive {
                        regex,
                        replacement: rule.replacement.clone(),
                    },
                    Err(e) => CompiledRule::Skipped {
                        reason: format!("pattern too large: {e}"),
                    },
                }
            }
            MatchType::Regex => match Regex::new(&rule.pattern) {
                Ok(regex) => CompiledRule::Regex {
                    regex,
                    replacement: translate_replacement(&rule.replacement),
                },
                Err(e) => {
                    warn!(
                        rule = %rule.name,
                        id = %rule.id,
                        "invalid regex pattern, rule will be skipped: {e}"
                    );
                    CompiledRule::Skipped {
                        reason: format!("invalid regex: {e}"),
                    }
                }
            },
            MatchType::Unknown(other) => CompiledRule::Skipped {
                reason: format!("unknown match type '{other}'"),
            },
        }
    }

    fn apply(&self, text: &str) -> Option<String> {
        match self {
            CompiledRule::Exact {
                pattern,
                replacement,
            } => Some(text.replace(pattern.as_str(), replacement)),
            CompiledRule::CaseInsensitive { regex, replacement } => Some(
                regex
                    .replace_all(text, NoExpand(replacement.as_str()))
                    .into_owned(),
            ),
            CompiledRule::Regex { regex, replacement } => {
                Some(regex.replace_all(text, replacement.as_str()).into_owned())
            }
            CompiledRule::Skipped { .. } => None,
        }
    }
}

/// Rewrite a Python-style replacement template into Rust `regex` syntax.
///
/// A replacement without any backslash is taken as native Rust syntax and
/// returned untouched (`$1`, `${name}`). Otherwise it is read as a Python
/// template: `\N` / `\g<name>` become `${N}` / `${name}`, character escapes
/// are expanded, and a literal `$` is escaped as `$$`.
pub fn translate_replacement(replacement: &str) -> String {
    if !replacement.contains('\\') {
        return replacement.to_string();
    }
    LEGACY_TEMPLATE_REGEX
        .replace_all(replacement, |caps: &regex::Captures| {
            if let Some(group) = caps.get(1).or_else(|| caps.get(2)) {
                return format!("${{{}}}", group.as_str());
            }
            match caps.get(3).map(|m| m.as_str()) {
                Some("\\") => "\\".to_string(),
                Some("n") => "\n".to_string(),
                Some("t") => "\t".to_string(),
                Some("r") => "\r".to_string(),
                Some("f") => "\x0c".to_string(),
                Some("v") => "\x0b".to_string(),
                Some("a") => "\x07".to_string(),
                Some("b") => "\x08".to_string(),
                // `$` has no meaning in a Python template
                _ => "$$".to_string(),
            }
        })
        .into_owned()
}

/// Owns the ordered rule collection and applies it to text.
///
/// Mutations go through `add`/`update`/`remove` and persist the whole
/// collection immediately. Application never mutates anything.
#[derive(Debug)]
pub struct RuleEngine {
    store: RuleStore,
    rules: Vec<Rule>,
    compiled: Vec<CompiledRule>,
}

impl RuleEngine {
    /// Load rules from `store`; an unreadable store yields an empty engine.
    pub fn new(store: RuleStore) -> Self {
        let rules = store.load();
        let mut engine = Self {
            store,
            rules,
            compiled: Vec::new(),
        };
        engine.recompile();
        engine
    }

    /// Build an engine around an explicit rule list without reading the store
    pub fn with_rules(store: RuleStore, rules: Vec<Rule>) -> Self {
        let mut engine = Self {
            store,
            rules,
            compiled: Vec::new(),
        };
        engine.recompile();
        engine
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn list(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == rule_id)
    }

    /// Re-read the backing store, replacing the in-memory collection
    pub fn reload(&mut self) {
        self.rules = self.store.load();
        self.recompile();
    }

    pub fn add(&mut self, new_rule: NewRule) -> Result<Rule> {
        let rule = new_rule.into_rule();
        let mut rules = self.rules.clone();
        rules.push(rule.clone());
        self.commit(rules)?;
        debug!(id = %rule.id, name = %rule.name, "added rule");
        Ok(rule)
    }

    /// Remove by id. Returns false (and writes nothing) when no rule matched.
    pub fn remove(&mut self, rule_id: &str) -> Result<bool> {
        if self.get(rule_id).is_none() {
            return Ok(false);
        }
        let rules = self.rules.iter().filter(|r| r.id != rule_id).cloned().collect();
        self.commit(rules)?;
        debug!(id = %rule_id, "removed rule");
        Ok(true)
    }

    pub fn update(&mut self, rule_id: &str, update: RuleUpdate) -> Result<Option<Rule>> {
        let mut rules = self.rules.clone();
        let Some(rule) = rules.iter_mut().find(|r| r.id == rule_id) else {
            return Ok(None);
        };
        update.apply_to(rule);
        let updated = rule.clone();
        self.commit(rules)?;
        debug!(id = %rule_id, "updated rule");
        Ok(Some(updated))
    }

    // Persist first; the in-memory set only changes once the store has it
    fn commit(&mut self, rules: Vec<Rule>) -> Result<()> {
        self.store.save(&rules)?;
        self.rules = rules;
        self.recompile();
        Ok(())
    }

    /// Apply every rule in insertion order, each rule's output feeding the next.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (rule, compiled) in self.rules.iter().zip(&self.compiled) {
            match compiled.apply(&out) {
                Some(next) => out = next,
                None => {
                    if let CompiledRule::Skipped { reason } = compiled {
                        debug!(rule = %rule.name, "skipping rule: {reason}");
                    }
                }
            }
        }
        out
    }

    fn recompile(&mut self) {
        self.compiled = self.rules.iter().map(CompiledRule::compile).collect();
    }
}
