// Durable storage for the ordered rule collection.
//
// The on-disk form is a JSON array of rule records; array order is the
// application order.

use super::rule::Rule;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_RULES_FILE: &str = "rules.json";

#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
}

impl RuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the rule collection, degrading to an empty set when the file is
    /// missing, unreadable, or malformed.
    pub fn load(&self) -> Vec<Rule> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no rules file, starting empty");
            return Vec::new();
        }

        match self.try_load() {
            Ok(rules) => {
                debug!(path = %self.path.display(), count = rules.len(), "loaded rules");
                rules
            }
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring unreadable rules file: {e:#}");
                Vec::new()
            }
        }
    }

    pub fn try_load(&self) -> Result<Vec<Rule>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("read rules file {}", self.path.display()))?;
        let rules: Vec<Rule> = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to deserialize rules: {}", e))?;
        Ok(rules)
    }

    /// Persist the full collection. Written to a sibling temp file first and
    /// renamed over the target so readers never see a truncated file.
    pub fn save(&self, rules: &[Rule]) -> Result<()> {
        let json = serde_json::to_string_pretty(rules)
            .map_err(|e| anyhow!("Failed to serialize rules: {}", e))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("create rules directory {}", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("create temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path)
            .map_err(|e| anyhow!("Failed to write rules to {}: {}", self.path.display(), e))?;

        debug!(path = %self.path.display(), count = rules.len(), "saved rules");
        Ok(())
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(DEFAULT_RULES_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::rule::{MatchType, NewRule};

    fn sample_rules() -> Vec<Rule> {
        vec![
            NewRule::new("absent", "absent the", "without the", MatchType::Regex).into_rule(),
            NewRule::new("café", "cafe", "café", MatchType::Exact)
                .with_notes("accents stay unescaped")
                .into_rule(),
            NewRule::new("odd", "x", "y", MatchType::Unknown("fuzzy".to_string())).into_rule(),
        ]
    }

    #[test]
    fn test_roundtrip_preserves_fields_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuleStore::new(dir.path().join("rules.json"));
        let rules = sample_rules();

        store.save(&rules).unwrap();
        assert_eq!(store.load(), rules);
    }

    #[test]
    fn test_saved_file_is_pretty_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuleStore::new(dir.path().join("rules.json"));
        store.save(&sample_rules()).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("café"));
        assert!(content.contains("\n  {"));
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuleStore::new(dir.path().join("absent.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(&path, "{ not json").unwrap();

        let store = RuleStore::new(&path);
        assert!(store.load().is_empty());
        assert!(store.try_load().is_err());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuleStore::new(dir.path().join("nested/dir/rules.json"));
        store.save(&sample_rules()).unwrap();
        assert_eq!(store.load().len(), 3);
    }
}
