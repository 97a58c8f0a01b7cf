use crate::rules::DEFAULT_RULES_FILE;
use crate::transforms::{builtin_transform, Transform};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_rules_path() -> PathBuf {
    PathBuf::from(DEFAULT_RULES_FILE)
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Which of the two fixed stage orderings a run uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOrder {
    /// Transforms → local rules → grammar
    #[default]
    Forward,
    /// Grammar → transforms → local rules
    Reverse,
}

impl FromStr for StageOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "forward" => Ok(StageOrder::Forward),
            "reverse" => Ok(StageOrder::Reverse),
            other => Err(anyhow!(
                "Unknown stage order '{}', expected 'forward' or 'reverse'",
                other
            )),
        }
    }
}

impl fmt::Display for StageOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOrder::Forward => f.write_str("forward"),
            StageOrder::Reverse => f.write_str("reverse"),
        }
    }
}

/// Enabled stages and their ordering for one processing run. Fixed for the
/// whole run and applied identically to every text unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_true")]
    pub apply_transforms: bool,
    /// Local rules also need a rule engine attached to the pipeline
    #[serde(default = "default_true")]
    pub apply_local_rules: bool,
    /// Grammar also needs a configured corrector
    #[serde(default)]
    pub apply_grammar: bool,
    #[serde(default)]
    pub order: StageOrder,
}

impl PipelineConfig {
    /// Every stage switched off
    pub fn disabled() -> Self {
        Self {
            apply_transforms: false,
            apply_local_rules: false,
            apply_grammar: false,
            order: StageOrder::Forward,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            apply_transforms: true,
            apply_local_rules: true,
            apply_grammar: false,
            order: StageOrder::Forward,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Name of a built-in transform
    pub name: String,
    /// Whether this transform is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl TransformConfig {
    pub fn enabled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
        }
    }
}

/// Settings for the chat-completions grammar corrector. Without an API key
/// the corrector is unavailable and the grammar stage is a pass-through.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GrammarConfig {
    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl fmt::Debug for GrammarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarConfig")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_api_base(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyeditConfig {
    /// Where the local rule collection is persisted
    #[serde(default = "default_rules_path")]
    pub rules_path: PathBuf,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Built-in transforms to run, in order
    #[serde(default = "default_transforms")]
    pub transforms: Vec<TransformConfig>,
    #[serde(default)]
    pub grammar: GrammarConfig,
}

fn default_transforms() -> Vec<TransformConfig> {
    crate::transforms::BUILTIN_TRANSFORMS
        .iter()
        .map(|(name, _)| TransformConfig::enabled(name))
        .collect()
}

impl Default for CopyeditConfig {
    fn default() -> Self {
        Self {
            rules_path: default_rules_path(),
            pipeline: PipelineConfig::default(),
            transforms: default_transforms(),
            grammar: GrammarConfig::default(),
        }
    }
}

impl CopyeditConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CopyeditConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!("Failed to load config from {}, using defaults: {}", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Resolve the enabled transform names against the built-in catalogue.
    /// An unknown name is a configuration error.
    pub fn resolve_transforms(&self) -> Result<Vec<Transform>> {
        self.transforms
            .iter()
            .filter(|t| t.enabled)
            .map(|t| {
                builtin_transform(&t.name)
                    .ok_or_else(|| anyhow!("Unknown transform '{}' in configuration", t.name))
            })
            .collect()
    }
}
