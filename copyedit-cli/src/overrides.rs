// Command-line overrides for the pipeline section of the config file

use anyhow::{anyhow, Result};
use clap::Args;
use copyedit_core::transforms::BUILTIN_TRANSFORMS;
use copyedit_core::{CopyeditConfig, StageOrder, TransformConfig};
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// Pipeline flags shared by `process` and `text`
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Built-in transform to run (repeatable, in order). Replaces the configured list.
    #[arg(short, long = "transform", value_name = "NAME")]
    pub transforms: Vec<String>,

    /// Skip the transform stage
    #[arg(long)]
    pub no_transforms: bool,

    /// Skip the local rules stage
    #[arg(long)]
    pub no_rules: bool,

    /// Run the grammar correction stage (needs an API key)
    #[arg(long)]
    pub grammar: bool,

    /// Stage order: forward (transforms, rules, grammar) or reverse (grammar, transforms, rules)
    #[arg(long, value_name = "ORDER")]
    pub order: Option<StageOrder>,

    /// Chat model used for grammar correction
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of the chat-completions API
    #[arg(long, value_name = "URL")]
    pub api_base: Option<String>,

    /// API key for grammar correction
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl PipelineArgs {
    /// Apply the flags on top of a loaded config. Unknown transform names
    /// are rejected here so a typo fails before any document is opened.
    pub fn apply_to(&self, config: &mut CopyeditConfig) -> Result<()> {
        if !self.transforms.is_empty() {
            for name in &self.transforms {
                if !BUILTIN_TRANSFORMS.iter().any(|(n, _)| *n == name.as_str()) {
                    return Err(anyhow!(
                        "Unknown transform '{}'. Available: {}",
                        name,
                        BUILTIN_TRANSFORMS
                            .iter()
                            .map(|(n, _)| *n)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ));
                }
            }
            config.transforms = self
                .transforms
                .iter()
                .map(|name| TransformConfig::enabled(name))
                .collect();
        }

        if self.no_transforms {
            config.pipeline.apply_transforms = false;
        }
        if self.no_rules {
            config.pipeline.apply_local_rules = false;
        }
        if self.grammar {
            config.pipeline.apply_grammar = true;
        }
        if let Some(order) = self.order {
            config.pipeline.order = order;
        }
        if let Some(model) = &self.model {
            config.grammar.model = model.clone();
        }
        if let Some(api_base) = &self.api_base {
            config.grammar.api_base = api_base.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.grammar.api_key = Some(api_key.clone());
        }
        Ok(())
    }
}

/// Where the effective config came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    File(String),
    /// The file could not be loaded; defaults are in use instead
    Fallback { path: String, reason: String },
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Defaults => write!(f, "default config"),
            ConfigSource::File(path) => write!(f, "config from {}", path),
            ConfigSource::Fallback { path, reason } => {
                write!(f, "default config (failed to load {}: {})", path, reason)
            }
        }
    }
}

/// Load the config file (if any) and apply a rules-file override. An
/// unreadable file falls back to defaults, reported through the source.
pub fn load_config(
    config_path: Option<&str>,
    rules_path: Option<&PathBuf>,
) -> (CopyeditConfig, ConfigSource) {
    let (mut config, source) = match config_path {
        None => (CopyeditConfig::default(), ConfigSource::Defaults),
        Some(path) => match CopyeditConfig::load_from_file(path) {
            Ok(config) => (config, ConfigSource::File(path.to_string())),
            Err(e) => {
                warn!("Failed to load config from {}, using defaults: {:#}", path, e);
                (
                    CopyeditConfig::default(),
                    ConfigSource::Fallback {
                        path: path.to_string(),
                        reason: format!("{e:#}"),
                    },
                )
            }
        },
    };
    if let Some(rules) = rules_path {
        config.rules_path = rules.clone();
    }
    (config, source)
}

/// Default output path: `<stem>_edited.<ext>` next to the input
pub fn default_output_path(input: &std::path::Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = input
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("docx");
    input.with_file_name(format!("{stem}_edited.{extension}"))
}
