// Grammar correction stage
//
// The pipeline only needs `correct(text) -> text`. Failures are the
// caller's to absorb: the orchestrator turns any error into a pass-through.

use crate::config::GrammarConfig;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a grammar correcting assistant.";

/// Best-effort natural-language correction capability
pub trait GrammarCorrector {
    /// Corrector name for logging
    fn name(&self) -> &str;

    fn correct(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Grammar corrector backed by an OpenAI-compatible chat-completions API
pub struct ChatGrammarCorrector {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatGrammarCorrector {
    /// Build a corrector from explicit configuration. Returns `None` when no
    /// credential is configured; the grammar stage is then a pass-through.
    pub fn from_config(config: &GrammarConfig) -> Option<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())?;

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();

        Some(Self {
            agent,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for ChatGrammarCorrector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatGrammarCorrector")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

/// User prompt sent for one block of text
pub fn build_prompt(text: &str) -> String {
    format!(
        "You are a careful editor. Correct grammar, punctuation, and phrasing in the following text \
         while preserving meaning and named entities.\n\n\
         Text:\n{text}\n\nReturn only the corrected text."
    )
}

/// Completion budget scaled to the input length
pub fn max_tokens_for(text: &str) -> usize {
    (text.chars().count() / 2 + 50).max(256)
}

impl GrammarCorrector for ChatGrammarCorrector {
    fn name(&self) -> &str {
        "chat-completions"
    }

    fn correct(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(text)},
            ],
            "temperature": 0.0,
            "max_tokens": max_tokens_for(text),
        });

        debug!(model = %self.model, chars = text.len(), "requesting grammar correction");
        let response: ChatResponse = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body)
            .context("grammar correction request failed")?
            .into_json()
            .context("grammar correction response was not valid JSON")?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("grammar correction response had no message content"))?;

        Ok(content.trim().to_string())
    }
}
