// Pipeline orchestrator
//
// Composes the transform chain, the local rule engine and the grammar
// corrector into one of two fixed orderings:
//
//   forward: transforms -> local rules -> grammar
//   reverse: grammar -> transforms -> local rules
//
// Each stage yields a StageOutcome; a failed stage passes its input through.

use crate::config::{PipelineConfig, StageOrder};
use crate::grammar::GrammarCorrector;
use crate::rules::RuleEngine;
use crate::transforms::{Transform, TransformRunner};
use crate::types::{StageFailure, StageKind};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

const FORWARD_STAGES: [StageKind; 3] = [
    StageKind::Transforms,
    StageKind::LocalRules,
    StageKind::Grammar,
];

const REVERSE_STAGES: [StageKind; 3] = [
    StageKind::Grammar,
    StageKind::Transforms,
    StageKind::LocalRules,
];

/// What one stage did to the text
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Applied(String),
    /// Disabled or not configured; identity
    Skipped,
    /// Failed; the stage is treated as identity
    Failed {
        stage: StageKind,
        reason: String,
    },
}

pub struct TextPipeline {
    rules: Option<RuleEngine>,
    transforms: Vec<Transform>,
    runner: TransformRunner,
    grammar: Option<Box<dyn GrammarCorrector + Send + Sync>>,
}

impl Default for TextPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl TextPipeline {
    /// Pipeline with no rule engine, no transforms and no grammar corrector
    pub fn new() -> Self {
        Self {
            rules: None,
            transforms: Vec::new(),
            runner: TransformRunner::new(),
            grammar: None,
        }
    }

    pub fn with_rules(mut self, rules: RuleEngine) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_transforms(mut self, transforms: Vec<Transform>) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn with_grammar(mut self, grammar: Box<dyn GrammarCorrector + Send + Sync>) -> Self {
        self.grammar = Some(grammar);
        self
    }

    pub fn rules(&self) -> Option<&RuleEngine> {
        self.rules.as_ref()
    }

    pub fn rules_mut(&mut self) -> Option<&mut RuleEngine> {
        self.rules.as_mut()
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn has_grammar(&self) -> bool {
        self.grammar.is_some()
    }

    /// Run every enabled stage over `text` in the configured order
    pub fn process(&self, text: &str, config: &PipelineConfig) -> String {
        self.process_traced(text, config).0
    }

    /// Like [`process`](Self::process), also returning the stage failures
    /// that were absorbed along the way.
    pub fn process_traced(&self, text: &str, config: &PipelineConfig) -> (String, Vec<StageFailure>) {
        let stages = match config.order {
            StageOrder::Forward => FORWARD_STAGES,
            StageOrder::Reverse => REVERSE_STAGES,
        };

        let mut current = text.to_string();
        let mut failures = Vec::new();

        for stage in stages {
            match self.run_stage(stage, &current, config, &mut failures) {
                StageOutcome::Applied(next) => current = next,
                StageOutcome::Skipped => {}
                StageOutcome::Failed { stage, reason } => {
                    failures.push(StageFailure {
                        stage,
                        source: None,
                        reason,
                    });
                }
            }
        }

        (current, failures)
    }

    fn run_stage(
        &self,
        stage: StageKind,
        text: &str,
        config: &PipelineConfig,
        failures: &mut Vec<StageFailure>,
    ) -> StageOutcome {
        match stage {
            StageKind::Transforms => {
                if !config.apply_transforms || self.transforms.is_empty() {
                    return StageOutcome::Skipped;
                }
                let outcome = self.runner.apply_traced(text, &self.transforms);
                failures.extend(outcome.failures);
                StageOutcome::Applied(outcome.text)
            }
            StageKind::LocalRules => match &self.rules {
                Some(engine) if config.apply_local_rules => StageOutcome::Applied(engine.apply(text)),
                _ => StageOutcome::Skipped,
            },
            StageKind::Grammar => match &self.grammar {
                Some(corrector) if config.apply_grammar => self.run_grammar(corrector.as_ref(), text),
                _ => StageOutcome::Skipped,
            },
        }
    }

    fn run_grammar(&self, corrector: &(dyn GrammarCorrector + Send + Sync), text: &str) -> StageOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| corrector.correct(text)));
        match result {
            Ok(Ok(corrected)) => {
                debug!(corrector = corrector.name(), "grammar stage applied");
                StageOutcome::Applied(corrected)
            }
            Ok(Err(e)) => {
                warn!(corrector = corrector.name(), "grammar correction failed, passing text through: {e:#}");
                StageOutcome::Failed {
                    stage: StageKind::Grammar,
                    reason: format!("{e:#}"),
                }
            }
            Err(_) => {
                warn!(corrector = corrector.name(), "grammar correction panicked, passing text through");
                StageOutcome::Failed {
                    stage: StageKind::Grammar,
                    reason: "grammar corrector panicked".to_string(),
                }
            }
        }
    }
}

impl std::fmt::Debug for TextPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextPipeline")
            .field("rules", &self.rules.as_ref().map(RuleEngine::len))
            .field("transforms", &self.transforms)
            .field("grammar", &self.grammar.as_ref().map(|g| g.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{MatchType, Rule, RuleStore};
    use anyhow::{anyhow, Result};
    use tempfile::TempDir;

    struct SuffixCorrector;

    impl GrammarCorrector for SuffixCorrector {
        fn name(&self) -> &str {
            "suffix"
        }

        fn correct(&self, text: &str) -> Result<String> {
            Ok(format!("{text} [checked]"))
        }
    }

    struct UnreachableCorrector;

    impl GrammarCorrector for UnreachableCorrector {
        fn name(&self) -> &str {
            "unreachable"
        }

        fn correct(&self, _text: &str) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    struct PanickingCorrector;

    impl GrammarCorrector for PanickingCorrector {
        fn name(&self) -> &str {
            "panicking"
        }

        fn correct(&self, _text: &str) -> Result<String> {
            panic!("malformed completion payload")
        }
    }

    fn rule(pattern: &str, replacement: &str) -> Rule {
        Rule {
            id: format!("rule-{pattern}"),
            name: pattern.to_string(),
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            match_type: MatchType::Exact,
            notes: String::new(),
        }
    }

    fn engine(dir: &TempDir, rules: Vec<Rule>) -> RuleEngine {
        RuleEngine::with_rules(RuleStore::new(dir.path().join("rules.json")), rules)
    }

    fn all_enabled() -> PipelineConfig {
        PipelineConfig {
            apply_transforms: true,
            apply_local_rules: true,
            apply_grammar: true,
            order: StageOrder::Forward,
        }
    }

    #[test]
    fn test_identity_when_everything_disabled() {
        let pipeline = TextPipeline::new();
        let text = "Leave me  exactly as I am.";
        assert_eq!(pipeline.process(text, &all_enabled()), text);
        assert_eq!(pipeline.process(text, &PipelineConfig::disabled()), text);
    }

    #[test]
    fn test_disabled_stages_are_identity() {
        let dir = TempDir::new().unwrap();
        let pipeline = TextPipeline::new()
            .with_rules(engine(&dir, vec![rule("cat", "dog")]))
            .with_transforms(vec![Transform::immediate("upper", |t: &str| t.to_uppercase())])
            .with_grammar(Box::new(SuffixCorrector));

        assert_eq!(pipeline.process("cat", &PipelineConfig::disabled()), "cat");
    }

    #[test]
    fn test_forward_order() {
        let dir = TempDir::new().unwrap();
        // transforms rewrite "a" to "b", the rule rewrites "b" to "c"
        let pipeline = TextPipeline::new()
            .with_rules(engine(&dir, vec![rule("b", "c")]))
            .with_transforms(vec![Transform::immediate("a_to_b", |t: &str| t.replace('a', "b"))])
            .with_grammar(Box::new(SuffixCorrector));

        assert_eq!(pipeline.process("a", &all_enabled()), "c [checked]");
    }

    #[test]
    fn test_reverse_order() {
        let dir = TempDir::new().unwrap();
        let pipeline = TextPipeline::new()
            .with_rules(engine(&dir, vec![rule("[checked]", "[ok]")]))
            .with_transforms(vec![Transform::immediate("upper", |t: &str| t.to_uppercase())])
            .with_grammar(Box::new(SuffixCorrector));

        let config = PipelineConfig {
            order: StageOrder::Reverse,
            ..all_enabled()
        };
        // grammar first, so its suffix is uppercased before the rule sees it
        assert_eq!(pipeline.process("hi", &config), "HI [CHECKED]");

        let config = PipelineConfig {
            apply_transforms: false,
            ..config
        };
        assert_eq!(pipeline.process("hi", &config), "hi [ok]");
    }

    #[test]
    fn test_grammar_needs_flag_and_corrector() {
        let with_corrector = TextPipeline::new().with_grammar(Box::new(SuffixCorrector));
        let flag_off = PipelineConfig {
            apply_grammar: false,
            ..all_enabled()
        };
        assert_eq!(with_corrector.process("x", &flag_off), "x");
        assert_eq!(with_corrector.process("x", &all_enabled()), "x [checked]");

        let without_corrector = TextPipeline::new();
        assert_eq!(without_corrector.process("x", &all_enabled()), "x");
    }

    #[test]
    fn test_grammar_failure_is_identity() {
        let dir = TempDir::new().unwrap();
        let pipeline = TextPipeline::new()
            .with_rules(engine(&dir, vec![rule("teh", "the")]))
            .with_grammar(Box::new(UnreachableCorrector));

        let (text, failures) = pipeline.process_traced("teh end", &all_enabled());
        assert_eq!(text, "the end");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].stage, StageKind::Grammar);
        assert!(failures[0].reason.contains("connection refused"));
    }

    #[test]
    fn test_grammar_panic_is_identity() {
        let dir = TempDir::new().unwrap();
        let pipeline = TextPipeline::new()
            .with_rules(engine(&dir, vec![rule("teh", "the")]))
            .with_grammar(Box::new(PanickingCorrector));

        let config = PipelineConfig {
            order: StageOrder::Reverse,
            ..all_enabled()
        };
        let (text, failures) = pipeline.process_traced("teh end", &config);
        assert_eq!(text, "the end");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].stage, StageKind::Grammar);
        assert!(failures[0].reason.contains("panicked"));
    }

    #[test]
    fn test_transform_failures_are_reported() {
        let pipeline = TextPipeline::new().with_transforms(vec![
            Transform::immediate("broken", |_: &str| -> Result<String> { Err(anyhow!("nope")) }),
            Transform::immediate("exclaim", |t: &str| format!("{t}!")),
        ]);

        let (text, failures) = pipeline.process_traced("go", &all_enabled());
        assert_eq!(text, "go!");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].source.as_deref(), Some("broken"));
    }

    #[test]
    fn test_rules_flag_without_engine_is_skipped() {
        let pipeline = TextPipeline::new();
        assert!(pipeline.rules().is_none());
        assert_eq!(pipeline.process("unchanged", &all_enabled()), "unchanged");
    }

    #[test]
    fn test_stateless_across_calls() {
        let dir = TempDir::new().unwrap();
        let pipeline = TextPipeline::new()
            .with_rules(engine(&dir, vec![rule("absent the", "without the")]))
            .with_transforms(crate::transforms::builtin_transforms());

        let config = PipelineConfig::default();
        let first = pipeline.process("absent the plan, a apple", &config);
        let second = pipeline.process("absent the plan, a apple", &config);
        assert_eq!(first, "without the plan, an apple");
        assert_eq!(first, second);
    }
}
