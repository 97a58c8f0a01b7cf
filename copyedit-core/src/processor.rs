use crate::config::{CopyeditConfig, PipelineConfig};
use crate::document::{DocumentStore, DocxStore};
use crate::grammar::ChatGrammarCorrector;
use crate::pipeline::TextPipeline;
use crate::rules::{RuleEngine, RuleStore};
use crate::traversal::{rewrite_document, TraversalSummary};
use crate::types::ProcessingReport;
use anyhow::{anyhow, Result};
use chrono::Utc;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Collects timings for the steps of one document run
struct StepTimer {
    timings: Vec<(&'static str, Duration)>,
}

impl StepTimer {
    fn new() -> Self {
        Self {
            timings: Vec::new(),
        }
    }

    fn time_step<F, R>(&mut self, step_name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.timings.push((step_name, start.elapsed()));
        result
    }

    fn log_summary(&self) {
        for (step, duration) in &self.timings {
            debug!(step = *step, elapsed_ms = duration.as_millis() as u64, "step timing");
        }
    }
}

pub struct DocumentProcessor {
    store: Box<dyn DocumentStore + Send + Sync>,
    pipeline: TextPipeline,
}

impl DocumentProcessor {
    /// Create DocumentProcessor with full dependency injection
    pub fn new_with_dependencies(
        store: Box<dyn DocumentStore + Send + Sync>,
        pipeline: TextPipeline,
    ) -> Self {
        Self { store, pipeline }
    }

    /// Processor for .docx files
    pub fn new_docx(pipeline: TextPipeline) -> Self {
        Self::new_with_dependencies(Box::new(DocxStore::new()), pipeline)
    }

    /// Build the docx processor described by `config`: the rule engine at
    /// `rules_path`, the enabled built-in transforms, and the grammar
    /// corrector when credentials are configured.
    pub fn from_config(config: &CopyeditConfig) -> Result<Self> {
        let transforms = config.resolve_transforms()?;
        let rules = RuleEngine::new(RuleStore::new(&config.rules_path));

        let mut pipeline = TextPipeline::new()
            .with_rules(rules)
            .with_transforms(transforms);

        match ChatGrammarCorrector::from_config(&config.grammar) {
            Some(corrector) => pipeline = pipeline.with_grammar(Box::new(corrector)),
            None if config.pipeline.apply_grammar => {
                warn!("Grammar correction requested but no API key configured; the grammar stage will pass text through");
            }
            None => {}
        }

        Ok(Self::new_docx(pipeline))
    }

    pub fn pipeline(&self) -> &TextPipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut TextPipeline {
        &mut self.pipeline
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Run the pipeline over a single piece of text
    pub fn process_text(&self, text: &str, config: &PipelineConfig) -> String {
        self.pipeline.process(text, config)
    }

    /// Rewrite every text unit of `input` and save the result to `output`.
    ///
    /// The output is written only after the whole document has been
    /// traversed; if opening or saving fails nothing is written.
    pub fn process_document(
        &self,
        input: &Path,
        output: &Path,
        config: &PipelineConfig,
    ) -> Result<ProcessingReport> {
        info!(input = %input.display(), output = %output.display(), "processing document");
        let mut timer = StepTimer::new();
        let mut report = ProcessingReport::new(&input.display().to_string());

        let mut document = timer.time_step("open", || self.open(input))?;
        let summary = timer.time_step("rewrite", || rewrite_document(&mut document, &self.pipeline, config));

        timer
            .time_step("save", || self.store.save(&document, output))
            .map_err(|e| anyhow!("Failed to save document to {}: {}", output.display(), e))?;

        report.output = Some(output.display().to_string());
        finish_report(&mut report, summary);
        timer.log_summary();
        info!(
            visited = report.units_visited,
            changed = report.units_changed,
            failures = report.stage_failures.len(),
            elapsed_ms = report.elapsed_ms(),
            "document processed"
        );
        Ok(report)
    }

    /// Same as [`process_document`](Self::process_document) without writing
    /// anything: reports which units would change.
    pub fn preview_document(&self, input: &Path, config: &PipelineConfig) -> Result<ProcessingReport> {
        info!(input = %input.display(), "previewing document");
        let mut report = ProcessingReport::new(&input.display().to_string());

        let mut document = self.open(input)?;
        let summary = rewrite_document(&mut document, &self.pipeline, config);

        finish_report(&mut report, summary);
        Ok(report)
    }

    fn open(&self, input: &Path) -> Result<crate::document::Document> {
        if !self.store.supports_file_type(input) {
            return Err(anyhow!(
                "Unsupported document type for {} store: {}",
                self.store.name(),
                input.display()
            ));
        }
        self.store
            .open(input)
            .map_err(|e| anyhow!("Failed to open document {}: {}", input.display(), e))
    }
}

fn finish_report(report: &mut ProcessingReport, summary: TraversalSummary) {
    report.units_visited = summary.units_visited;
    report.units_changed = summary.changes.len();
    report.changes = summary.changes;
    report.stage_failures = summary.stage_failures;
    report.finished_at = Utc::now();
}
