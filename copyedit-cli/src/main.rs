use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

// Import from copyedit-core
use copyedit_core::transforms::BUILTIN_TRANSFORMS;
use copyedit_core::{
    CopyeditConfig, DocumentProcessor, MatchType, NewRule, ProcessingReport, RuleEngine,
    RuleStore, RuleUpdate,
};

// Import CLI utilities
use copyedit::overrides::{default_output_path, load_config, ConfigSource};
use copyedit::PipelineArgs;

const MATCH_TYPES: [&str; 3] = ["exact", "case_insensitive", "regex"];

#[derive(Parser)]
#[command(name = "copyedit", version)]
#[command(about = "Rewrite the text of Word documents with rules, transforms and grammar correction")]
struct Cli {
    /// Path to custom config file (YAML format)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Rules file (overrides `rules_path` from the config)
    #[arg(short, long, global = true, value_name = "FILE")]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite every paragraph, table cell, header and footer of a .docx file
    Process {
        /// Path to the .docx file to process
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (defaults to <input>_edited.docx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a JSON report of every change to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Show what would change without writing the output
        #[arg(long)]
        dry_run: bool,

        /// Print each changed text unit
        #[arg(long)]
        show_changes: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Run the pipeline over a piece of text (reads stdin when omitted)
    Text {
        text: Option<String>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Manage local replacement rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// List the built-in transforms
    Transforms,

    /// Print the effective configuration as YAML
    ShowConfig,
}

#[derive(Subcommand)]
enum RulesAction {
    /// List rules in application order
    List {
        /// Emit the rules as JSON
        #[arg(long)]
        json: bool,
    },

    /// Append a rule
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        pattern: String,

        #[arg(long)]
        replacement: String,

        #[arg(long, default_value = "exact", value_parser = MATCH_TYPES)]
        match_type: String,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Remove a rule by id
    Remove { id: String },

    /// Change fields of an existing rule
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        pattern: Option<String>,

        #[arg(long)]
        replacement: Option<String>,

        #[arg(long, value_parser = MATCH_TYPES)]
        match_type: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let (config, config_source) = load_config(cli.config.as_deref(), cli.rules.as_ref());

    let result = match cli.command {
        Command::Process {
            input,
            output,
            report,
            dry_run,
            show_changes,
            pipeline,
        } => run_process(config, &config_source, input, output, report, dry_run, show_changes, &pipeline),
        Command::Text { text, pipeline } => {
            if let ConfigSource::Fallback { .. } = config_source {
                eprintln!("⚠️  Using {}", config_source);
            }
            run_text(config, text, &pipeline)
        }
        Command::Rules { action } => run_rules(&config, action),
        Command::Transforms => {
            show_transforms(&config);
            Ok(())
        }
        Command::ShowConfig => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

// Logs go to stderr so stdout stays clean for `text` and `rules list --json`
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[allow(clippy::too_many_arguments)]
fn run_process(
    mut config: CopyeditConfig,
    config_source: &ConfigSource,
    input: PathBuf,
    output: Option<PathBuf>,
    report_path: Option<PathBuf>,
    dry_run: bool,
    show_changes: bool,
    pipeline: &PipelineArgs,
) -> Result<()> {
    println!("🦀 Copyedit Document Processor");

    if !input.exists() {
        return Err(anyhow!("Input document not found at: {}", input.display()));
    }

    match config_source {
        ConfigSource::File(path) => println!("📋 Loaded config from: {}", path),
        ConfigSource::Defaults => println!("📋 Using default config"),
        ConfigSource::Fallback { path, reason } => {
            println!("⚠️  Could not load config from {}: {}", path, reason);
            println!("📋 Falling back to default config");
        }
    }

    pipeline.apply_to(&mut config)?;
    let processor = DocumentProcessor::from_config(&config)?;
    print_pipeline(&config, &processor);

    println!("📄 Processing: {}", input.display());
    let report = if dry_run {
        processor.preview_document(&input, &config.pipeline)?
    } else {
        let output = output.unwrap_or_else(|| default_output_path(&input));
        processor.process_document(&input, &output, &config.pipeline)?
    };

    print_report(&report, show_changes || dry_run);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .map_err(|e| anyhow!("Failed to write report to {}: {}", path.display(), e))?;
        println!("💾 Report saved to: {}", path.display());
    }

    Ok(())
}

fn run_text(mut config: CopyeditConfig, text: Option<String>, pipeline: &PipelineArgs) -> Result<()> {
    pipeline.apply_to(&mut config)?;
    let text = match text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let processor = DocumentProcessor::from_config(&config)?;
    println!("{}", processor.process_text(&text, &config.pipeline));
    Ok(())
}

fn run_rules(config: &CopyeditConfig, action: RulesAction) -> Result<()> {
    let mut engine = RuleEngine::new(RuleStore::new(&config.rules_path));

    match action {
        RulesAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(engine.list())?);
                return Ok(());
            }
            if engine.is_empty() {
                println!("📭 No rules in {}", engine.store().path().display());
                return Ok(());
            }
            println!("📚 {} rule(s) in {}:", engine.len(), engine.store().path().display());
            for (position, rule) in engine.list().iter().enumerate() {
                println!(
                    "  {}. {} [{}] {:?} -> {:?}",
                    position + 1,
                    rule.name,
                    rule.match_type,
                    rule.pattern,
                    rule.replacement
                );
                println!("     id: {}", rule.id);
                if !rule.notes.is_empty() {
                    println!("     notes: {}", rule.notes);
                }
            }
        }
        RulesAction::Add {
            name,
            pattern,
            replacement,
            match_type,
            notes,
        } => {
            let new_rule = NewRule::new(&name, &pattern, &replacement, MatchType::from(match_type))
                .with_notes(&notes);
            let rule = engine.add(new_rule)?;
            println!("✅ Added rule '{}' ({})", rule.name, rule.id);
        }
        RulesAction::Remove { id } => {
            if engine.remove(&id)? {
                println!("🗑️  Removed rule {}", id);
            } else {
                return Err(anyhow!("No rule with id {}", id));
            }
        }
        RulesAction::Update {
            id,
            name,
            pattern,
            replacement,
            match_type,
            notes,
        } => {
            let update = RuleUpdate {
                name,
                pattern,
                replacement,
                match_type: match_type.map(MatchType::from),
                notes,
            };
            if update.is_empty() {
                return Err(anyhow!("Nothing to update: pass at least one field flag"));
            }
            match engine.update(&id, update)? {
                Some(rule) => println!(
                    "✅ Updated rule '{}': [{}] {:?} -> {:?}",
                    rule.name, rule.match_type, rule.pattern, rule.replacement
                ),
                None => return Err(anyhow!("No rule with id {}", id)),
            }
        }
    }

    Ok(())
}

fn show_transforms(config: &CopyeditConfig) {
    println!("\n🔧 Built-in transforms:");
    for (name, description) in BUILTIN_TRANSFORMS {
        let enabled = config
            .transforms
            .iter()
            .any(|t| t.enabled && t.name == *name);
        let marker = if enabled { "✓" } else { " " };
        println!("  [{}] {:<26} {}", marker, name, description);
    }

    println!("\n📝 Usage Examples:");
    println!("  copyedit process -i report.docx");
    println!("  copyedit process -i report.docx -t correct_a_an -t replace_absent_the");
    println!("  copyedit text \"a apple absent the plan\" --no-rules");
}

fn print_pipeline(config: &CopyeditConfig, processor: &DocumentProcessor) {
    let pipeline = &config.pipeline;
    let on_off = |enabled: bool| if enabled { "on" } else { "off" };

    let transform_names: Vec<&str> = processor
        .pipeline()
        .transforms()
        .iter()
        .map(|t| t.name())
        .collect();
    let rule_count = processor.pipeline().rules().map_or(0, RuleEngine::len);

    println!("⚙️  Pipeline ({} order):", pipeline.order);
    println!(
        "   - Transforms: {} [{}]",
        on_off(pipeline.apply_transforms),
        transform_names.join(", ")
    );
    println!(
        "   - Local rules: {} ({} rule(s) from {})",
        on_off(pipeline.apply_local_rules),
        rule_count,
        config.rules_path.display()
    );
    println!(
        "   - Grammar: {}{}",
        on_off(pipeline.apply_grammar),
        if pipeline.apply_grammar && !processor.pipeline().has_grammar() {
            " (no API key, passing through)"
        } else {
            ""
        }
    );
}

fn print_report(report: &ProcessingReport, show_changes: bool) {
    println!("✅ Successfully processed document");
    println!("📊 Run metrics:");
    println!("   - Text units visited: {}", report.units_visited);
    println!("   - Text units changed: {}", report.units_changed);
    println!("   - Stage failures: {}", report.stage_failures.len());
    println!("   - Elapsed: {}ms", report.elapsed_ms());

    if show_changes {
        for change in &report.changes {
            println!("\n   ✏️  {}", change.location);
            println!("      - {}", change.before);
            println!("      + {}", change.after);
        }
    }

    for failure in &report.stage_failures {
        match &failure.source {
            Some(source) => println!("⚠️  {} stage ({}) passed text through: {}", failure.stage, source, failure.reason),
            None => println!("⚠️  {} stage passed text through: {}", failure.stage, failure.reason),
        }
    }

    match &report.output {
        Some(output) => println!("💾 Saved to: {}", output),
        None => println!("🔍 Dry run: nothing written"),
    }
}
