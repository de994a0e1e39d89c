//! Buildwise - turn orchestration engine
//!
//! CLI entry point for analysing project records and running single turns.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde_json::json;
use tracing::{debug, info};

use buildwise::analysis::{TurnAnalysis, TurnAnalyzer};
use buildwise::cli::{Cli, Command, OutputFormat, load_record};
use buildwise::config::Config;
use buildwise::context::{BudgetInput, ContextBudgeter, KnowledgeSource, NoKnowledge, PrunedContext, StaticKnowledge};
use buildwise::domain::{
    ArchitectEvent, Chapter, ConversationTurn, EventSource, EventType, OrchestratorResult, Origin, Severity,
    TurnPlan,
};
use buildwise::llm::create_client;
use buildwise::orchestrator::Orchestrator;
use buildwise::prompts::PromptLoader;
use buildwise::watch::{ChangeWatcher, DomainEventDetector, StaticRequiredFields};

/// Project id used for one-shot CLI turns
const CLI_PROJECT_ID: &str = "cli";

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("buildwise")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("buildwise.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Buildwise loaded config: provider={} model={}", config.llm.provider, config.llm.model);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Analyze { state, message, format } => cmd_analyze(&config, &state, message.as_deref(), format),
        Command::Diff {
            prev,
            next,
            origin,
            format,
        } => cmd_diff(&config, &prev, &next, origin, format),
        Command::Context {
            state,
            message,
            knowledge,
            field,
            format,
        } => cmd_context(&config, &state, &message, knowledge.as_deref(), field.as_deref(), format),
        Command::Turn {
            state,
            message,
            knowledge,
            format,
        } => cmd_turn(config, &state, &message, knowledge.as_deref(), format).await,
        Command::Auto {
            state,
            event,
            chapter,
            knowledge,
            format,
        } => cmd_auto(config, &state, event, chapter, knowledge.as_deref(), format).await,
    }
}

fn load_knowledge(path: Option<&Path>) -> Result<Arc<dyn KnowledgeSource>> {
    match path {
        Some(path) => Ok(Arc::new(StaticKnowledge::load(path)?)),
        None => Ok(Arc::new(NoKnowledge)),
    }
}

fn history_for(message: Option<&str>) -> Vec<ConversationTurn> {
    message.map(|m| vec![ConversationTurn::user(m)]).unwrap_or_default()
}

fn cmd_analyze(config: &Config, state: &Path, message: Option<&str>, format: OutputFormat) -> Result<()> {
    debug!(state = %state.display(), ?message, "cmd_analyze: called");
    let record = load_record(state)?;
    let analysis = TurnAnalyzer::new(&config.detection).analyze(
        &record,
        record.current_chapter,
        &history_for(message),
        message.unwrap_or_default(),
    );

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
        OutputFormat::Text => print_analysis(&analysis),
    }
    Ok(())
}

fn print_analysis(analysis: &TurnAnalysis) {
    println!("{}", "Conflicts".bold());
    if analysis.conflicts.is_empty() {
        println!("  none");
    }
    for conflict in &analysis.conflicts {
        let severity = match conflict.severity {
            Severity::Blocking => conflict.severity.to_string().red().bold(),
            Severity::Warning => conflict.severity.to_string().yellow(),
            Severity::Info => conflict.severity.to_string().normal(),
        };
        println!("  [{}] {}: {}", severity, conflict.kind.as_str(), conflict.description);
        println!("      {}", conflict.suggested_resolution);
    }

    println!();
    println!("{}", "Anticipation".bold());
    match &analysis.anticipation {
        Some(guidance) => {
            println!("  [{}] {} ({})", guidance.priority, guidance.question, guidance.chapter);
            println!("      {}", guidance.reasoning);
        }
        None => println!("  none"),
    }

    println!();
    println!("{}", "Profile".bold());
    println!("  {}", analysis.profile.directive());

    println!();
    print_plan(&analysis.plan);
}

fn print_plan(plan: &TurnPlan) {
    println!("{}", "Plan".bold());
    println!("  goal:     {}", plan.goal.to_string().cyan());
    println!("  priority: {}", plan.priority);
    println!("  route:    {:?}", plan.route);
    println!("  patches:  {}", if plan.allow_patches { "allowed" } else { "suppressed" });
    println!("  reason:   {}", plan.reasoning);
}

fn cmd_diff(config: &Config, prev: &Path, next: &Path, origin: Origin, format: OutputFormat) -> Result<()> {
    debug!(prev = %prev.display(), next = %next.display(), %origin, "cmd_diff: called");
    let before = load_record(prev)?;
    let after = load_record(next)?;

    let notices = ChangeWatcher::new(&config.detection).diff(&before, &after, origin);
    let detector = DomainEventDetector::new(&config.detection, Arc::new(StaticRequiredFields::default()));
    let events = detector.detect(&before, &after, origin);

    match format {
        OutputFormat::Json => {
            let out = json!({ "notices": notices, "events": events });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("{}", "Changes".bold());
            if notices.is_empty() {
                println!("  none");
            }
            for notice in &notices {
                println!(
                    "  {}: {} -> {}",
                    notice.field_path,
                    display_value(notice.previous_value.as_ref()),
                    display_value(notice.new_value.as_ref())
                );
            }
            println!();
            println!("{}", "Events".bold());
            if events.is_empty() {
                println!("  none");
            }
            for event in &events {
                let chapter = event.chapter.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string());
                println!("  {} ({}, {})", event.event_type.to_string().cyan(), chapter, event.priority);
            }
        }
    }
    Ok(())
}

fn display_value(value: Option<&serde_json::Value>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "(unset)".to_string())
}

fn cmd_context(
    config: &Config,
    state: &Path,
    message: &str,
    knowledge: Option<&Path>,
    field: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    debug!(state = %state.display(), %message, ?field, "cmd_context: called");
    let record = load_record(state)?;
    let history = history_for((!message.is_empty()).then_some(message));
    let analysis = TurnAnalyzer::new(&config.detection).analyze(&record, record.current_chapter, &history, message);
    let budgeter = ContextBudgeter::new(&config.context, load_knowledge(knowledge)?);
    let context = budgeter.budget(BudgetInput {
        plan: &analysis.plan,
        profile: &analysis.profile,
        record: &record,
        history: &[],
        query: message,
        focused_chapter: record.current_chapter,
        focused_field: field,
    });

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&context)?),
        OutputFormat::Text => print_context(&context, budgeter.ceiling()),
    }
    Ok(())
}

fn print_context(context: &PrunedContext, ceiling: usize) {
    println!("{}", "Context".bold());
    println!("  tokens:    {} / {}", context.token_estimate, ceiling);
    let chapters: Vec<String> = context.pruned_chapter_answers.keys().map(Chapter::to_string).collect();
    println!("  chapters:  {}", chapters.join(", "));
    println!("  conflicts: {}", context.conflicts.len());
    println!("  guidance:  {}", context.guidance.len());
    println!("  knowledge: {}", context.fragments.len());
    println!("  examples:  {}", context.examples.len());
    if context.minimal {
        println!("  {}", "minimal context".yellow());
    }
    for line in &context.prune_log {
        println!("  pruned: {}", line);
    }
}

fn engine(config: Config, knowledge: Option<&Path>) -> Result<Orchestrator> {
    config.validate().context("Invalid configuration")?;
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let prompts = PromptLoader::new(std::env::current_dir().context("Failed to read current directory")?);
    Ok(Orchestrator::with_collaborators(
        config,
        llm,
        load_knowledge(knowledge)?,
        Arc::new(StaticRequiredFields::default()),
        prompts,
    ))
}

async fn cmd_turn(
    config: Config,
    state: &Path,
    message: &str,
    knowledge: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    debug!(state = %state.display(), %message, "cmd_turn: called");
    let record = load_record(state)?;
    let engine = engine(config, knowledge)?;
    let outcome = engine.chat_turn(CLI_PROJECT_ID, &record, message).await?;

    match format {
        OutputFormat::Json => {
            let out = json!({
                "plan": outcome.plan,
                "result": outcome.result,
                "navigateTo": outcome.navigate_to,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            print_plan(&outcome.plan);
            if let Some(chapter) = outcome.navigate_to {
                println!("  navigate: {}", chapter.title());
            }
            println!();
            print_result(&outcome.result);
        }
    }
    Ok(())
}

async fn cmd_auto(
    config: Config,
    state: &Path,
    event_type: EventType,
    chapter: Option<Chapter>,
    knowledge: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    debug!(state = %state.display(), %event_type, ?chapter, "cmd_auto: called");
    let record = load_record(state)?;
    let source = match event_type {
        EventType::Idle => EventSource::Timer,
        _ => EventSource::User,
    };
    let event = ArchitectEvent::new(event_type, source, chapter.or(record.current_chapter), None);
    let engine = engine(config, knowledge)?;
    let turn = engine.auto_turn(CLI_PROJECT_ID, &record, event).await?;

    match format {
        OutputFormat::Json => {
            let out = json!({ "event": turn.event, "plan": turn.plan, "result": turn.result });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            print_plan(&turn.plan);
            println!();
            print_result(&turn.result);
        }
    }
    Ok(())
}

fn print_result(result: &OrchestratorResult) {
    let status = if result.is_success() {
        format!("{:?}", result.status).green()
    } else {
        format!("{:?}", result.status).red()
    };
    let degraded = if result.degraded { " (degraded)".yellow().to_string() } else { String::new() };
    println!(
        "{} {}{}  confidence {:.2}  tokens {}  attempts {}",
        "Result".bold(),
        status,
        degraded,
        result.confidence,
        result.tokens_used,
        result.attempts
    );
    for patch in &result.patches {
        let confirm = if patch.requires_confirmation { "confirm" } else { "auto" };
        println!(
            "  patch [{}] {:?} {} = {}",
            confirm,
            patch.delta.operation,
            patch.field_path(),
            patch.delta.value
        );
    }
    println!();
    println!("{}", result.draft_response);
}
