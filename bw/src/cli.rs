//! CLI command definitions and subcommands

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use tracing::debug;

use crate::domain::{Chapter, EventType, Origin, ProjectRecord};

/// Buildwise - turn orchestration for the renovation questionnaire assistant
#[derive(Parser)]
#[command(
    name = "bw",
    about = "Plan, budget and generate assistant turns over a project record",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run conflict detection, anticipation and planning on a state file (no model call)
    Analyze {
        /// Project record (YAML or JSON)
        state: PathBuf,

        /// User message to classify
        #[arg(short, long)]
        message: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show change notices and domain events between two snapshots
    Diff {
        /// Previous snapshot
        prev: PathBuf,

        /// Next snapshot
        next: PathBuf,

        /// Who made the change (user, assistant, system)
        #[arg(short, long, default_value = "user")]
        origin: Origin,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the token-budgeted context the next turn would see
    Context {
        /// Project record (YAML or JSON)
        state: PathBuf,

        /// User message the turn answers
        #[arg(short, long, default_value = "")]
        message: String,

        /// Knowledge file (YAML) with fragments and worked examples
        #[arg(short, long)]
        knowledge: Option<PathBuf>,

        /// Field the user last edited, e.g. budget.notes; kept when the chapter is cut down
        #[arg(long)]
        field: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Answer one chat message
    Turn {
        /// Project record (YAML or JSON)
        state: PathBuf,

        /// The user's message
        message: String,

        /// Knowledge file (YAML) with fragments and worked examples
        #[arg(short, long)]
        knowledge: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run one system-initiated turn for an event
    Auto {
        /// Project record (YAML or JSON)
        state: PathBuf,

        /// Event type (chapter_entered, chapter_completed, room_added, budget_edited, risk_increased, wizard_idle)
        #[arg(short, long)]
        event: EventType,

        /// Chapter the event belongs to (defaults to the current chapter)
        #[arg(long)]
        chapter: Option<Chapter>,

        /// Knowledge file (YAML) with fragments and worked examples
        #[arg(short, long)]
        knowledge: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for command results
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("buildwise")
        .join("logs")
        .join("buildwise.log")
}

/// Read a project record snapshot; JSON parses as YAML too
pub fn load_record(path: &Path) -> Result<ProjectRecord> {
    debug!(path = %path.display(), "load_record: called");
    let content = fs::read_to_string(path).context(format!("Failed to read state file {}", path.display()))?;
    let record: ProjectRecord =
        serde_yaml::from_str(&content).context(format!("Failed to parse state file {}", path.display()))?;
    Ok(record)
}
