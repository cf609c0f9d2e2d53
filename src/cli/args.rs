//! CLI argument definitions.
//!
//! All Clap derive structs for `honorfx` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Honor effect groups and per-session effect scheduling.
#[derive(Parser, Debug)]
#[command(name = "honorfx", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the YAML configuration file.
    #[arg(short, long, global = true, env = "HONORFX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the effect group directory from the configuration.
    #[arg(long, global = true, env = "HONORFX_GROUPS_DIR")]
    pub groups_dir: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "HONORFX_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "HONORFX_LOG_FORMAT")]
    pub log_format: LogFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect and edit stored effect groups.
    Groups(GroupsCommand),

    /// Load every stored group into the cache and report the result.
    Refresh(RefreshArgs),

    /// Run effect schedulers for the configured sessions.
    Run(RunArgs),
}

// ============================================================================
// Groups Command
// ============================================================================

/// Effect group management.
#[derive(Args, Debug)]
pub struct GroupsCommand {
    /// Groups subcommand.
    #[command(subcommand)]
    pub subcommand: GroupsSubcommand,
}

/// Groups subcommands.
#[derive(Subcommand, Debug)]
pub enum GroupsSubcommand {
    /// List stored group ids.
    List(GroupsListArgs),

    /// Show one group.
    Info(GroupsInfoArgs),

    /// Add an effect to a group, replacing any entry of the same kind.
    Set(GroupsSetArgs),

    /// Remove every entry of an effect kind from a group.
    Remove(GroupsRemoveArgs),

    /// Delete a group.
    Delete(GroupsDeleteArgs),

    /// Parse every stored group and report malformed documents.
    Check(GroupsCheckArgs),
}

/// Arguments for `groups list`.
#[derive(Args, Debug)]
pub struct GroupsListArgs {
    /// Output format.
    #[arg(long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `groups info`.
#[derive(Args, Debug)]
pub struct GroupsInfoArgs {
    /// Group id.
    pub id: String,

    /// Output format.
    #[arg(long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `groups set`.
#[derive(Args, Debug)]
pub struct GroupsSetArgs {
    /// Group id (created if absent).
    pub id: String,

    /// Effect kind, e.g. `speed`.
    pub kind: String,

    /// Effect intensity (0 is the weakest level).
    pub intensity: u32,
}

/// Arguments for `groups remove`.
#[derive(Args, Debug)]
pub struct GroupsRemoveArgs {
    /// Group id.
    pub id: String,

    /// Effect kind to remove.
    pub kind: String,
}

/// Arguments for `groups delete`.
#[derive(Args, Debug)]
pub struct GroupsDeleteArgs {
    /// Group id.
    pub id: String,
}

/// Arguments for `groups check`.
#[derive(Args, Debug)]
pub struct GroupsCheckArgs {
    /// Output format.
    #[arg(long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Refresh / Run
// ============================================================================

/// Arguments for `refresh`.
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Output format.
    #[arg(long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stop after this long (e.g. `30s`); runs until interrupted otherwise.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Reload the cache from disk at this interval (e.g. `5m`).
    #[arg(long, value_parser = humantime::parse_duration, env = "HONORFX_REFRESH_INTERVAL")]
    pub refresh_interval: Option<Duration>,

    /// Write JSONL events to this file (`-` for stdout).
    #[arg(long, env = "HONORFX_EVENTS")]
    pub events: Option<PathBuf>,

    /// Expose Prometheus metrics on this port.
    #[arg(long, env = "HONORFX_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

// ============================================================================
// Shared Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}
