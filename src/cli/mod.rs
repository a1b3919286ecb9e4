//! CLI argument definitions.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dprof - Save and restore multi-monitor display layouts.
///
/// Robot Mode: use --robot or --format json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "dprof", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "DPROF_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Engine configuration file (TOML or YAML)
    #[arg(long, global = true, env = "DPROF_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Snapshot database path
    #[arg(long, global = true, env = "DPROF_DB", value_name = "FILE")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Capture & Inspect ===
    /// Capture the current display configuration
    Capture(CaptureArgs),

    /// List saved snapshots
    List,

    /// Describe a saved snapshot, or the live configuration
    Show(ShowArgs),

    /// Compare two snapshots, or one snapshot against the live configuration
    Diff(DiffArgs),

    // === Apply ===
    /// Check whether a snapshot can be applied right now
    Check(NameArgs),

    /// Apply a saved snapshot
    Apply(ApplyArgs),

    // === Store Management ===
    /// Delete a saved snapshot
    Delete(NameArgs),

    /// Export a snapshot to a JSON file
    Export(ExportArgs),

    /// Import a snapshot from a JSON file
    Import(ImportArgs),

    // === Hardware ===
    /// List video card vendor ids (e.g. 10DE, 1002, 8086)
    Vendors,

    // === Configuration ===
    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

/// Arguments for capturing the live configuration.
///
/// # Examples
///
/// ```bash
/// # Print the active layout
/// dprof capture
///
/// # Save it for later
/// dprof capture --save desk --description "Three screens, HDR on the middle one"
/// ```
#[derive(Parser, Debug)]
pub struct CaptureArgs {
    /// Save the snapshot under this name (replacing an existing one)
    #[arg(long, short = 's', value_name = "NAME")]
    pub save: Option<String>,

    /// Include connected but inactive paths
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Description stored with the snapshot
    #[arg(long, short = 'd', requires = "save")]
    pub description: Option<String>,
}

#[derive(Parser, Debug)]
pub struct NameArgs {
    /// Snapshot name
    pub name: String,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Snapshot name (omit for the live configuration)
    pub name: Option<String>,
}

#[derive(Parser, Debug)]
pub struct DiffArgs {
    /// First snapshot
    pub first: String,

    /// Second snapshot (omit to compare against the live configuration)
    pub second: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Snapshot name
    pub name: String,

    /// Apply even if the configuration is already active
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Snapshot name
    pub name: String,

    /// Destination JSON file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// JSON file written by `dprof export` or a bare snapshot
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Store under this name instead of the exported one
    #[arg(long, short = 'n')]
    pub name: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the configuration file path
    Path,
    /// Print the effective configuration
    Show,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
