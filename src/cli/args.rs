//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// regcache - service registry client cache
///
/// Runs the registry cache against local JSON files to inspect how deltas
/// merge and when reconciliation refetches.
#[derive(Parser, Debug)]
#[command(name = "regcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "REGCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the cache against JSON registry files and print what it holds
    Watch(WatchArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// JSON file holding the full registry (service -> id -> instance)
    #[arg(long)]
    pub full: PathBuf,

    /// JSON file holding the delta (changes + total_count)
    #[arg(long)]
    pub delta: PathBuf,

    /// Override fetch.interval_secs
    #[arg(short, long)]
    pub interval_secs: Option<u64>,

    /// Stop after this many reports (runs until Ctrl-C when omitted)
    #[arg(long)]
    pub cycles: Option<u32>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., fetch.interval_secs)
        key: String,

        /// Value to set
        value: String,
    },
}
