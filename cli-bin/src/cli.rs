//! Sub-command definitions and argument structs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lootwatch",
    version,
    about = "Watches your downloads for new loot filters and installs them"
)]
pub struct Cli {
    /// Verbose logging (equivalent to RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the configured directories until interrupted
    Run {
        /// Log replacements without copying any bytes
        #[arg(long)]
        dry_run: bool,

        /// Start with event processing paused
        #[arg(long)]
        paused: bool,
    },

    /// Inspect or edit the configuration
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },

    /// List `.filter` files in a directory
    List {
        /// Directory to inspect; defaults to the configured filters directory
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Print every configuration value
    Show,

    /// Set a configuration key and persist the file
    Set { key: String, value: String },
}
