//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a test plan with every sample logged instead of sent
    Run {
        /// Plan file (.yaml, .yml or .json)
        #[arg(value_name = "PLAN")]
        plan: PathBuf,

        /// Number of virtual users
        #[arg(long, value_name = "N")]
        threads: Option<usize>,

        /// Main loop iterations per user, -1 for forever
        ///
        /// A forever run without `threads.duration` stops a user once
        /// `engine.max_idle_passes` passes in a row yield nothing.
        #[arg(long, value_name = "N", allow_hyphen_values = true)]
        loops: Option<i64>,

        /// Seed for random order and unseeded weighted distribution
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,

        /// Initial thread variable, repeatable (example: --var USER=alice)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve and compile a test plan, reporting every problem found
    Validate {
        /// Plan file (.yaml, .yml or .json)
        #[arg(value_name = "PLAN")]
        plan: PathBuf,
    },

    /// Print a configuration file with every default filled in
    GenerateConfig,
}
