use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tvshelf")]
#[command(author, version, about = "TV show library scanner")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Scan the configured media paths once and print a summary
    Scan {
        /// Skip files whose size and modification time are unchanged
        #[arg(long)]
        incremental: bool,

        /// Do not probe files for technical metadata
        #[arg(long)]
        skip_metadata: bool,

        /// Maximum concurrent probes
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Parse episode paths and show what was recognized
    Parse {
        /// Paths to parse
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent scans
    History {
        /// Number of scans to show
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Check that external tools are available
    CheckTools,

    /// Display version information
    Version,
}
