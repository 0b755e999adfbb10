//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Gateway command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Port to bind, overriding configuration
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory of the prebuilt frontend, overriding configuration
    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<PathBuf>,
}

/// Timeline command arguments.
#[derive(Debug, Args)]
pub struct TimelineCommand {
    /// Stop after this many pages (all pages when omitted)
    #[arg(short, long)]
    pub pages: Option<usize>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Map command arguments.
#[derive(Debug, Args)]
pub struct MapCommand {
    /// Stop after this many pages (all pages when omitted)
    #[arg(short, long)]
    pub pages: Option<usize>,

    /// Record field that names each record's dataset
    #[arg(short, long, value_name = "FIELD")]
    pub dataset_field: Option<String>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration, with the access token masked
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
