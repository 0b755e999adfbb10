//! Command-line interface for archive-timeline.
//!
//! This module provides the CLI structure for the `archtl` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, MapCommand, ServeCommand, TimelineCommand};

use crate::logging::Verbosity;

/// archtl - Relay, page through and map archive records
///
/// Runs the records gateway, or walks it as a client to print the timeline
/// or export the map layers as GeoJSON.
#[derive(Debug, Parser)]
#[command(name = "archtl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the records gateway
    Serve(ServeCommand),

    /// Fetch records through the gateway and print the timeline
    Timeline(TimelineCommand),

    /// Fetch records through the gateway and print map layers as GeoJSON
    Map(MapCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}
