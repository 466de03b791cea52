//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Send command arguments.
#[derive(Debug, Args)]
pub struct SendCommand {
    /// Raw telemetry file to stream (overrides `sender.source_path`)
    pub source: Option<PathBuf>,

    /// Tail number stamped on every frame
    #[arg(short, long)]
    pub tail: Option<String>,

    /// Receiver host
    #[arg(long)]
    pub host: Option<String>,

    /// Receiver port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Delay between frames in milliseconds
    #[arg(short, long, value_name = "MS")]
    pub interval: Option<u64>,

    /// Sequence number of the first frame
    #[arg(long)]
    pub start_sequence: Option<u32>,
}

/// Receive command arguments.
#[derive(Debug, Args)]
pub struct ReceiveCommand {
    /// Address to listen on
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Exit after the first sender disconnects
    #[arg(long)]
    pub once: bool,

    /// Output format for the final summary
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Encode command arguments.
#[derive(Debug, Args)]
pub struct EncodeCommand {
    /// Raw CSV telemetry line
    pub line: String,

    /// Tail number stamped on the frame
    #[arg(short, long)]
    pub tail: Option<String>,

    /// Sequence number to assign
    #[arg(short, long, default_value = "0")]
    pub sequence: u32,
}

/// Decode command arguments.
#[derive(Debug, Args)]
pub struct DecodeCommand {
    /// Wire frame text (without the length prefix)
    pub frame: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
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

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}
