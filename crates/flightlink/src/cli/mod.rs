//! Command-line interface for flightlink.
//!
//! This module provides the CLI structure for the `flightlink` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DecodeCommand, EncodeCommand, OutputFormat, ReceiveCommand, SendCommand,
};

/// flightlink - Checksummed flight telemetry over TCP
///
/// Streams raw flight-data lines to a receiver as sequenced, checksummed,
/// length-framed packets, and validates and tallies them on the other end.
#[derive(Debug, Parser)]
#[command(name = "flightlink")]
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
    /// Stream a telemetry file to a receiver
    Send(SendCommand),

    /// Listen for senders and tally incoming packets
    Receive(ReceiveCommand),

    /// Encode one raw line and print the frame
    Encode(EncodeCommand),

    /// Decode and validate one frame
    Decode(DecodeCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }

    /// Whether the command needs the configuration loaded up front.
    ///
    /// `config validate` loads the file itself so it can report the error
    /// instead of failing before dispatch.
    #[must_use]
    pub fn loads_config(&self) -> bool {
        !matches!(self.command, Command::Config(ConfigCommand::Validate { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn decode_cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Decode(DecodeCommand {
                frame: String::new(),
                format: OutputFormat::Plain,
            }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "flightlink");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(decode_cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(decode_cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(decode_cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(decode_cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_send() {
        let args = vec![
            "flightlink",
            "send",
            "flight.csv",
            "--tail",
            "C-FGAX",
            "--port",
            "6000",
            "--interval",
            "100",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Send(cmd) = cli.command else {
            panic!("expected send command");
        };
        assert_eq!(cmd.source, Some(PathBuf::from("flight.csv")));
        assert_eq!(cmd.tail.as_deref(), Some("C-FGAX"));
        assert_eq!(cmd.port, Some(6000));
        assert_eq!(cmd.interval, Some(100));
    }

    #[test]
    fn test_parse_receive() {
        let args = vec!["flightlink", "receive", "--once", "--format", "json"];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Receive(cmd) = cli.command else {
            panic!("expected receive command");
        };
        assert!(cmd.once);
        assert_eq!(cmd.format, OutputFormat::Json);
        assert!(cmd.bind.is_none());
    }

    #[test]
    fn test_parse_encode() {
        let args = vec!["flightlink", "encode", "a,b,c", "-t", "C-FGAX", "-s", "7"];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Encode(cmd) = cli.command else {
            panic!("expected encode command");
        };
        assert_eq!(cmd.line, "a,b,c");
        assert_eq!(cmd.sequence, 7);
    }

    #[test]
    fn test_parse_config_show() {
        let args = vec!["flightlink", "config", "show", "--json"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Show { json: true })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let args = vec!["flightlink", "-c", "/custom/config.toml", "config", "path"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_validate_skips_config_load() {
        let cli = Cli::try_parse_from(["flightlink", "config", "validate"]).unwrap();
        assert!(!cli.loads_config());

        let cli = Cli::try_parse_from(["flightlink", "config", "show"]).unwrap();
        assert!(cli.loads_config());
        assert!(decode_cli(0, false).loads_config());
    }

    #[test]
    fn test_parse_with_verbose() {
        let args = vec!["flightlink", "-vv", "decode", "x"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
