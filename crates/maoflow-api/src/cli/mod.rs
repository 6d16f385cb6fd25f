//! CLI command definitions for the `maoflow` binary.
//!
//! Uses clap derive macros. Global verbosity flags apply to every
//! subcommand; `RUST_LOG` overrides them.

use clap::{Parser, Subcommand};

/// Streaming chat backend for OpenAI-compatible models.
#[derive(Parser)]
#[command(name = "maoflow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Suppress all log output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More log output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Bind address. Defaults to `server.host` from config.toml.
        #[arg(long)]
        host: Option<String>,

        /// Port. Defaults to `server.port` from config.toml.
        #[arg(long)]
        port: Option<u16>,

        /// Export spans through OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,
    },

    /// Create or upgrade the database schema, then exit.
    Migrate,
}

impl Commands {
    pub fn otel_requested(&self) -> bool {
        matches!(self, Commands::Serve { otel: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_serve_overrides() {
        let cli = Cli::try_parse_from(["maoflow", "-vv", "serve", "--port", "9000", "--otel"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
        assert!(cli.command.otel_requested());
        match cli.command {
            Commands::Serve { host, port, .. } => {
                assert!(host.is_none());
                assert_eq!(port, Some(9000));
            }
            Commands::Migrate => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parses_migrate_with_trailing_global_flag() {
        let cli = Cli::try_parse_from(["maoflow", "migrate", "-q"]).unwrap();
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Migrate));
        assert!(!cli.command.otel_requested());
    }

    #[test]
    fn test_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["maoflow", "chat"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }
}
