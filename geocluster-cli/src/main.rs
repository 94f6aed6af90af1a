//! GeoCluster CLI - Command-line interface
//!
//! Runs the clustering service over HTTP, answers one-shot queries and
//! inspects configuration.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use geocluster::logging::{init_logging, LoggingConfig};

use commands::config::ConfigCommands;
use commands::query::QueryArgs;
use commands::serve::ServeArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "geocluster", version = geocluster::VERSION, about)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP service
    Serve(ServeArgs),

    /// Resolve one bounding box and print the JSON response
    Query(QueryArgs),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve(args) => {
            let _guard = init_logging(&LoggingConfig::from(&config.logging))?;
            commands::serve::run(args, &config)
        }
        Command::Query(args) => {
            // Keep stdout clean for the JSON response
            let _guard = init_logging(&LoggingConfig {
                level: "warn".to_string(),
                directory: None,
            })?;
            commands::query::run(args, &config)
        }
        Command::Config(command) => commands::config::run(command, &config),
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_with_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "geocluster",
            "query",
            "--lon1",
            "-73.99",
            "--lat1",
            "40.70",
            "--lon2",
            "-73.95",
            "--lat2",
            "40.75",
            "--min-points",
            "3",
        ])
        .unwrap();

        match cli.command {
            Command::Query(args) => {
                assert_eq!(args.lon1, -73.99);
                assert_eq!(args.min_points, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "geocluster",
            "--config",
            "/etc/geocluster.ini",
            "serve",
            "--bind",
            "127.0.0.1:8081",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/etc/geocluster.ini")));
        assert!(matches!(cli.command, Command::Serve(_)));
    }
}
