//! CLI error type.

use std::fmt;

use geocluster::app::AppError;
use geocluster::config::ConfigError;
use geocluster::logging::LoggingError;
use geocluster::resolver::ResolveError;

/// Errors surfaced to the user by a CLI command.
#[derive(Debug)]
pub enum CliError {
    /// Invalid configuration or arguments.
    Config(String),

    /// The application failed to start.
    App(AppError),

    /// A query failed.
    Query(ResolveError),

    /// Logging could not be installed.
    Logging(LoggingError),

    /// I/O failure (runtime creation, listener bind, serving).
    Io(std::io::Error),

    /// A result could not be encoded for output.
    Output(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::App(e) => write!(f, "{}", e),
            CliError::Query(e) => write!(f, "Query failed: {}", e),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::Output(e) => write!(f, "Failed to encode output: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(_) => None,
            CliError::App(e) => Some(e),
            CliError::Query(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::Output(e) => Some(e),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}

impl From<ResolveError> for CliError {
    fn from(e: ResolveError) -> Self {
        CliError::Query(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
