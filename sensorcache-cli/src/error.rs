//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use sensorcache::cache::PersistError;
use sensorcache::config::ConfigFileError;
use sensorcache::store::DatasetError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to load the store's dataset
    Dataset(DatasetError),
    /// Failed to read or write a snapshot
    Snapshot(PersistError),
    /// No snapshot is available to inspect
    NoSnapshot(String),
    /// Entity not present in the snapshot
    NotFound { kind: &'static str, id: String },
    /// Rebuild finished with errors and `--strict` was given
    RebuildErrors(usize),
    /// Async runtime failure
    Runtime(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Dataset(_) => {
                eprintln!();
                eprintln!("Set the dataset path in config.ini:");
                eprintln!("  [store]");
                eprintln!("  dataset = /path/to/dataset.json");
            }
            CliError::NoSnapshot(_) => {
                eprintln!();
                eprintln!("Run 'sensorcache rebuild' first to build and persist a snapshot.");
            }
            _ => {}
        }

        process::exit(match self {
            CliError::RebuildErrors(_) => 2,
            _ => 1,
        })
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Dataset(e) => write!(f, "{}", e),
            CliError::Snapshot(e) => write!(f, "Snapshot error: {}", e),
            CliError::NoSnapshot(msg) => write!(f, "No snapshot available: {}", msg),
            CliError::NotFound { kind, id } => write!(f, "No {} '{}' in the snapshot", kind, id),
            CliError::RebuildErrors(count) => {
                write!(f, "Rebuild finished with {} error(s)", count)
            }
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Dataset(e) => Some(e),
            CliError::Snapshot(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<DatasetError> for CliError {
    fn from(e: DatasetError) -> Self {
        CliError::Dataset(e)
    }
}

impl From<PersistError> for CliError {
    fn from(e: PersistError) -> Self {
        CliError::Snapshot(e)
    }
}
