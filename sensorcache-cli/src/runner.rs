//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and controller
//! creation to reduce duplication across command handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sensorcache::cache::CacheController;
use sensorcache::config::{config_file_path, ConfigFile};
use sensorcache::logging::{init_logging, LogOutput, LoggingGuard};
use sensorcache::store::{Dataset, MemoryStore};
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
    config_path: PathBuf,
}

impl CliRunner {
    /// Load config from `config_path` (or the default location) and
    /// initialize logging.
    pub fn new(config_path: Option<&Path>, console: bool) -> Result<Self, CliError> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;

        let output = LogOutput {
            console,
            truncate: false,
        };
        let logging_guard = init_logging(&config.logging.directory, &config.logging.file, output)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            config_path,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("sensorcache v{}", sensorcache::VERSION);
        info!(config = %self.config_path.display(), "sensorcache CLI: {} command", command);
    }

    /// Create a controller over the configured dataset.
    pub fn create_controller(&self) -> Result<Arc<CacheController>, CliError> {
        let path = self.config.store.dataset.as_ref().ok_or_else(|| {
            CliError::Config("no dataset configured ([store] dataset)".to_string())
        })?;
        let dataset = Dataset::from_json_file(path)?;
        info!(
            path = %path.display(),
            offerings = dataset.offerings.len(),
            procedures = dataset.procedures.len(),
            observations = dataset.observations.len(),
            "Dataset loaded"
        );

        let store = Arc::new(MemoryStore::new(dataset).with_name(path.display().to_string()));
        let mut controller = CacheController::new(store, self.config.cache_settings());
        if let Some(snapshot) = &self.config.cache.snapshot_file {
            controller = controller.with_snapshot_file(snapshot.clone());
        }
        Ok(Arc::new(controller))
    }

    /// Worker threads: CLI override, else config.
    pub fn threads(&self, cli_threads: Option<usize>) -> usize {
        cli_threads.unwrap_or(self.config.cache.threads)
    }
}
