//! INI configuration.
//!
//! [`ConfigFile`] maps `~/.sensorcache/config.ini` onto typed settings and
//! converts them into the engine's [`CacheSettings`](crate::update::CacheSettings).

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{default_log_directory, DEFAULT_SNAPSHOT_FILE, DEFAULT_THREADS};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{CacheConfig, ConfigFile, LoggingConfig, StoreConfig};
