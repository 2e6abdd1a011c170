//! The INI file behind [`ConfigFile`], by default `~/.sensorcache/config.ini`.
//!
//! Parsing lives in [`super::parser`], serialization in [`super::writer`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

pub use super::settings::*;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] ini::Error),

    #[error("Failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A value that does not parse or is out of range.
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFile {
    /// Read `path`, or return defaults when no file exists there.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        super::parser::parse_ini(&Ini::load_from_file(path)?)
    }

    /// Write these settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let write_error = |source| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(path, super::writer::to_config_string(self)).map_err(write_error)
    }

    /// Write defaults to `path` unless a file is already there.
    ///
    /// Returns whether a file was created.
    pub fn ensure_exists(path: &Path) -> Result<bool, ConfigFileError> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }
}

/// `~/.sensorcache`, or `./.sensorcache` without a home directory.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sensorcache")
}

pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DEFAULT_REFRESH_INTERVAL_SECS;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.cache.threads, 0);
        assert_eq!(config.cache.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL_SECS);
        assert!(config.cache.deadline_secs.is_none());
        assert!(config.store.dataset.is_none());
        assert_eq!(config.logging.file, "sensorcache.log");
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("missing.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_ensure_exists_creates_file_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        assert!(ConfigFile::ensure_exists(&path).unwrap());
        assert!(path.exists());

        fs::write(&path, "[cache]\nthreads = 3\n").unwrap();
        assert!(!ConfigFile::ensure_exists(&path).unwrap());
        assert_eq!(ConfigFile::load_from(&path).unwrap().cache.threads, 3);
    }

    #[test]
    fn test_save_into_file_path_fails() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let err = ConfigFile::default()
            .save_to(&blocker.join("config.ini"))
            .unwrap_err();
        assert!(matches!(err, ConfigFileError::Write { .. }));
        assert!(err.to_string().contains("config.ini"));
    }

    #[test]
    fn test_cache_settings_conversion() {
        let mut config = ConfigFile::default();
        config.cache.threads = 4;
        config.cache.deadline_secs = Some(10);

        let settings = config.cache_settings();
        assert_eq!(settings.threads, 4);
        assert_eq!(settings.deadline, Some(std::time::Duration::from_secs(10)));
    }
}
