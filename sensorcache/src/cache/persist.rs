//! Snapshot persistence.
//!
//! The last published snapshot is written to disk as JSON so a restarted
//! service can answer requests before its first rebuild completes.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::content::ContentCache;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Write a snapshot atomically (temp file + rename).
pub fn save_snapshot(cache: &ContentCache, path: &Path) -> Result<(), PersistError> {
    let write_error = |source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }

    let json = serde_json::to_vec(cache).map_err(|source| PersistError::Format {
        path: path.to_path_buf(),
        source,
    })?;

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json).map_err(write_error)?;
    fs::rename(&temp_path, path).map_err(write_error)?;

    debug!(path = %path.display(), "Snapshot saved");
    Ok(())
}

/// Read a snapshot written by [`save_snapshot`].
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_snapshot(path: &Path) -> Result<Option<ContentCache>, PersistError> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&content)
        .map(Some)
        .map_err(|source| PersistError::Format {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheBuilder, OfferingEntry};
    use crate::model::{Envelope, Locale};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn sample() -> ContentCache {
        let builder = CacheBuilder::new();
        builder.insert_offering(OfferingEntry {
            id: "O1".into(),
            name: "O1".into(),
            localized_names: [(Locale::new("de"), "Temperatur".to_string())].into(),
            features_of_interest: BTreeSet::from(["F1".to_string()]),
            envelope: Some(Envelope::new(4326, 1.0, 2.0, 3.0, 4.0)),
            ..Default::default()
        });
        builder.add_supported_languages([Locale::new("en")]);
        builder.set_global_envelope(Some(Envelope::new(4326, 1.0, 2.0, 3.0, 4.0)));
        builder.finish()
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state").join("snapshot.json");
        let cache = sample();

        save_snapshot(&cache, &path).unwrap();
        let loaded = load_snapshot(&path).unwrap().unwrap();

        assert_eq!(loaded, cache);
        assert_eq!(loaded.built_at(), cache.built_at());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(load_snapshot(&temp.path().join("none.json")).unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snapshot.json");
        fs::write(&path, b"{ not json").unwrap();

        assert!(matches!(
            load_snapshot(&path),
            Err(PersistError::Format { .. })
        ));
    }
}
