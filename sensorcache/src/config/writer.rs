//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let deadline = config
        .cache
        .deadline_secs
        .map(|s| s.to_string())
        .unwrap_or_default();
    let snapshot_file = config
        .cache
        .snapshot_file
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_else(|| "none".to_string());
    let extra_srids = config
        .cache
        .extra_srids
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let default_language = config
        .cache
        .default_language
        .as_ref()
        .map(|l| l.to_string())
        .unwrap_or_default();
    let dataset = config
        .store
        .dataset
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();

    format!(
        r#"[cache]
; Worker threads per rebuild batch (0 = one per CPU core)
threads = {}
; Seconds between scheduled full rebuilds when running as a service
refresh_interval_secs = {}
; Optional rebuild deadline in seconds; tasks not started by then are skipped
deadline_secs = {}
; Snapshot persisted after every rebuild and served on restart ('none' disables)
snapshot_file = {}
; Extra EPSG codes advertised besides the store's native one, e.g. 3857, 31467
extra_srids = {}
; Language always advertised, e.g. en or de-DE
default_language = {}

[store]
; JSON dataset served by the in-memory store
dataset = {}

[logging]
directory = {}
file = {}
"#,
        config.cache.threads,
        config.cache.refresh_interval_secs,
        deadline,
        snapshot_file,
        extra_srids,
        default_language,
        dataset,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Convert path to string, collapsing the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::super::file::ConfigFile;
    use super::*;
    use crate::model::Locale;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_written_file_loads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.cache.threads = 6;
        config.cache.deadline_secs = Some(120);
        config.cache.extra_srids = BTreeSet::from([3857, 4258]);
        config.cache.default_language = Some(Locale::new("de"));
        config.cache.snapshot_file = None;
        config.store.dataset = Some(PathBuf::from("/srv/sos/dataset.json"));

        config.save_to(&path).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_defaults_written_with_comments() {
        let content = to_config_string(&ConfigFile::default());
        assert!(content.contains("[cache]"));
        assert!(content.contains("[store]"));
        assert!(content.contains("[logging]"));
        assert!(content.contains("; Worker threads"));
        assert!(content.contains("deadline_secs = \n"));
    }
}
