//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::collections::BTreeSet;
use std::path::PathBuf;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::model::Locale;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
/// Empty values leave the default in place.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = non_empty(section.get("threads")) {
            config.cache.threads = v
                .parse()
                .map_err(|_| invalid("cache", "threads", v, "must be a non-negative integer (0 = auto)"))?;
        }
        if let Some(v) = non_empty(section.get("refresh_interval_secs")) {
            config.cache.refresh_interval_secs = match v.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(invalid(
                        "cache",
                        "refresh_interval_secs",
                        v,
                        "must be a positive integer (seconds)",
                    ))
                }
            };
        }
        if let Some(v) = non_empty(section.get("deadline_secs")) {
            config.cache.deadline_secs = Some(v.parse().map_err(|_| {
                invalid("cache", "deadline_secs", v, "must be a non-negative integer (seconds)")
            })?);
        }
        if let Some(v) = non_empty(section.get("snapshot_file")) {
            config.cache.snapshot_file = match v.to_lowercase().as_str() {
                "none" | "off" => None,
                _ => Some(expand_tilde(v)),
            };
        }
        if let Some(v) = non_empty(section.get("extra_srids")) {
            config.cache.extra_srids = parse_srids(v)?;
        }
        if let Some(v) = non_empty(section.get("default_language")) {
            config.cache.default_language = Some(Locale::new(v));
        }
    }

    // [store] section
    if let Some(section) = ini.section(Some("store")) {
        if let Some(v) = non_empty(section.get("dataset")) {
            config.store.dataset = Some(expand_tilde(v));
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("file")) {
            if v.contains('/') || v.contains('\\') {
                return Err(invalid("logging", "file", v, "must be a file name, not a path"));
            }
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a comma-separated list of EPSG codes.
fn parse_srids(value: &str) -> Result<BTreeSet<i32>, ConfigFileError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let code = s.strip_prefix("EPSG:").unwrap_or(s);
            match code.parse::<i32>() {
                Ok(srid) if srid > 0 => Ok(srid),
                _ => Err(invalid(
                    "cache",
                    "extra_srids",
                    value,
                    "expected comma-separated EPSG codes like '4326, 3857'",
                )),
            }
        })
        .collect()
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_ini_gives_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_cache_section() {
        let config = parse(
            "[cache]\nthreads = 8\nrefresh_interval_secs = 60\ndeadline_secs = 30\n\
             extra_srids = 3857, EPSG:31467\ndefault_language = en_us\nsnapshot_file = none\n",
        )
        .unwrap();

        assert_eq!(config.cache.threads, 8);
        assert_eq!(config.cache.refresh_interval_secs, 60);
        assert_eq!(config.cache.deadline_secs, Some(30));
        assert_eq!(config.cache.extra_srids, BTreeSet::from([3857, 31467]));
        assert_eq!(config.cache.default_language, Some(Locale::new("en-US")));
        assert_eq!(config.cache.snapshot_file, None);
    }

    #[test]
    fn test_store_and_logging_sections() {
        let config = parse("[store]\ndataset = /data/sos.json\n[logging]\ndirectory = /var/log/sc\nfile = cache.log\n")
            .unwrap();
        assert_eq!(config.store.dataset, Some(PathBuf::from("/data/sos.json")));
        assert_eq!(config.logging.directory, PathBuf::from("/var/log/sc"));
        assert_eq!(config.logging.file, "cache.log");
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = parse("[cache]\nthreads =\ndeadline_secs =\n").unwrap();
        assert_eq!(config.cache.threads, ConfigFile::default().cache.threads);
        assert_eq!(config.cache.deadline_secs, None);
    }

    #[test]
    fn test_invalid_threads() {
        let err = parse("[cache]\nthreads = many\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, value, .. } => {
                assert_eq!(section, "cache");
                assert_eq!(key, "threads");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        assert!(parse("[cache]\nrefresh_interval_secs = 0\n").is_err());
    }

    #[test]
    fn test_invalid_srid_list() {
        assert!(parse("[cache]\nextra_srids = 4326, wgs84\n").is_err());
        assert!(parse("[cache]\nextra_srids = -1\n").is_err());
    }

    #[test]
    fn test_log_file_must_be_a_name() {
        assert!(parse("[logging]\nfile = logs/cache.log\n").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/data.json"), home.join("data.json"));
        }
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }
}
