//! Configuration management CLI commands.

use std::path::Path;

use clap::Subcommand;
use sensorcache::config::ConfigFile;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration (file values over defaults)
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Init { force } => run_init(config_path, force),
    }
}

fn run_show(config_path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(config_path)?;
    let source = if config_path.exists() {
        config_path.display().to_string()
    } else {
        "(defaults, no file)".to_string()
    };
    println!("# {}", source);
    println!("{}", format_config(&config));
    Ok(())
}

fn run_init(config_path: &Path, force: bool) -> Result<(), CliError> {
    if force {
        ConfigFile::default().save_to(config_path)?;
    } else if !ConfigFile::ensure_exists(config_path)? {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }
    println!("Wrote {}", config_path.display());
    Ok(())
}

fn or_unset(value: Option<String>) -> String {
    value.unwrap_or_else(|| "(not set)".to_string())
}

/// Effective settings, one `section.key = value` per line.
pub fn format_config(config: &ConfigFile) -> String {
    let srids: Vec<String> = config.cache.extra_srids.iter().map(|s| s.to_string()).collect();
    [
        format!("cache.threads = {}", config.cache.threads),
        format!("cache.refresh_interval_secs = {}", config.cache.refresh_interval_secs),
        format!(
            "cache.deadline_secs = {}",
            or_unset(config.cache.deadline_secs.map(|s| s.to_string()))
        ),
        format!(
            "cache.snapshot_file = {}",
            or_unset(config.cache.snapshot_file.as_ref().map(|p| p.display().to_string()))
        ),
        format!("cache.extra_srids = {}", srids.join(", ")),
        format!(
            "cache.default_language = {}",
            or_unset(config.cache.default_language.as_ref().map(|l| l.to_string()))
        ),
        format!(
            "store.dataset = {}",
            or_unset(config.store.dataset.as_ref().map(|p| p.display().to_string()))
        ),
        format!("logging.directory = {}", config.logging.directory.display()),
        format!("logging.file = {}", config.logging.file),
    ]
    .join("\n")
}
