//! sensorcache CLI - Command-line interface
//!
//! Builds, refreshes and inspects the capabilities content cache.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sensorcache::config::config_file_path;

use commands::config::ConfigCommands;
use commands::inspect::{InspectArgs, InspectTarget};
use commands::rebuild::RebuildArgs;
use commands::run::RunArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "sensorcache")]
#[command(version, about = "Capabilities metadata cache for sensor observation services", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.sensorcache/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the cache once and persist the snapshot
    ///
    /// Without --offering/--procedure everything is rebuilt. With them, only
    /// the named entities and everything connected to them are recomputed on
    /// top of the persisted snapshot.
    Rebuild {
        /// Worker threads (0 = one per CPU; default from config)
        #[arg(long)]
        threads: Option<usize>,

        /// Offering to rebuild (repeatable)
        #[arg(long = "offering")]
        offerings: Vec<String>,

        /// Procedure to rebuild (repeatable)
        #[arg(long = "procedure")]
        procedures: Vec<String>,

        /// Exit with status 2 if the rebuild recorded errors
        #[arg(long)]
        strict: bool,
    },

    /// Rebuild on a fixed interval until Ctrl+C
    Run {
        /// Worker threads (0 = one per CPU; default from config)
        #[arg(long)]
        threads: Option<usize>,

        /// Seconds between rebuilds (default from config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Print the persisted snapshot
    Inspect {
        /// Snapshot file (default from config)
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Show one offering in detail
        #[arg(long, conflicts_with = "procedure")]
        offering: Option<String>,

        /// Show one procedure in detail
        #[arg(long)]
        procedure: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = dispatch(cli) {
        e.exit();
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Rebuild {
            threads,
            offerings,
            procedures,
            strict,
        } => {
            let runner = CliRunner::new(cli.config.as_deref(), true)?;
            commands::rebuild::run(
                &runner,
                RebuildArgs {
                    threads,
                    offerings,
                    procedures,
                    strict,
                },
            )
        }
        Commands::Run { threads, interval } => {
            let runner = CliRunner::new(cli.config.as_deref(), true)?;
            commands::run::run(
                &runner,
                RunArgs {
                    threads,
                    interval_secs: interval,
                },
            )
        }
        Commands::Inspect {
            snapshot,
            offering,
            procedure,
            json,
        } => {
            let runner = CliRunner::new(cli.config.as_deref(), false)?;
            let target = match (offering, procedure) {
                (Some(id), _) => InspectTarget::Offering(id),
                (None, Some(id)) => InspectTarget::Procedure(id),
                (None, None) => InspectTarget::Summary,
            };
            commands::inspect::run(
                &runner,
                InspectArgs {
                    snapshot,
                    target,
                    json,
                },
            )
        }
        Commands::Config { command } => {
            let path = cli.config.unwrap_or_else(config_file_path);
            commands::config::run(command, &path)
        }
    }
}
