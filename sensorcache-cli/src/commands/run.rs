//! Run command - keep the cache fresh until interrupted.
//!
//! Serves the persisted snapshot (if any), rebuilds once immediately and
//! then rebuilds on the configured interval until Ctrl+C.

use std::sync::Arc;
use std::time::Duration;

use sensorcache::cache::CacheRefreshDaemon;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::rebuild::format_report;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the run command.
pub struct RunArgs {
    pub threads: Option<usize>,
    pub interval_secs: Option<u64>,
}

/// Run the refresh daemon.
pub fn run(runner: &CliRunner, args: RunArgs) -> Result<(), CliError> {
    runner.log_startup("run");
    let controller = runner.create_controller()?;
    let threads = runner.threads(args.threads);
    let interval = args
        .interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| runner.config().refresh_interval());
    if interval.is_zero() {
        return Err(CliError::Config("refresh interval must be positive".to_string()));
    }

    match controller.warm_start() {
        Ok(true) => println!("Serving persisted snapshot"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "Ignoring unreadable snapshot"),
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    runtime.block_on(async move {
        let initial = Arc::clone(&controller);
        let errors = tokio::task::spawn_blocking(move || initial.trigger_full_rebuild(threads))
            .await
            .map_err(|e| CliError::Runtime(e.to_string()))?;
        if let Some(report) = controller.last_report() {
            println!("{}", format_report(&report));
        }
        if !errors.is_empty() {
            println!("Initial rebuild finished with {} error(s), see log", errors.len());
        }

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
            }
            signal_token.cancel();
        });

        println!(
            "Refreshing every {}s, press Ctrl+C to stop",
            interval.as_secs()
        );
        CacheRefreshDaemon::new(controller, interval)
            .with_threads(threads)
            .run(shutdown)
            .await;

        println!("Stopped");
        Ok(())
    })
}
