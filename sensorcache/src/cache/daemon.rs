//! Scheduled cache refresh daemon.
//!
//! Runs a full rebuild every interval on the blocking thread pool, so the
//! async runtime stays responsive while worker threads query the store.
//!
//! # Example
//!
//! ```ignore
//! use sensorcache::cache::CacheRefreshDaemon;
//!
//! let daemon = CacheRefreshDaemon::new(controller, Duration::from_secs(300));
//! tokio::spawn(daemon.run(shutdown_token));
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::controller::CacheController;

/// Default interval between scheduled rebuilds (5 minutes).
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

pub struct CacheRefreshDaemon {
    controller: Arc<CacheController>,
    interval: Duration,
    threads: usize,
}

impl CacheRefreshDaemon {
    pub fn new(controller: Arc<CacheController>, interval: Duration) -> Self {
        let threads = controller.settings().threads;
        Self {
            controller,
            interval,
            threads,
        }
    }

    /// Override the worker thread count used for scheduled rebuilds.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Run scheduled rebuilds until shutdown is signalled.
    ///
    /// A rebuild in progress when shutdown is signalled runs to completion.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            threads = self.threads,
            "Cache refresh daemon starting"
        );

        let mut interval = tokio::time::interval(self.interval);
        // Skip the first immediate tick
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Cache refresh daemon shutting down");
                    break;
                }

                _ = interval.tick() => {
                    self.refresh().await;
                }
            }
        }
    }

    async fn refresh(&self) {
        let controller = Arc::clone(&self.controller);
        let threads = self.threads;

        match tokio::task::spawn_blocking(move || controller.trigger_full_rebuild(threads)).await {
            Ok(errors) if errors.is_empty() => debug!("Scheduled cache refresh complete"),
            Ok(errors) => warn!(
                errors = errors.len(),
                "Scheduled cache refresh finished with errors, snapshot published"
            ),
            Err(e) => warn!(error = %e, "Scheduled cache refresh task failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OfferingRecord;
    use crate::store::{Dataset, MemoryStore};
    use crate::update::CacheSettings;

    fn controller() -> (Arc<MemoryStore>, Arc<CacheController>) {
        let store = Arc::new(MemoryStore::new(
            Dataset::new().with_offering(OfferingRecord::new("O1")),
        ));
        let controller = Arc::new(CacheController::new(
            store.clone(),
            CacheSettings::default().with_threads(1),
        ));
        (store, controller)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_refreshes_on_interval() {
        let (_store, controller) = controller();
        let daemon = CacheRefreshDaemon::new(Arc::clone(&controller), Duration::from_millis(20));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(daemon.run(shutdown.clone()));

        for _ in 0..100 {
            if controller.last_report().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.cancel();
        handle.await.unwrap();

        assert!(controller.snapshot().offering("O1").is_some());
    }

    #[tokio::test]
    async fn test_shutdown_before_first_tick() {
        let (store, controller) = controller();
        let daemon = CacheRefreshDaemon::new(controller, Duration::from_secs(3600));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        daemon.run(shutdown).await;
        assert_eq!(store.sessions_opened(), 0);
    }

    #[test]
    fn test_threads_default_from_settings() {
        let (_store, controller) = controller();
        let daemon = CacheRefreshDaemon::new(controller, Duration::from_secs(1)).with_threads(4);
        assert_eq!(daemon.threads, 4);
        assert_eq!(daemon.interval, Duration::from_secs(1));
    }
}
