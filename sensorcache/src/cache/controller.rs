//! Cache controller: triggers rebuilds and publishes snapshots.
//!
//! # Thread Safety
//!
//! - **Atomicity**: a rebuild fills a fresh builder outside any lock; the
//!   finished snapshot replaces the current one under a brief write lock.
//! - **Isolation**: readers clone the current `Arc<ContentCache>` and keep a
//!   complete snapshot for as long as they hold it.
//! - **Single writer**: an update mutex serializes rebuilds.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use super::content::ContentCache;
use super::persist::{load_snapshot, save_snapshot, PersistError};
use crate::store::CacheStore;
use crate::update::{CacheRebuild, CacheSettings, CacheUpdateError, RebuildReport, RebuildScope};

pub struct CacheController {
    store: Arc<dyn CacheStore>,
    settings: CacheSettings,
    current: RwLock<Arc<ContentCache>>,
    /// Set once a rebuild or warm start has published a snapshot.
    published: AtomicBool,
    update_lock: Mutex<()>,
    last_report: Mutex<Option<RebuildReport>>,
    snapshot_file: Option<PathBuf>,
}

impl CacheController {
    /// Controller serving an empty cache until the first rebuild.
    pub fn new(store: Arc<dyn CacheStore>, settings: CacheSettings) -> Self {
        Self {
            store,
            settings,
            current: RwLock::new(Arc::new(ContentCache::empty())),
            published: AtomicBool::new(false),
            update_lock: Mutex::new(()),
            last_report: Mutex::new(None),
            snapshot_file: None,
        }
    }

    /// Persist every published snapshot to `path`.
    pub fn with_snapshot_file(mut self, path: PathBuf) -> Self {
        self.snapshot_file = Some(path);
        self
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<ContentCache> {
        Arc::clone(&self.current.read())
    }

    /// Report of the most recent rebuild, if any ran.
    pub fn last_report(&self) -> Option<RebuildReport> {
        self.last_report.lock().clone()
    }

    /// Serve the persisted snapshot, if one exists.
    ///
    /// Returns whether a snapshot was loaded.
    pub fn warm_start(&self) -> Result<bool, PersistError> {
        let Some(path) = &self.snapshot_file else {
            return Ok(false);
        };
        match load_snapshot(path)? {
            Some(cache) => {
                info!(
                    path = %path.display(),
                    offerings = cache.counts().offerings,
                    "Serving persisted snapshot"
                );
                *self.current.write() = Arc::new(cache);
                self.published.store(true, Ordering::Release);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Rebuild everything and publish the result.
    pub fn trigger_full_rebuild(&self, threads: usize) -> Vec<CacheUpdateError> {
        self.rebuild(RebuildScope::Full, threads)
    }

    /// Rebuild the given offerings and procedures (and everything connected
    /// to them) on top of the current snapshot.
    ///
    /// Before anything has been published this runs as a full rebuild.
    pub fn trigger_partial_rebuild(
        &self,
        offerings: BTreeSet<String>,
        procedures: BTreeSet<String>,
        threads: usize,
    ) -> Vec<CacheUpdateError> {
        self.rebuild(
            RebuildScope::Partial {
                offerings,
                procedures,
            },
            threads,
        )
    }

    fn rebuild(&self, scope: RebuildScope, threads: usize) -> Vec<CacheUpdateError> {
        let _update = self.update_lock.lock();
        let previous = self.snapshot();

        let mut rebuild = CacheRebuild::new(self.store.as_ref(), &self.settings);
        if self.published.load(Ordering::Acquire) {
            rebuild = rebuild.with_previous(&previous);
        }
        let outcome = rebuild.run(&scope, threads);

        let cache = Arc::new(outcome.cache);
        *self.current.write() = Arc::clone(&cache);
        self.published.store(true, Ordering::Release);
        *self.last_report.lock() = Some(outcome.report);

        if let Some(path) = &self.snapshot_file {
            if let Err(e) = save_snapshot(&cache, path) {
                warn!(error = %e, "Failed to persist snapshot");
            }
        }

        outcome.errors
    }
}
