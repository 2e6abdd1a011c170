//! Integration tests for snapshot publication and persistence.
//!
//! These tests verify:
//! - Readers always observe a complete snapshot while rebuilds run
//! - Snapshots persisted by one controller warm-start another
//! - Configuration files drive the engine settings

use std::collections::BTreeSet;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{TimeZone, Utc};
use sensorcache::cache::CacheController;
use sensorcache::config::ConfigFile;
use sensorcache::model::{Locale, ObservationType, OfferingRecord, ProcedureRecord};
use sensorcache::store::{Dataset, MemoryStore};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn dataset(offerings: usize) -> Dataset {
    let mut dataset = Dataset::new().with_procedure(ProcedureRecord::new("P1"));
    for i in 0..offerings {
        let id = format!("O{}", i);
        dataset = dataset.with_offering(OfferingRecord::new(&id)).observe(
            "P1",
            "temp",
            &id,
            "F1",
            ObservationType::Numeric,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
    }
    dataset
}

// =============================================================================
// Snapshot isolation
// =============================================================================

#[test]
fn test_readers_never_see_partial_snapshot() {
    let store = Arc::new(MemoryStore::new(dataset(5)));
    let controller = Arc::new(CacheController::new(store.clone(), Default::default()));
    controller.trigger_full_rebuild(2);

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let controller = Arc::clone(&controller);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut reads = 0usize;
            while !done.load(Ordering::SeqCst) {
                let cache = controller.snapshot();
                let count = cache.counts().offerings;
                assert!(count == 5 || count == 20, "saw {} offerings", count);
                for offering in cache.offerings() {
                    assert_eq!(cache.procedures_for_offering(&offering.id).len(), 1);
                }
                reads += 1;
            }
            reads
        })
    };

    store.update_dataset(|d| *d = dataset(20));
    for _ in 0..5 {
        controller.trigger_full_rebuild(4);
    }
    done.store(true, Ordering::SeqCst);

    assert!(reader.join().unwrap() > 0);
    assert_eq!(controller.snapshot().counts().offerings, 20);
}

#[test]
fn test_held_snapshot_survives_publication() {
    let store = Arc::new(MemoryStore::new(dataset(2)));
    let controller = CacheController::new(store.clone(), Default::default());
    controller.trigger_full_rebuild(1);

    let held = controller.snapshot();
    store.update_dataset(|d| *d = dataset(0));
    controller.trigger_full_rebuild(1);

    assert_eq!(held.counts().offerings, 2);
    assert_eq!(controller.snapshot().counts().offerings, 0);
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_warm_start_from_persisted_snapshot() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snapshot.json");

    let first = CacheController::new(Arc::new(MemoryStore::new(dataset(3))), Default::default())
        .with_snapshot_file(path.clone());
    first.trigger_full_rebuild(2);
    assert!(path.exists());

    // A second controller over an unreachable store still serves the snapshot.
    let second = CacheController::new(Arc::new(MemoryStore::new(Dataset::new())), Default::default())
        .with_snapshot_file(path);
    assert!(second.warm_start().unwrap());
    assert_eq!(*second.snapshot(), *first.snapshot());
}

#[test]
fn test_corrupt_snapshot_is_an_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snapshot.json");
    fs::write(&path, "{ not json").unwrap();

    let controller = CacheController::new(Arc::new(MemoryStore::new(Dataset::new())), Default::default())
        .with_snapshot_file(path);

    assert!(controller.warm_start().is_err());
    assert!(controller.snapshot().is_empty());
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_file_drives_rebuild_settings() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.ini");
    fs::write(
        &path,
        "[cache]\nthreads = 3\nextra_srids = EPSG:3857, 31467\ndefault_language = de_at\n",
    )
    .unwrap();

    let config = ConfigFile::load_from(&path).unwrap();
    let settings = config.cache_settings();
    assert_eq!(settings.threads, 3);

    let controller = CacheController::new(Arc::new(MemoryStore::new(dataset(1))), settings);
    controller.trigger_full_rebuild(controller.settings().threads);

    let cache = controller.snapshot();
    assert!(cache.supported_spatial_reference_codes().is_superset(&BTreeSet::from([3857, 31467])));
    assert!(cache.supported_languages().contains(&Locale::new("de-AT")));
    assert_eq!(controller.last_report().unwrap().threads, 3);
}
