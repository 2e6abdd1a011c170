//! End-to-end tests for the `sensorcache` binary.
//!
//! Each test writes a config file and a JSON dataset into a temporary
//! directory and drives the built binary against them.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const DATASET: &str = r#"{
  "srid": 4326,
  "locales": ["en"],
  "offerings": [{ "id": "urn:example:offering:river", "name": "River gauges" }],
  "procedures": [{ "id": "gauge-1" }],
  "observable_properties": [{ "id": "waterlevel" }],
  "features": [
    { "id": "station-1", "geometry": { "Point": { "x": 7.5, "y": 51.9 } } }
  ],
  "observations": [
    {
      "procedure": "gauge-1",
      "observable_property": "waterlevel",
      "offering": "urn:example:offering:river",
      "feature_of_interest": "station-1",
      "observation_type": "numeric",
      "phenomenon_time_start": "2024-04-01T06:00:00Z"
    }
  ]
}"#;

/// Temporary workspace with a config pointing at a dataset.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("dataset.json"), DATASET).unwrap();
        fs::write(
            root.join("config.ini"),
            format!(
                "[cache]\nthreads = 2\nsnapshot_file = {}\n\n[store]\ndataset = {}\n\n\
                 [logging]\ndirectory = {}\n",
                root.join("snapshot.json").display(),
                root.join("dataset.json").display(),
                root.join("logs").display(),
            ),
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_sensorcache"))
            .arg("--config")
            .arg(self.path("config.ini"))
            .args(args)
            .output()
            .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_rebuild_persists_snapshot() {
    let ws = Workspace::new();

    let output = ws.run(&["rebuild", "--strict"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("Rebuild (full)"));

    let snapshot = read_json(&ws.path("snapshot.json"));
    assert!(snapshot["offerings"]["urn:example:offering:river"].is_object());
    assert!(ws.path("logs").join("sensorcache.log").exists());
}

#[test]
fn test_inspect_offering_after_rebuild() {
    let ws = Workspace::new();
    assert!(ws.run(&["rebuild"]).status.success());

    let output = ws.run(&["inspect", "--offering", "urn:example:offering:river"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("River gauges"));
    assert!(text.contains("gauge-1"));
    assert!(text.contains("station-1"));

    let output = ws.run(&["inspect", "--procedure", "gauge-1", "--json"]);
    assert!(output.status.success());
    let entry: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(entry["id"], "gauge-1");
}

#[test]
fn test_inspect_without_snapshot_fails() {
    let ws = Workspace::new();
    let output = ws.run(&["inspect"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No snapshot available"));
}

#[test]
fn test_missing_dataset_fails() {
    let ws = Workspace::new();
    fs::remove_file(ws.path("dataset.json")).unwrap();

    let output = ws.run(&["rebuild"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_config_path_and_show() {
    let ws = Workspace::new();

    let output = ws.run(&["config", "path"]);
    assert!(stdout(&output).contains("config.ini"));

    let output = ws.run(&["config", "show"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("cache.threads = 2"));
}

#[test]
fn test_partial_rebuild_without_snapshot_runs_full() {
    let ws = Workspace::new();

    let output = ws.run(&["rebuild", "--offering", "urn:example:offering:river"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("No persisted snapshot, rebuilding everything"));
    assert!(text.contains("Rebuild (full)"));

    let output = ws.run(&["rebuild", "--offering", "urn:example:offering:river"]);
    assert!(stdout(&output).contains("Rebuild (partial)"));
}

#[test]
fn test_config_init_keeps_existing_file() {
    let ws = Workspace::new();
    let fresh = ws.path("fresh").join("config.ini");
    let init = |force: bool| {
        let mut command = Command::new(env!("CARGO_BIN_EXE_sensorcache"));
        command.arg("--config").arg(&fresh).args(["config", "init"]);
        if force {
            command.arg("--force");
        }
        command.output().unwrap()
    };

    assert!(init(false).status.success());
    assert!(fresh.exists());

    fs::write(&fresh, "[cache]\nthreads = 7\n").unwrap();
    assert!(!init(false).status.success());
    assert!(fs::read_to_string(&fresh).unwrap().contains("threads = 7"));

    assert!(init(true).status.success());
    assert!(!fs::read_to_string(&fresh).unwrap().contains("threads = 7"));
}
