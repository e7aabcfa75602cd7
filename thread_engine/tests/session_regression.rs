use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;
use tempfile::tempdir;

#[derive(Debug, Deserialize)]
struct SessionReport {
    steps: Vec<Step>,
    events: Vec<String>,
    actors: BTreeMap<String, ActorState>,
    menu: MenuState,
    live_instances: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct Step {
    op: String,
    ok: bool,
    snapshot: Option<Snapshot>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    active_scene: String,
    active_stage: String,
    actors: Vec<u32>,
    positions: Vec<PositionSnapshot>,
    owns_menu: bool,
}

#[derive(Debug, Deserialize)]
struct PositionSnapshot {
    actor: u32,
    unique_permutations: i32,
    current_permutation: i32,
    expression: String,
    ghost: bool,
}

#[derive(Debug, Deserialize)]
struct ActorState {
    location: [f32; 3],
    scale: f32,
    alpha: f32,
    animation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MenuState {
    owner: Option<u32>,
    log: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EventLog {
    events: Vec<EventLogEntry>,
}

#[derive(Debug, Deserialize)]
struct EventLogEntry {
    sequence: usize,
    label: String,
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("non-UTF-8 path {}", path.display()))
}

fn close(actual: [f32; 3], expected: [f32; 3]) -> bool {
    actual
        .iter()
        .zip(expected.iter())
        .all(|(a, b)| (a - b).abs() < 1e-3)
}

#[test]
fn scripted_session_regression() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for session artefacts")?;
    let report_path = temp_dir.path().join("report.json");
    let event_log_path = temp_dir.path().join("logs").join("events.json");
    let pack = fixture("pack.json");
    let world = fixture("world.json");
    let script = fixture("session.json");

    let output = Command::new(env!("CARGO_BIN_EXE_thread_engine"))
        .args([
            "--pack",
            path_arg(&pack)?,
            "--world",
            path_arg(&world)?,
            "--script",
            path_arg(&script)?,
            "--report-json",
            path_arg(&report_path)?,
            "--event-log-json",
            path_arg(&event_log_path)?,
        ])
        .output()
        .context("running thread_engine")?;
    assert!(
        output.status.success(),
        "thread_engine failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: SessionReport = serde_json::from_str(
        &fs::read_to_string(&report_path).context("reading session report")?,
    )
    .context("parsing session report")?;

    let outcomes: Vec<(&str, bool)> = report
        .steps
        .iter()
        .map(|step| (step.op.as_str(), step.ok))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("create", true),
            ("create", false),
            ("set_active_scene", true),
            ("advance_scene", true),
            ("open_menu", true),
            ("advance_scene", true),
            ("set_active_scene", true),
            ("advance_scene", true),
            ("next_permutation", true),
            ("set_expression", true),
            ("ghost", true),
            ("query", true),
            ("create", true),
            ("set_active_scene", true),
            ("advance_scene", true),
            ("reassign_center", false),
            ("invalidate_key", true),
            ("prune", true),
            ("query", false),
            ("close_menu", true),
            ("destroy", true),
        ]
    );

    let snapshot = report.steps[11]
        .snapshot
        .as_ref()
        .context("query step should carry a snapshot")?;
    assert_eq!(snapshot.active_scene, "duo_open");
    assert_eq!(snapshot.active_stage, "o1");
    assert_eq!(snapshot.actors, vec![21, 20]);
    assert!(snapshot.owns_menu);
    for position in &snapshot.positions {
        assert_eq!(position.unique_permutations, 2);
        assert_eq!(position.current_permutation, 2);
    }
    let female = snapshot
        .positions
        .iter()
        .find(|position| position.actor == 20)
        .context("female position")?;
    assert_eq!(female.expression, "happy");
    assert!(!female.ghost);
    assert!(snapshot
        .positions
        .iter()
        .any(|position| position.actor == 21 && position.ghost));
    assert!(report.steps[18].snapshot.is_none());

    let actor = |id: &str| report.actors.get(id).context("actor in report");
    assert!(close(actor("20")?.location, [0.0, 30.0, 0.0]));
    assert!(close(actor("21")?.location, [0.0, -30.0, 0.0]));
    assert!((actor("21")?.alpha - 0.1).abs() < 1e-6);
    assert!(close(actor("22")?.location, [200.0, 40.0, 10.0]));
    assert!(close(actor("23")?.location, [220.0, 40.0, 10.0]));
    assert!((actor("23")?.scale - 1.05).abs() < 1e-6);
    assert_eq!(actor("20")?.animation.as_deref(), Some("open_o1_a2"));

    assert_eq!(report.menu.owner, None);
    assert_eq!(
        report.menu.log.first().map(String::as_str),
        Some("show 00000001")
    );
    assert!(report
        .menu
        .log
        .iter()
        .any(|line| line == "stage duo_standing/s2"));
    assert!(report.live_instances.is_empty());

    let events: EventLog = serde_json::from_str(
        &fs::read_to_string(&event_log_path).context("reading event log")?,
    )
    .context("parsing event log")?;
    assert_eq!(events.events.len(), report.events.len());
    for (index, entry) in events.events.iter().enumerate() {
        assert_eq!(entry.sequence, index);
    }
    let labels: Vec<&str> = events
        .events
        .iter()
        .map(|entry| entry.label.as_str())
        .collect();
    assert_eq!(labels.first(), Some(&"thread.create 00000001 anchor 00000014"));
    for expected in [
        "thread.create 00000001 rejected: exists",
        "thread.00000001.scene duo_open assignments 2",
        "thread.00000001.permutation 00000014 -> 1",
        "thread.create 00000002 anchor 00000064",
        "thread.prune 00000002",
        "thread.destroy 00000001",
    ] {
        assert!(labels.contains(&expected), "missing event {expected}");
    }
    Ok(())
}

#[test]
fn strict_mode_fails_on_refused_steps() -> Result<()> {
    let temp_dir = tempdir()?;
    let script_path = temp_dir.path().join("script.json");
    fs::write(
        &script_path,
        r#"{ "commands": [ { "op": "set_active_scene", "key": 9, "scene": "duo_open" } ] }"#,
    )?;

    let output = Command::new(env!("CARGO_BIN_EXE_thread_engine"))
        .args([
            "--pack",
            path_arg(&fixture("pack.json"))?,
            "--world",
            path_arg(&fixture("world.json"))?,
            "--script",
            path_arg(&script_path)?,
            "--strict",
        ])
        .output()
        .context("running thread_engine")?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("refused"));
    Ok(())
}
