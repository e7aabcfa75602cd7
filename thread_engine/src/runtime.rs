use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use scene_formats::ScenePack;

use crate::cli::SessionArgs;
use crate::session::{run_session, SessionReport, SessionScript};
use crate::settings::EngineSettings;
use crate::simulation::WorldDescription;

#[derive(Serialize)]
struct EventLog<'a> {
    events: Vec<EventLogEntry<'a>>,
}

#[derive(Serialize)]
struct EventLogEntry<'a> {
    sequence: usize,
    label: &'a str,
}

pub fn execute(args: SessionArgs) -> Result<()> {
    let SessionArgs {
        pack,
        world,
        script,
        settings,
        event_log_json,
        report_json,
        verbose,
        strict,
    } = args;

    let settings = EngineSettings::load(settings.as_deref())?;
    let pack = ScenePack::load_path(&pack)?;
    let world = WorldDescription::load(&world)?;
    let script = SessionScript::load(&script)?;
    if script.commands.is_empty() {
        eprintln!("[thread_engine] warning: session script has no commands");
    }

    let report = run_session(pack, world, &script, &settings);
    print_report(&report, verbose);

    if let Some(path) = event_log_json.as_ref() {
        write_event_log(path, &report)?;
        println!("Event log written to {}", path.display());
    }
    if let Some(path) = report_json.as_ref() {
        write_json(path, &report)?;
        println!("Session report written to {}", path.display());
    }

    let failed = report.failed_steps();
    if strict && failed > 0 {
        bail!("{failed} session step(s) were refused");
    }
    Ok(())
}

fn print_report(report: &SessionReport, verbose: bool) {
    let failed = report.failed_steps();
    println!(
        "Session: {} step(s), {} refused, {} event(s)",
        report.steps.len(),
        failed,
        report.events.len()
    );
    for step in &report.steps {
        if verbose || !step.ok {
            let status = if step.ok { "ok" } else { "refused" };
            println!("  [{:>3}] {:<18} {status}", step.index, step.op);
        }
        if let Some(snapshot) = step.snapshot.as_ref() {
            println!(
                "        {} scene={} stage={} actors={}",
                snapshot.key,
                or_dash(&snapshot.active_scene),
                or_dash(&snapshot.active_stage),
                snapshot.actors.len()
            );
        }
    }
    if verbose {
        println!("Events:");
        for event in &report.events {
            println!("  {event}");
        }
    }
    for (actor, state) in &report.actors {
        println!(
            "  actor {actor} at ({:.1}, {:.1}, {:.1}) yaw {:.3} anim {}",
            state.location.x,
            state.location.y,
            state.location.z,
            state.rotation,
            state.animation.as_deref().unwrap_or("-")
        );
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn write_event_log(path: &Path, report: &SessionReport) -> Result<()> {
    let log = EventLog {
        events: report
            .events
            .iter()
            .enumerate()
            .map(|(sequence, label)| EventLogEntry {
                sequence,
                label: label.as_str(),
            })
            .collect(),
    };
    write_json(path, &log)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(value).context("serializing JSON output")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
