use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use scene_formats::{NodeType, ScenePack};

/// Inspect a scene pack (file or directory) and list its scenes and stage graphs.
#[derive(Parser)]
struct Args {
    /// Path to a scene pack JSON file or a directory of packs
    path: PathBuf,

    /// Also print every stage with its node type and branches
    #[arg(long)]
    stages: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let pack = ScenePack::load_path(&args.path)?;

    println!(
        "{} scenes, {} furniture references, {} expressions, {} voices",
        pack.scenes.len(),
        pack.furniture.len(),
        pack.expressions.len(),
        pack.voices.len()
    );

    for scene in &pack.scenes {
        let furniture: Vec<&str> = scene
            .furniture
            .allowed
            .iter()
            .map(|kind| kind.label())
            .collect();
        println!(
            "{id:<32} {positions} positions  {stages:>3} stages  furniture [{furniture}]{disabled}",
            id = scene.id,
            positions = scene.position_count(),
            stages = scene.stages.len(),
            furniture = furniture.join(", "),
            disabled = if scene.enabled { "" } else { "  (disabled)" }
        );
        if !args.stages {
            continue;
        }
        for stage in &scene.stages {
            let kind = match scene.node_type(&stage.id) {
                NodeType::Root => "root",
                NodeType::Branch => "branch",
                NodeType::Sink => "end",
                NodeType::Default => "-",
                NodeType::None => "?",
            };
            let branches: Vec<&str> = scene
                .branches(&stage.id)
                .iter()
                .map(|id| id.as_str())
                .collect();
            println!(
                "    {id:<24} {kind:<6} -> [{branches}]",
                id = stage.id,
                branches = branches.join(", ")
            );
        }
        let shortest = scene.path_min(&scene.start);
        let longest = scene.path_max(&scene.start);
        println!(
            "    paths: shortest {} stages, longest {} stages",
            shortest.len(),
            longest.len()
        );
    }

    Ok(())
}
