use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Replays a scripted scene-thread session against an in-memory world",
    version
)]
pub struct Args {
    /// Scene pack JSON file, or a directory of pack files to merge
    #[arg(long)]
    pub pack: PathBuf,

    /// World description JSON (owning keys, actors, props)
    #[arg(long)]
    pub world: PathBuf,

    /// Session script JSON listing the binding calls to replay
    #[arg(long)]
    pub script: PathBuf,

    /// Optional engine settings JSON; defaults apply to missing fields
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Path to write the runtime event log as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Path to write the full session report (steps, actors, menu) as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Print every step and event instead of the summary
    #[arg(long)]
    pub verbose: bool,

    /// Exit with an error when any step was refused
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug)]
pub struct SessionArgs {
    pub pack: PathBuf,
    pub world: PathBuf,
    pub script: PathBuf,
    pub settings: Option<PathBuf>,
    pub event_log_json: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
    pub verbose: bool,
    pub strict: bool,
}

impl From<Args> for SessionArgs {
    fn from(args: Args) -> Self {
        let Args {
            pack,
            world,
            script,
            settings,
            event_log_json,
            report_json,
            verbose,
            strict,
        } = args;
        Self {
            pack,
            world,
            script,
            settings,
            event_log_json,
            report_json,
            verbose,
            strict,
        }
    }
}
