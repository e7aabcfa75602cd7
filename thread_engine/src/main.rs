use anyhow::Result;
use clap::Parser;

use thread_engine::cli::Args;
use thread_engine::runtime;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    runtime::execute(args.into())
}
