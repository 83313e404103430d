use anyhow::Result;
use clap::Parser;
use eincasm_lib::app::{runner, RunOptions, Runner};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of steps to run (overrides the config)
    #[arg(short, long)]
    steps: Option<u64>,

    /// RNG seed (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Write a snapshot of the substrate here when the run ends
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Also write the snapshot every N steps
    #[arg(long, default_value_t = 0, requires = "snapshot")]
    snapshot_every: u64,

    /// Resume from a previously written snapshot
    #[arg(long)]
    resume: Option<PathBuf>,
}

fn main() -> Result<()> {
    eincasm_core::init_logging();
    let args = Args::parse();

    let config = runner::load_config(&args.config)?;
    let mut runner = Runner::new(
        config,
        RunOptions {
            steps: args.steps,
            seed: args.seed,
            snapshot: args.snapshot,
            snapshot_every: args.snapshot_every,
            resume: args.resume,
        },
    )?;
    let summary = runner.run()?;

    println!(
        "Ran {} steps (period {}): capital {:.3}, waste {:.3}",
        summary.steps, summary.period, summary.capital, summary.waste
    );
    Ok(())
}
