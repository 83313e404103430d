use clap::Parser;
use eincasm_io::{ChannelStats, Snapshot};

#[derive(Parser, Debug)]
#[command(author, version, about = "Print per-channel statistics of an EINCASM snapshot", long_about = None)]
struct Args {
    /// Snapshot file written by `eincasm --snapshot`
    snapshot: String,

    /// Only report these channels
    #[arg(short, long)]
    channel: Vec<String>,
}

fn format_row(id: &str, stats: &ChannelStats) -> String {
    format!(
        "{:<28} {:>12.4} {:>12.4} {:>12.4} {:>14.4}",
        id, stats.max, stats.min, stats.mean, stats.sum
    )
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let snapshot = Snapshot::load(&args.snapshot)?;
    println!("Snapshot {} ({})", snapshot.run_id, snapshot.simulation);
    println!(
        "Created {} | seed {} | period {} | grid {}x{}",
        snapshot.created_at,
        snapshot.seed,
        snapshot.state.period,
        snapshot.shape.width,
        snapshot.shape.height
    );
    println!();
    println!(
        "{:<28} {:>12} {:>12} {:>12} {:>14}",
        "channel", "max", "min", "mean", "sum"
    );

    let mut shown = 0;
    for (id, stats) in snapshot.channel_stats() {
        if !args.channel.is_empty() && !args.channel.contains(&id) {
            continue;
        }
        println!("{}", format_row(&id, &stats));
        shown += 1;
    }

    anyhow::ensure!(
        args.channel.is_empty() || shown > 0,
        "none of the requested channels exist in {}",
        args.snapshot
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_args_parsing_defaults() {
        let args = Args::parse_from(["inspect", "run.snap.gz"]);
        assert_eq!(args.snapshot, "run.snap.gz");
        assert!(args.channel.is_empty());
    }

    #[test]
    fn test_args_parsing_channel_filter() {
        let args = Args::parse_from(["inspect", "run.snap.gz", "-c", "capital", "-c", "waste"]);
        assert_eq!(args.channel, vec!["capital", "waste"]);
    }

    #[test]
    fn test_missing_snapshot_argument_rejected() {
        assert!(Args::try_parse_from(["inspect"]).is_err());
    }

    #[test]
    fn test_format_row() {
        let row = format_row(
            "capital",
            &ChannelStats {
                min: 0.0,
                max: 10.0,
                mean: 2.5,
                sum: 40.0,
            },
        );
        assert!(row.starts_with("capital"));
        assert!(row.contains("10.0000"));
        assert!(row.trim_end().ends_with("40.0000"));
    }
}
