//! Offline report tool for profiling snapshots.
//!
//! Usage:
//!   rpcprof --load-snapshot prof.json --list-messages
//!   rpcprof --load-snapshot prof.json --list-all --show-percent
//!
//! Prints one line per stat, sorted by the begin time of its first timer,
//! with per-timer component durations. The first timer of a stat is taken as
//! the overall span; remaining timers are components within it, keyed in the
//! output by the first letter of their tag.

use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use rpcprof::{Snapshot, Stat, Timer};

#[derive(Parser)]
#[command(name = "rpcprof")]
#[command(about = "List and report profiling snapshots offline")]
struct Cli {
    /// Local snapshot file to load for offline processing
    #[arg(long)]
    load_snapshot: PathBuf,

    /// List profiles of all kinds raw
    #[arg(long)]
    list_all: bool,

    /// List per-message profiles raw
    #[arg(long)]
    list_messages: bool,

    /// Show each timer component as a percent of the overall span
    #[arg(long)]
    show_percent: bool,

    /// Delimiter between timer components
    #[arg(long, default_value = "\t")]
    delimiter: String,
}

fn timer_nanos(timer: &Timer) -> i64 {
    timer.duration().as_nanos() as i64
}

fn component_key(timer: &Timer) -> String {
    // "message/encoding" reports as "E": last path segment, first letter.
    timer
        .tag
        .rsplit('/')
        .next()
        .and_then(|segment| segment.chars().next())
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn list_stat(stat: &Stat, show_percent: bool, delimiter: &str) {
    let Some(overall) = stat.timers.first() else {
        println!("{}{delimiter}(no timers)", stat.tag);
        return;
    };
    let overall_nanos = timer_nanos(overall).max(1);
    let begin = overall
        .begin
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    print!("{}{delimiter}", stat.tag);
    print!("@{}.{:09}{delimiter}", begin.as_secs(), begin.subsec_nanos());
    print!("O={overall_nanos}{delimiter}");

    let mut accounted: i64 = 0;
    for timer in &stat.timers[1..] {
        let nanos = timer_nanos(timer);
        accounted += nanos;
        print!("{}={nanos}", component_key(timer));
        if show_percent {
            print!("({}%)", (100 * nanos) / overall_nanos);
        }
        print!("{delimiter}");
    }
    if show_percent {
        let unaccounted = overall_nanos - accounted;
        print!(
            "U={unaccounted}({}%){delimiter}",
            (100 * unaccounted) / overall_nanos
        );
    }
    println!();
}

fn list_all_messages(stats: &mut [Stat], show_percent: bool, delimiter: &str) {
    println!("legend: O=overall, U=unaccounted, then one component per timer (first letter of its tag)");
    stats.sort_by_key(|stat| {
        stat.timers
            .first()
            .map(|timer| timer.begin)
            .unwrap_or(UNIX_EPOCH)
    });
    for stat in stats.iter() {
        list_stat(stat, show_percent, delimiter);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if !cli.list_all && !cli.list_messages {
        bail!("nothing to do: pass --list-messages or --list-all");
    }

    info!("loading {}", cli.load_snapshot.display());
    let mut snapshot = Snapshot::load(&cli.load_snapshot)
        .with_context(|| format!("cannot load {}", cli.load_snapshot.display()))?;
    info!("loaded {} stream stats", snapshot.stream_stats.len());

    list_all_messages(&mut snapshot.stream_stats, cli.show_percent, &cli.delimiter);
    Ok(())
}
