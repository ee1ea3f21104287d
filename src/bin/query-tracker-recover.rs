//! Offline listing of an activity log left behind by a terminated process.
//!
//! ```text
//! query-tracker-recover <path> [--json]
//! ```
//!
//! Prints one line per entry that was in flight, in slot order. Never writes
//! to the file.

use std::path::PathBuf;

use anyhow::{bail, Context};
use query_tracker::core::AppResult;
use query_tracker::infra::activity_log::RecoveryReader;
use query_tracker::util::init_tracing;

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> AppResult<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut path: Option<PathBuf> = None;
    let mut json = false;
    for arg in &args {
        match arg.as_str() {
            "--json" => json = true,
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            flag if flag.starts_with('-') => {
                print_usage();
                bail!("unknown flag: {flag}");
            }
            value if path.is_none() => path = Some(PathBuf::from(value)),
            value => bail!("unexpected argument: {value}"),
        }
    }
    let Some(path) = path else {
        print_usage();
        bail!("missing log path");
    };

    let reader = RecoveryReader::open(&path)
        .with_context(|| format!("opening activity log {}", path.display()))?;
    tracing::debug!(
        capacity = reader.capacity(),
        record_size = reader.record_size(),
        "activity log header ok"
    );

    let mut count = 0usize;
    for entry in reader.entries() {
        if json {
            println!("{}", serde_json::to_string(&entry)?);
        } else {
            println!("{}\t{}\t{}", entry.slot, entry.started_at_ms, entry.description);
        }
        count += 1;
    }
    if count == 0 && !json {
        eprintln!("no unfinished operations in {}", path.display());
    }
    Ok(())
}

fn print_usage() {
    eprintln!("usage: query-tracker-recover <path> [--json]");
}
