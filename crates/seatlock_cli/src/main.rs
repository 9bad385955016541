//! Seatlock CLI
//!
//! Runs one seat-reservation contention trial: N concurrent actors race to
//! reserve seats from a fixed pool at a chosen transaction isolation level,
//! and the per-actor outcomes plus the aggregate summary are printed.
//!
//! ```text
//! seatlock --isolation "SERIALIZABLE" --actors 10 --seats 1
//! seatlock --isolation "READ COMMITTED" --actors 30 --seats 1,3,5 --format json
//! ```

use clap::Parser;
use seatlock_sim::{ContentionSimulator, RetryPolicy, TrialConfig};
use seatlock_store::{IsolationLevel, MemorySeatStore, SeatId};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Seat-reservation contention trials under configurable isolation.
#[derive(Parser)]
#[command(name = "seatlock")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Transaction isolation level (READ COMMITTED, REPEATABLE READ,
    /// SERIALIZABLE)
    #[arg(short, long, default_value = "READ COMMITTED")]
    isolation: IsolationLevel,

    /// Number of concurrent actors
    #[arg(short, long, default_value_t = 5)]
    actors: u32,

    /// Comma-separated seat ids forming the resource pool
    #[arg(short, long, default_value = "1", value_delimiter = ',')]
    seats: Vec<u32>,

    /// Maximum reservation attempts per actor
    #[arg(long, default_value_t = 5)]
    max_attempts: u32,

    /// Backoff unit in milliseconds; the delay before retry k+1 is k times
    /// this
    #[arg(long, default_value_t = 200)]
    backoff_ms: u64,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pool: Vec<SeatId> = cli.seats.iter().copied().map(SeatId::new).collect();
    let retry = RetryPolicy::new(cli.max_attempts)
        .with_backoff_unit(Duration::from_millis(cli.backoff_ms));
    let config = TrialConfig::new(cli.isolation, cli.actors, pool.clone()).with_retry(retry);

    let store = Arc::new(MemorySeatStore::with_seats(&pool));

    if cli.format != "json" {
        let seats: Vec<String> = cli.seats.iter().map(u32::to_string).collect();
        println!(
            "simulating {} actors contending for seat(s) {} at isolation {}",
            cli.actors,
            seats.join(", "),
            cli.isolation
        );
    }

    let report = ContentionSimulator::run(store, &config)?;

    // Actor failures are trial data, not process errors; the exit code
    // stays zero once the trial completes.
    match cli.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            for outcome in &report.outcomes {
                println!("{outcome}");
            }
            println!("{}", report.summary);
        }
    }

    Ok(())
}
