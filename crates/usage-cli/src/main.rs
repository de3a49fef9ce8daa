//! ReviewDesk CLI
//!
//! Command-line tool for inspecting the TMDB usage log. Reads the same
//! SQLite database as the admin API and never calls TMDB.

use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use reviewdesk_usage_core::{validation, CallKind, ServiceClock};
use reviewdesk_usage_storage::{
    CountFilter, LocalSqliteBackend, SqliteUsageStore, StorageConfig, UsageBackend, UsageStore,
};
use serde_json::{json, Value};
use std::path::PathBuf;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "reviewdesk")]
#[command(version, about = "Inspect ReviewDesk TMDB usage", long_about = None)]
struct Cli {
    /// Path to the usage database (default: $REVIEWDESK_DB_PATH or reviewdesk_usage.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Service timezone in minutes east of UTC (default: $REVIEWDESK_UTC_OFFSET_MINUTES or host offset)
    #[arg(long, allow_negative_numbers = true)]
    utc_offset_minutes: Option<i32>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty usage database
    Init,

    /// Real-usage calls since local midnight
    Today,

    /// Real-usage calls ever recorded
    Total,

    /// Calls per day for a trailing window
    Daily {
        /// Number of days, ending today
        #[arg(long, default_value = "30")]
        days: u32,
    },

    /// Most-viewed movies by detail calls
    Top {
        /// Number of movies
        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// Latest logged calls, including status probes
    Recent {
        /// Number of records
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let db_path = cli.db.unwrap_or_else(|| StorageConfig::from_env().db_path);
    let backend = LocalSqliteBackend::new(&db_path);

    if let Commands::Init = cli.command {
        backend.initialize()?;
        println!("Initialized usage database at {}", db_path.display());
        return Ok(());
    }

    if !backend.exists()? {
        return Err(format!(
            "Usage database not found at {} (run `reviewdesk init` first)",
            db_path.display()
        )
        .into());
    }

    let clock = resolve_clock(cli.utc_offset_minutes)?;
    let store = SqliteUsageStore::new(backend);
    let output = execute(&cli.command, &store, &clock)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text(&cli.command, &output);
    }
    Ok(())
}

fn resolve_clock(flag: Option<i32>) -> CliResult<ServiceClock> {
    let minutes = flag.or_else(|| {
        std::env::var("REVIEWDESK_UTC_OFFSET_MINUTES")
            .ok()
            .and_then(|v| v.trim().parse().ok())
    });

    match minutes {
        Some(m) => ServiceClock::from_offset_minutes(m)
            .ok_or_else(|| format!("UTC offset out of range: {} minutes", m).into()),
        None => Ok(ServiceClock::local()),
    }
}

/// Run a read command and return its result as JSON
fn execute<S: UsageStore>(command: &Commands, store: &S, clock: &ServiceClock) -> CliResult<Value> {
    let value = match command {
        Commands::Init => json!({}),
        Commands::Today => {
            let start = clock.start_of_day(clock.today());
            let count = store.count(&CountFilter::real_usage().since(start))?;
            json!({ "date": clock.today(), "calls": count })
        }
        Commands::Total => {
            let count = store.count(&CountFilter::real_usage())?;
            json!({ "calls": count })
        }
        Commands::Daily { days } => {
            validation::validate_window_days(*days)?;
            let mut buckets = Vec::with_capacity(*days as usize);
            for date in clock.trailing_days(*days) {
                let (start, end) = clock.day_range(date);
                let count = store.count(&CountFilter::real_usage().between(start, end))?;
                buckets.push(json!({ "date": date, "calls": count }));
            }
            Value::Array(buckets)
        }
        Commands::Top { limit } => {
            validation::validate_top_n(*limit)?;
            let subjects = store.top_subjects(CallKind::Detail, *limit)?;
            serde_json::to_value(subjects)?
        }
        Commands::Recent { limit } => {
            let records = store.recent(*limit)?;
            Value::Array(
                records
                    .into_iter()
                    .map(|r| {
                        json!({
                            "kind": r.kind,
                            "subjectId": r.subject_id,
                            "endpoint": r.endpoint_path,
                            "recordedAt": r
                                .recorded_at
                                .with_timezone(&clock.offset())
                                .to_rfc3339_opts(SecondsFormat::Secs, false),
                        })
                    })
                    .collect(),
            )
        }
    };
    Ok(value)
}

fn print_text(command: &Commands, output: &Value) {
    match command {
        Commands::Init => {}
        Commands::Today => println!("{} calls today ({})", output["calls"], as_str(&output["date"])),
        Commands::Total => println!("{} calls", output["calls"]),
        Commands::Daily { .. } => {
            for bucket in rows(output) {
                println!("{}  {:>6}", as_str(&bucket["date"]), bucket["calls"]);
            }
        }
        Commands::Top { .. } => {
            if rows(output).is_empty() {
                println!("No movie detail calls recorded");
            }
            for (rank, subject) in rows(output).iter().enumerate() {
                println!(
                    "{:>2}. movie {:<10} {:>6} calls",
                    rank + 1,
                    subject["subjectId"],
                    subject["callCount"]
                );
            }
        }
        Commands::Recent { .. } => {
            for record in rows(output) {
                println!(
                    "{}  {:<13} {:>8}  {}",
                    as_str(&record["recordedAt"]),
                    as_str(&record["kind"]),
                    record["subjectId"],
                    as_str(&record["endpoint"])
                );
            }
        }
    }
}

fn rows(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn as_str(value: &Value) -> &str {
    value.as_str().unwrap_or_default()
}
