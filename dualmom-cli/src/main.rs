//! Dual Momentum CLI: monthly signal run, single-symbol fetch, cache status.
//!
//! Commands:
//! - `run` computes the monthly positions and notifies on a change
//! - `fetch` refreshes the cache for the given symbols from Yahoo Finance
//! - `cache status` reports what is cached per symbol

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dualmom_core::config::AppConfig;
use dualmom_core::data::{Fetcher, PriceCache, SeriesFetcher};
use dualmom_core::notify::messages::position_line;
use dualmom_core::notify::TelegramNotifier;
use dualmom_core::run::{run_strategy, RunOutcome, RunStatus};
use dualmom_core::signal::format_pct;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dualmom",
    about = "Dual momentum monthly rotation: VOO / SCZ / TLT / cash"
)]
struct Cli {
    /// Path to a TOML config file. All keys are optional.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory. Overrides `cache.dir` from the config.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire prices, compute monthly positions, notify on a change.
    Run {
        /// Reference date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Offline mode: use whatever is cached, no network access.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Number of most recent months to print.
        #[arg(long, default_value_t = 10)]
        tail: usize,
    },
    /// Fetch daily history for symbols and merge it into the cache.
    Fetch {
        /// Symbols to fetch (e.g., VOO SCZ TLT).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to `years_back` years ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report date range and row count per cached symbol.
    Status,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.cache_dir {
        config.cache.dir = dir;
    }

    match cli.command {
        Commands::Run {
            as_of,
            offline,
            tail,
        } => run_cmd(&config, as_of.as_deref(), offline, tail),
        Commands::Fetch {
            symbols,
            start,
            end,
        } => fetch_cmd(&config, &symbols, start.as_deref(), end.as_deref()),
        Commands::Cache { action } => match action {
            CacheAction::Status => cache_status_cmd(&config.cache.dir),
        },
    }
}

/// Logs go to stderr so stdout stays a clean report.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn parse_date(value: Option<&str>, flag: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("invalid {flag} date '{s}', expected YYYY-MM-DD"))
        })
        .transpose()
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn run_cmd(config: &AppConfig, as_of: Option<&str>, offline: bool, tail: usize) -> Result<()> {
    let as_of = parse_date(as_of, "--as-of")?.unwrap_or_else(today);

    let cache = PriceCache::new(&config.cache.dir);
    let fetcher = Fetcher::yahoo(&config.fetch)?;
    let notifier = TelegramNotifier::new(config.telegram.clone())?;
    if !notifier.is_configured() {
        info!("BOT_TOKEN / CHAT_ID not set, notifications go to stdout");
    }

    let outcome = run_strategy(config, &cache, &fetcher, &notifier, as_of, offline)?;
    print_outcome(&outcome, tail);

    if outcome.status == RunStatus::NoData {
        std::process::exit(1);
    }
    Ok(())
}

fn print_outcome(outcome: &RunOutcome, tail: usize) {
    println!();
    println!("=== Dual Momentum ===");
    println!("Window:   {} to {}", outcome.start, outcome.end);
    for (symbol, source) in &outcome.sources {
        println!("  {symbol:<6} {source:?}");
    }
    for symbol in &outcome.failed {
        println!("  {symbol:<6} FAILED");
    }
    println!();

    match &outcome.status {
        RunStatus::NoData => println!("No price data available; run skipped."),
        RunStatus::NoCompletedMonths => {
            println!("No completed month in the data yet; nothing to report.")
        }
        RunStatus::Completed { report, change } => {
            println!(
                "{:<12} {:<10} {}",
                "Month End", "Position", "Momentum / Safe 1m"
            );
            println!("{}", "-".repeat(60));
            for row in report.tail(tail) {
                let scores: Vec<String> = row
                    .momentum
                    .iter()
                    .map(|(s, m)| format!("{s} {}", format_pct(*m)))
                    .collect();
                println!(
                    "{:<12} {:<10} {} | {}",
                    row.month_end.to_string(),
                    row.position.to_string(),
                    scores.join("  "),
                    format_pct(row.safe_return)
                );
            }
            println!();
            match (change, report.latest()) {
                (Some(change), _) => {
                    println!("Position changed: {} -> {}", change.previous, change.current)
                }
                (None, Some(latest)) => {
                    println!("Unchanged: {}", position_line(latest.month_end, &latest.position))
                }
                (None, None) => {}
            }
        }
    }
    println!();
}

fn fetch_cmd(
    config: &AppConfig,
    symbols: &[String],
    start: Option<&str>,
    end: Option<&str>,
) -> Result<()> {
    let end = parse_date(end, "--end")?.unwrap_or_else(today);
    let start = match parse_date(start, "--start")? {
        Some(start) => start,
        None => end
            .checked_sub_months(chrono::Months::new(12 * config.strategy.years_back))
            .context("strategy.years_back out of range")?,
    };
    if start > end {
        bail!("--start {start} is after --end {end}");
    }

    let cache = PriceCache::new(&config.cache.dir);
    let fetcher = Fetcher::yahoo(&config.fetch)?;

    let mut failed = Vec::new();
    for symbol in symbols {
        let fetched = fetcher.fetch(symbol, start, end);
        if fetched.is_empty() {
            eprintln!("{symbol}: no data returned");
            failed.push(symbol.as_str());
            continue;
        }
        let merged = cache.load(symbol).merge(&fetched);
        cache.save(symbol, &merged)?;
        println!(
            "{symbol}: fetched {} rows, cache now {} rows ({} to {})",
            fetched.len(),
            merged.len(),
            merged.first_date().map_or("-".into(), |d| d.to_string()),
            merged.last_date().map_or("-".into(), |d| d.to_string()),
        );
    }

    if !failed.is_empty() {
        bail!("fetch failed for: {}", failed.join(", "));
    }
    Ok(())
}

fn cache_status_cmd(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = PriceCache::new(cache_dir);
    let rows = cache.status()?;
    if rows.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", rows.len());
    println!();
    println!("{:<8} {:<25} {:>8}", "Symbol", "Date Range", "Rows");
    println!("{}", "-".repeat(43));
    for row in &rows {
        let range = match (row.first_date, row.last_date) {
            (Some(first), Some(last)) => format!("{first} to {last}"),
            _ => "(empty or corrupt)".to_string(),
        };
        println!("{:<8} {:<25} {:>8}", row.symbol, range, row.rows);
    }

    Ok(())
}
