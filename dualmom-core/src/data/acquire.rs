//! Acquisition orchestrator: cache first, fetch on stale, merge, persist.
//!
//! Per symbol, in caller order:
//! 1. Cache is fresh → use it, no network call
//! 2. Otherwise fetch the full window → merge into cache, save, use merged
//! 3. Fetch came back empty → fall back to the stale cache if there is one
//! 4. Nothing usable → symbol is reported as failed
//!
//! Symbols are spaced out by a short random pause to avoid tripping the
//! provider's rate limiter with back-to-back requests.

use super::align::PriceTable;
use super::cache::{is_fresh, PriceCache};
use super::fetcher::SeriesFetcher;
use super::provider::DataSource;
use super::series::PriceSeries;
use crate::config::AppConfig;
use chrono::NaiveDate;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Options controlling one acquisition pass.
#[derive(Debug, Clone)]
pub struct AcquireOptions {
    /// Start of the wanted window.
    pub start: NaiveDate,
    /// End of the wanted window; also the freshness reference date.
    pub end: NaiveDate,
    pub staleness_tolerance_days: i64,
    /// Pause between consecutive symbols, drawn uniformly from this range.
    pub symbol_delay: (Duration, Duration),
    /// If true, never make network requests.
    pub offline: bool,
}

impl AcquireOptions {
    pub fn from_config(config: &AppConfig, start: NaiveDate, end: NaiveDate, offline: bool) -> Self {
        Self {
            start,
            end,
            staleness_tolerance_days: config.cache.staleness_tolerance_days,
            symbol_delay: config.fetch.symbol_delay(),
            offline,
        }
    }
}

/// Result of acquiring a set of symbols.
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// Closes for every symbol with usable data, in input order.
    pub table: PriceTable,
    /// Symbols with no usable data, in input order.
    pub failed: Vec<String>,
    /// Provenance of each symbol in `table`.
    pub sources: Vec<(String, DataSource)>,
}

impl Acquisition {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Acquire daily closes for `symbols`.
///
/// Never fails: per-symbol problems end up in `failed`.
pub fn acquire(
    cache: &PriceCache,
    fetcher: &dyn SeriesFetcher,
    symbols: &[String],
    opts: &AcquireOptions,
) -> Acquisition {
    let mut usable: Vec<(String, PriceSeries)> = Vec::new();
    let mut sources = Vec::new();
    let mut failed = Vec::new();
    let mut rng = rand::thread_rng();

    for (i, symbol) in symbols.iter().enumerate() {
        if i > 0 {
            pause(opts.symbol_delay, &mut rng);
        }

        match acquire_single(cache, fetcher, symbol, opts) {
            Some((series, source)) => {
                info!(
                    symbol = symbol.as_str(),
                    ?source,
                    rows = series.len(),
                    last = ?series.last_date(),
                    "acquired"
                );
                usable.push((symbol.clone(), series));
                sources.push((symbol.clone(), source));
            }
            None => {
                warn!(symbol = symbol.as_str(), "no usable data");
                failed.push(symbol.clone());
            }
        }
    }

    Acquisition {
        table: PriceTable::align(&usable),
        failed,
        sources,
    }
}

/// Resolve one symbol: cache → fetch + merge → stale cache.
fn acquire_single(
    cache: &PriceCache,
    fetcher: &dyn SeriesFetcher,
    symbol: &str,
    opts: &AcquireOptions,
) -> Option<(PriceSeries, DataSource)> {
    let cached = cache.load(symbol);

    if is_fresh(&cached, opts.end, opts.staleness_tolerance_days) {
        return Some((cached, DataSource::Cache));
    }

    if !opts.offline {
        let fetched = fetcher.fetch(symbol, opts.start, opts.end);
        if !fetched.is_empty() {
            let merged = cached.merge(&fetched);
            if let Err(e) = cache.save(symbol, &merged) {
                warn!(symbol, error = %e, "failed to update cache, continuing with fetched data");
            }
            return Some((merged, DataSource::Network));
        }
    }

    if cached.is_empty() {
        None
    } else {
        warn!(symbol, last = ?cached.last_date(), "using stale cache");
        Some((cached, DataSource::StaleCache))
    }
}

fn pause<R: Rng + ?Sized>((min, max): (Duration, Duration), rng: &mut R) {
    let delay = if max > min {
        Duration::from_secs_f64(rng.gen_range(min.as_secs_f64()..=max.as_secs_f64()))
    } else {
        min
    };
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}
