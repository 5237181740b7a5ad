//! CSV price cache, one file per symbol.
//!
//! Layout: `{cache_dir}/{SYMBOL}.csv` with header
//! `Date,Open,High,Low,Close,Adj Close,Volume`.
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Corrupt or unreadable files load as an empty series (cache miss)
//! - Empty series are never written, so good data is never erased
//! - Freshness check against a staleness tolerance

use super::provider::DataError;
use super::series::{DailyBar, PriceSeries};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One CSV row as stored on disk.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Open")]
    open: Option<f64>,
    #[serde(rename = "High")]
    high: Option<f64>,
    #[serde(rename = "Low")]
    low: Option<f64>,
    #[serde(rename = "Close")]
    close: Option<f64>,
    #[serde(rename = "Adj Close")]
    adj_close: Option<f64>,
    #[serde(rename = "Volume")]
    volume: Option<u64>,
}

impl From<&DailyBar> for CacheRow {
    fn from(bar: &DailyBar) -> Self {
        Self {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            adj_close: bar.adj_close,
            volume: bar.volume,
        }
    }
}

impl From<CacheRow> for DailyBar {
    fn from(row: CacheRow) -> Self {
        Self {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            adj_close: row.adj_close,
            volume: row.volume,
        }
    }
}

/// The on-disk price cache.
#[derive(Debug, Clone)]
pub struct PriceCache {
    cache_dir: PathBuf,
}

impl PriceCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Path to the CSV file for a symbol: `{cache_dir}/{SYMBOL}.csv`
    pub fn symbol_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("{symbol}.csv"))
    }

    /// Load the cached series for a symbol.
    ///
    /// Missing and unreadable files both yield an empty series.
    pub fn load(&self, symbol: &str) -> PriceSeries {
        let path = self.symbol_path(symbol);
        if !path.exists() {
            debug!(symbol, "no cache file");
            return PriceSeries::empty();
        }

        match read_rows(&path) {
            Ok(bars) => PriceSeries::new(bars),
            Err(e) => {
                warn!(
                    symbol,
                    path = %path.display(),
                    error = %e,
                    "ignoring unreadable cache file"
                );
                PriceSeries::empty()
            }
        }
    }

    /// Persist a series for a symbol, sorted ascending by date.
    ///
    /// An empty series is a no-op. Writes are atomic: write to .tmp then rename.
    pub fn save(&self, symbol: &str, series: &PriceSeries) -> Result<(), DataError> {
        if series.is_empty() {
            debug!(symbol, "skipping save of empty series");
            return Ok(());
        }

        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let path = self.symbol_path(symbol);
        let tmp_path = path.with_extension("csv.tmp");

        write_rows(&tmp_path, series)?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        debug!(symbol, rows = series.len(), "cache saved");
        Ok(())
    }

    /// Summary of every cached symbol, sorted by symbol.
    pub fn status(&self) -> Result<Vec<CacheStatus>, DataError> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;

        let mut statuses = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(symbol) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let series = self.load(symbol);
            statuses.push(CacheStatus {
                symbol: symbol.to_string(),
                first_date: series.first_date(),
                last_date: series.last_date(),
                rows: series.len(),
            });
        }

        statuses.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(statuses)
    }
}

/// True iff the series' latest date is within `tolerance_days` of `as_of`.
///
/// An empty series is never fresh.
pub fn is_fresh(series: &PriceSeries, as_of: NaiveDate, tolerance_days: i64) -> bool {
    match series.last_date() {
        Some(last) => last >= as_of - Duration::days(tolerance_days),
        None => false,
    }
}

/// Cache status for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub rows: usize,
}

// ── CSV I/O helpers ─────────────────────────────────────────────────

fn read_rows(path: &Path) -> Result<Vec<DailyBar>, DataError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DataError::CacheError(format!("open: {e}")))?;

    let mut bars = Vec::new();
    for row in reader.deserialize::<CacheRow>() {
        let row = row.map_err(|e| DataError::CacheError(format!("parse: {e}")))?;
        let bar = DailyBar::from(row);
        if !bar.is_empty() {
            bars.push(bar);
        }
    }
    Ok(bars)
}

fn write_rows(path: &Path, series: &PriceSeries) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| DataError::CacheError(format!("create file: {e}")))?;

    for bar in series.bars() {
        writer
            .serialize(CacheRow::from(bar))
            .map_err(|e| DataError::CacheError(format!("write row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| DataError::CacheError(format!("flush: {e}")))?;
    Ok(())
}
