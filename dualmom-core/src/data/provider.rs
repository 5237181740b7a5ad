//! Fetch strategy trait and structured error types.
//!
//! A `FetchStrategy` is one way of getting a symbol's daily history from the
//! quote provider. The fetcher layers several of them with retry/backoff; the
//! cache layer sits above the fetcher and strategies don't know about it.

use super::series::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
///
/// Network and parse errors never escape the fetcher: it converts them into an
/// empty series after logging. They surface only from cache writes and from
/// individual strategies.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("HTTP {status} for {symbol}")]
    HttpStatus { symbol: String, status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("empty response for {symbol}")]
    EmptyResponse { symbol: String },

    #[error("http client error: {0}")]
    Client(String),

    #[error("cache error: {0}")]
    CacheError(String),
}

/// Where a symbol's data came from in one acquisition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    /// Cache was fresh; no network call was made.
    Cache,
    /// Fetched from the provider and merged into the cache.
    Network,
    /// Fetch failed (or was skipped offline) and an outdated cache was used.
    StaleCache,
}

/// One way of fetching daily bars for a symbol.
///
/// An `Ok` with an empty series and an `Err` are both "this strategy had
/// nothing"; the fetcher moves on to the next strategy either way.
pub trait FetchStrategy: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Fetch daily bars for `symbol`. `start`/`end` bound the wanted window;
    /// trailing-window strategies may ignore them.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<PriceSeries, DataError>;
}
