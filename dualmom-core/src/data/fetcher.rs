//! Multi-strategy fetcher with exponential backoff.
//!
//! Each attempt runs every strategy in order and returns the first non-empty
//! series. An attempt where all strategies come back empty or failed counts
//! as one failure; the fetcher sleeps `base * 2^(attempt-1) + jitter` and
//! tries again, up to `max_retries` attempts in total. Exhaustion yields an
//! empty series: one symbol failing is never fatal to the run.

use super::provider::{DataError, FetchStrategy};
use super::series::PriceSeries;
use super::yahoo::{DirectChart, ExplicitRange, TrailingWindow, YahooClient};
use crate::config::FetchSettings;
use chrono::NaiveDate;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Anything that can produce a series for a symbol without failing.
///
/// The acquisition layer depends on this rather than on `Fetcher` so it can
/// be driven by a stub in tests.
pub trait SeriesFetcher {
    /// Fetch daily history; an empty series means nothing could be obtained.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> PriceSeries;
}

/// Attempt budget and backoff shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: settings.base_sleep(),
            max_jitter: settings.max_jitter(),
        }
    }

    /// No sleeping at all. Used by tests and offline tooling.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn backoff<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let base = self.base_delay.saturating_mul(1u32 << exp);
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(rng.gen_range(0.0..=self.max_jitter.as_secs_f64()))
        };
        base + jitter
    }
}

/// Layered, retrying fetcher.
pub struct Fetcher {
    strategies: Vec<Box<dyn FetchStrategy>>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(strategies: Vec<Box<dyn FetchStrategy>>, policy: RetryPolicy) -> Self {
        Self { strategies, policy }
    }

    /// The standard Yahoo stack: trailing window, explicit range, direct chart.
    pub fn yahoo(settings: &FetchSettings) -> Result<Self, DataError> {
        let client = Arc::new(YahooClient::new(settings)?);
        let strategies: Vec<Box<dyn FetchStrategy>> = vec![
            Box::new(TrailingWindow::new(
                Arc::clone(&client),
                settings.primary_host.clone(),
                settings.trailing_window_days,
            )),
            Box::new(ExplicitRange::new(
                Arc::clone(&client),
                settings.primary_host.clone(),
            )),
            Box::new(DirectChart::new(
                client,
                settings.chart_hosts.clone(),
                settings.trailing_window_days,
            )),
        ];
        Ok(Self::new(strategies, RetryPolicy::from_settings(settings)))
    }

    /// One attempt: every strategy in order, first non-empty result wins.
    fn attempt(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Option<PriceSeries> {
        for strategy in &self.strategies {
            match strategy.fetch(symbol, start, end) {
                Ok(series) if !series.is_empty() => {
                    debug!(
                        symbol,
                        strategy = strategy.name(),
                        rows = series.len(),
                        "strategy succeeded"
                    );
                    return Some(series);
                }
                Ok(_) => debug!(symbol, strategy = strategy.name(), "strategy returned no rows"),
                Err(e) => debug!(symbol, strategy = strategy.name(), error = %e, "strategy failed"),
            }
        }
        None
    }
}

impl SeriesFetcher for Fetcher {
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        let mut rng = rand::thread_rng();

        for attempt in 1..=self.policy.max_retries {
            if let Some(series) = self.attempt(symbol, start, end) {
                info!(symbol, attempt, rows = series.len(), "fetched");
                return series;
            }

            if attempt < self.policy.max_retries {
                let delay = self.policy.backoff(attempt, &mut rng);
                warn!(
                    symbol,
                    attempt,
                    retry_in = ?delay,
                    "download failed, all strategies empty"
                );
                std::thread::sleep(delay);
            } else {
                warn!(symbol, attempt, "download failed, retries exhausted");
            }
        }

        PriceSeries::empty()
    }
}
