//! Yahoo Finance chart API strategies.
//!
//! All three strategies talk to the v8 chart endpoint; they differ in how
//! they ask for the window and which hosts they hit:
//! - `TrailingWindow`: `range={N}d` on the primary host
//! - `ExplicitRange`: `period1`/`period2` on the primary host
//! - `DirectChart`: `range={N}d` over the alternate hosts, one after another
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes
//! and inconsistent rate limiting, which is why the fetcher layers these.

use super::provider::{DataError, FetchStrategy};
use super::series::{DailyBar, PriceSeries};
use crate::config::FetchSettings;
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::America::New_York;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Shared HTTP client for the chart endpoint.
pub struct YahooClient {
    client: reqwest::blocking::Client,
}

impl YahooClient {
    pub fn new(settings: &FetchSettings) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| DataError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    /// GET a chart URL and parse it into a series.
    fn get_chart(&self, symbol: &str, url: &str) -> Result<PriceSeries, DataError> {
        debug!(symbol, url, "chart request");

        let resp = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                DataError::NetworkUnreachable(format!("timeout: {e}"))
            } else {
                DataError::NetworkUnreachable(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited);
        }
        let http_error = || DataError::HttpStatus {
            symbol: symbol.to_string(),
            status: status.as_u16(),
        };

        // Unknown symbols come back as 404 with a chart error body.
        if status == reqwest::StatusCode::NOT_FOUND {
            let body = resp.text().unwrap_or_default();
            return match parse_chart(symbol, &body) {
                Err(e @ DataError::SymbolNotFound { .. }) => Err(e),
                _ => Err(http_error()),
            };
        }
        if !status.is_success() {
            return Err(http_error());
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(format!("read body: {e}")))?;
        parse_chart(symbol, &body)
    }
}

/// Chart URL for a trailing window of `days` calendar days.
pub fn range_url(host: &str, symbol: &str, days: u32) -> String {
    format!(
        "{host}/v8/finance/chart/{symbol}\
         ?range={days}d&interval=1d&includeAdjustedClose=true"
    )
}

/// Chart URL for an explicit inclusive date range.
pub fn period_url(host: &str, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
    let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
    let end_ts = end.and_time(NaiveTime::MIN).and_utc().timestamp() + 86_399;
    format!(
        "{host}/v8/finance/chart/{symbol}\
         ?period1={start_ts}&period2={end_ts}&interval=1d\
         &includeAdjustedClose=true"
    )
}

/// Parse a chart API body into a series.
///
/// Timestamps are localized to the exchange timezone before taking the date.
/// Rows where every value is null (holidays, half-written bars) are dropped.
pub fn parse_chart(symbol: &str, body: &str) -> Result<PriceSeries, DataError> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
        DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
    })?;

    let result = match resp.chart.result {
        Some(result) => result,
        None => {
            return Err(match resp.chart.error {
                Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                },
                Some(err) => {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
                None => DataError::ResponseFormatChanged("empty result with no error".into()),
            })
        }
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.with_timezone(&New_York).date_naive())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let bar = DailyBar {
            date,
            open: quote.open.get(i).copied().flatten(),
            high: quote.high.get(i).copied().flatten(),
            low: quote.low.get(i).copied().flatten(),
            close: quote.close.get(i).copied().flatten(),
            adj_close: adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten()),
            volume: quote.volume.get(i).copied().flatten(),
        };

        if !bar.is_empty() {
            bars.push(bar);
        }
    }

    Ok(PriceSeries::new(bars))
}

// ── Strategies ──────────────────────────────────────────────────────

/// Strategy 1: fixed trailing window on the primary host.
pub struct TrailingWindow {
    client: Arc<YahooClient>,
    host: String,
    days: u32,
}

impl TrailingWindow {
    pub fn new(client: Arc<YahooClient>, host: impl Into<String>, days: u32) -> Self {
        Self {
            client,
            host: host.into(),
            days,
        }
    }
}

impl FetchStrategy for TrailingWindow {
    fn name(&self) -> &str {
        "trailing_window"
    }

    fn fetch(&self, symbol: &str, _start: NaiveDate, _end: NaiveDate) -> Result<PriceSeries, DataError> {
        let url = range_url(&self.host, symbol, self.days);
        self.client.get_chart(symbol, &url)
    }
}

/// Strategy 2: explicit `[start, end]` request on the primary host.
pub struct ExplicitRange {
    client: Arc<YahooClient>,
    host: String,
}

impl ExplicitRange {
    pub fn new(client: Arc<YahooClient>, host: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into(),
        }
    }
}

impl FetchStrategy for ExplicitRange {
    fn name(&self) -> &str {
        "explicit_range"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries, DataError> {
        let url = period_url(&self.host, symbol, start, end);
        self.client.get_chart(symbol, &url)
    }
}

/// Strategy 3: raw chart endpoint, trying each alternate host in turn.
pub struct DirectChart {
    client: Arc<YahooClient>,
    hosts: Vec<String>,
    days: u32,
}

impl DirectChart {
    pub fn new(client: Arc<YahooClient>, hosts: Vec<String>, days: u32) -> Self {
        Self { client, hosts, days }
    }
}

impl FetchStrategy for DirectChart {
    fn name(&self) -> &str {
        "direct_chart"
    }

    fn fetch(&self, symbol: &str, _start: NaiveDate, _end: NaiveDate) -> Result<PriceSeries, DataError> {
        let mut last_error = None;

        for host in &self.hosts {
            let url = range_url(host, symbol, self.days);
            match self.client.get_chart(symbol, &url) {
                Ok(series) if !series.is_empty() => return Ok(series),
                Ok(_) => {
                    debug!(symbol, host = host.as_str(), "empty chart, trying next host");
                }
                Err(e) => {
                    debug!(symbol, host = host.as_str(), error = %e, "chart failed, trying next host");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::EmptyResponse {
            symbol: symbol.to_string(),
        }))
    }
}
