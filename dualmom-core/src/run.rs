//! One end-to-end strategy run.
//!
//! acquire → evaluate → notify. Data problems degrade the run (partial data,
//! graceful skip) instead of failing it; only an invalid configuration is an
//! error.

use crate::config::{AppConfig, ConfigError};
use crate::data::{acquire, AcquireOptions, DataSource, PriceCache, SeriesFetcher};
use crate::notify::{messages, Notify};
use crate::signal::{PositionChange, SignalEngine, SignalError, SignalReport};
use chrono::{Months, NaiveDate};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// How far a run got.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// No symbol had usable data; nothing was computed.
    NoData,
    /// Data exists but no calendar month is complete yet.
    NoCompletedMonths,
    Completed {
        report: SignalReport,
        change: Option<PositionChange>,
    },
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub failed: Vec<String>,
    pub sources: Vec<(String, DataSource)>,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn report(&self) -> Option<&SignalReport> {
        match &self.status {
            RunStatus::Completed { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Run the strategy as of `today`.
pub fn run_strategy(
    config: &AppConfig,
    cache: &PriceCache,
    fetcher: &dyn SeriesFetcher,
    notifier: &dyn Notify,
    today: NaiveDate,
    offline: bool,
) -> Result<RunOutcome, RunError> {
    config.validate()?;

    let end = today;
    let start = today
        .checked_sub_months(Months::new(12 * config.strategy.years_back))
        .ok_or_else(|| ConfigError::Invalid("strategy.years_back out of range".into()))?;

    info!(%start, %end, symbols = ?config.strategy.symbols, offline, "run started");

    let opts = AcquireOptions::from_config(config, start, end, offline);
    let acquisition = acquire(cache, fetcher, &config.strategy.symbols, &opts);

    if !acquisition.failed.is_empty() {
        warn!(failed = ?acquisition.failed, "continuing with partial data");
        notifier.notify(&messages::partial_failure(&acquisition.failed));
    }

    let mut outcome = RunOutcome {
        start,
        end,
        failed: acquisition.failed.clone(),
        sources: acquisition.sources.clone(),
        status: RunStatus::NoData,
    };

    if acquisition.table.is_empty() {
        error!("no price data for any symbol, skipping run");
        notifier.notify(&messages::total_failure());
        return Ok(outcome);
    }

    let engine = SignalEngine::new(&config.strategy);
    let report = match engine.evaluate(&acquisition.table) {
        Ok(report) => report,
        Err(SignalError::NoCompletedMonths { last_daily }) => {
            warn!(%last_daily, "no completed month yet, nothing to signal");
            outcome.status = RunStatus::NoCompletedMonths;
            return Ok(outcome);
        }
        Err(e) => return Err(e.into()),
    };

    let change = report.latest_change();
    if let (Some(change), Some(latest)) = (&change, report.latest()) {
        info!(previous = %change.previous, current = %change.current, "position changed");
        notifier.notify(&messages::position_change(change, latest.month_end));
    } else if let Some(latest) = report.latest() {
        info!(month_end = %latest.month_end, position = %latest.position, "position unchanged");
    }

    outcome.status = RunStatus::Completed { report, change };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DailyBar, PriceSeries};
    use crate::notify::DeliveryStatus;
    use crate::signal::Position;
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: RefCell<Vec<String>>,
    }

    impl Notify for RecordingNotifier {
        fn notify(&self, message: &str) -> Option<DeliveryStatus> {
            self.sent.borrow_mut().push(message.to_string());
            None
        }
    }

    #[derive(Default)]
    struct StubFetcher {
        responses: HashMap<String, PriceSeries>,
    }

    impl SeriesFetcher for StubFetcher {
        fn fetch(&self, symbol: &str, _: NaiveDate, _: NaiveDate) -> PriceSeries {
            self.responses.get(symbol).cloned().unwrap_or_default()
        }
    }

    /// Month-end closes, one per (date, close).
    fn series(points: &[(&str, f64)]) -> PriceSeries {
        PriceSeries::new(
            points
                .iter()
                .map(|(date, close)| DailyBar::from_close(d(date), *close))
                .collect(),
        )
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.fetch.symbol_delay_min_secs = 0.0;
        config.fetch.symbol_delay_max_secs = 0.0;
        config
    }

    fn fetcher(entries: Vec<(&str, PriceSeries)>) -> StubFetcher {
        StubFetcher {
            responses: entries
                .into_iter()
                .map(|(s, p)| (s.to_string(), p))
                .collect(),
        }
    }

    #[test]
    fn change_is_notified() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        // VOO leads in February, everything falls in March except TLT
        let fetcher = fetcher(vec![
            ("VOO", series(&[("2024-01-31", 100.0), ("2024-02-29", 105.0), ("2024-03-31", 90.0)])),
            ("SCZ", series(&[("2024-01-31", 100.0), ("2024-02-29", 101.0), ("2024-03-31", 95.0)])),
            ("TLT", series(&[("2024-01-31", 100.0), ("2024-02-29", 99.0), ("2024-03-31", 101.0)])),
        ]);
        let notifier = RecordingNotifier::default();

        let outcome =
            run_strategy(&config(), &cache, &fetcher, &notifier, d("2024-04-01"), false).unwrap();

        let sent = notifier.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Previous: VOO"));
        assert!(sent[0].contains("Current: TLT"));
        match outcome.status {
            RunStatus::Completed { change, .. } => assert_eq!(
                change,
                Some(PositionChange {
                    previous: Position::Asset("VOO".into()),
                    current: Position::Asset("TLT".into()),
                })
            ),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn unchanged_position_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        let fetcher = fetcher(vec![
            ("VOO", series(&[("2024-01-31", 100.0), ("2024-02-29", 105.0), ("2024-03-31", 110.0)])),
            ("SCZ", series(&[("2024-01-31", 100.0), ("2024-02-29", 101.0), ("2024-03-31", 102.0)])),
            ("TLT", series(&[("2024-01-31", 100.0), ("2024-02-29", 99.0), ("2024-03-31", 101.0)])),
        ]);
        let notifier = RecordingNotifier::default();

        let outcome =
            run_strategy(&config(), &cache, &fetcher, &notifier, d("2024-04-01"), false).unwrap();

        assert!(notifier.sent.borrow().is_empty());
        let report = outcome.report().unwrap();
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.latest().unwrap().position, Position::Asset("VOO".into()));
    }

    #[test]
    fn no_data_sends_total_failure_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        let notifier = RecordingNotifier::default();

        let outcome = run_strategy(
            &config(),
            &cache,
            &StubFetcher::default(),
            &notifier,
            d("2024-04-01"),
            false,
        )
        .unwrap();

        assert_eq!(outcome.status, RunStatus::NoData);
        assert_eq!(outcome.failed, vec!["VOO", "SCZ", "TLT"]);
        let sent = notifier.sent.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], messages::partial_failure(&outcome.failed));
        assert_eq!(sent[1], messages::total_failure());
    }

    #[test]
    fn partial_failure_is_reported_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        let fetcher = fetcher(vec![
            ("VOO", series(&[("2024-01-31", 100.0), ("2024-02-29", 105.0)])),
            ("TLT", series(&[("2024-01-31", 100.0), ("2024-02-29", 99.0)])),
        ]);
        let notifier = RecordingNotifier::default();

        let outcome =
            run_strategy(&config(), &cache, &fetcher, &notifier, d("2024-03-01"), false).unwrap();

        assert_eq!(outcome.failed, vec!["SCZ"]);
        let sent = notifier.sent.borrow();
        // partial failure, then CASH -> VOO
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("SCZ"));
        assert!(sent[1].contains("Current: VOO"));
    }

    #[test]
    fn only_current_month_yields_no_completed_months() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        let fetcher = fetcher(vec![
            ("VOO", series(&[("2024-03-04", 100.0), ("2024-03-15", 101.0)])),
            ("SCZ", series(&[("2024-03-04", 100.0), ("2024-03-15", 101.0)])),
            ("TLT", series(&[("2024-03-04", 100.0), ("2024-03-15", 101.0)])),
        ]);
        let notifier = RecordingNotifier::default();

        let outcome =
            run_strategy(&config(), &cache, &fetcher, &notifier, d("2024-03-15"), false).unwrap();

        assert_eq!(outcome.status, RunStatus::NoCompletedMonths);
        assert!(notifier.sent.borrow().is_empty());
    }

    #[test]
    fn invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        let mut config = config();
        config.strategy.horizons.clear();

        let err = run_strategy(
            &config,
            &cache,
            &StubFetcher::default(),
            &RecordingNotifier::default(),
            d("2024-03-15"),
            false,
        )
        .unwrap_err();

        assert!(matches!(err, RunError::Config(ConfigError::Invalid(_))));
    }
}
