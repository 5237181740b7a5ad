//! Dual momentum signal engine.
//!
//! Daily closes go in; one position per completed month comes out. The
//! engine is a pure function of the table and the strategy settings.

use super::monthly::completed_months;
use super::position::{select_position, Position};
use super::returns::{format_pct, mean_present, pct_change};
use crate::config::StrategySettings;
use crate::data::align::PriceTable;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("price table is empty")]
    EmptyTable,

    #[error("no completed month in data ending {last_daily}")]
    NoCompletedMonths { last_daily: NaiveDate },
}

/// Everything computed for one month-end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySignal {
    pub month_end: NaiveDate,
    /// Per risk asset present in the table, in configured order.
    pub momentum: Vec<(String, Option<f64>)>,
    /// Safe asset 1-month return; `None` when missing or the asset is absent.
    pub safe_return: Option<f64>,
    pub position: Position,
}

impl MonthlySignal {
    pub fn momentum_of(&self, symbol: &str) -> Option<f64> {
        self.momentum
            .iter()
            .find(|(s, _)| s == symbol)
            .and_then(|(_, m)| *m)
    }
}

/// A switch between the last two months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionChange {
    pub previous: Position,
    pub current: Position,
}

/// Monthly signal history, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalReport {
    pub rows: Vec<MonthlySignal>,
}

impl SignalReport {
    pub fn latest(&self) -> Option<&MonthlySignal> {
        self.rows.last()
    }

    /// `Some` iff there are at least two rows and the last two positions differ.
    pub fn latest_change(&self) -> Option<PositionChange> {
        match self.rows.as_slice() {
            [.., previous, current] if previous.position != current.position => {
                Some(PositionChange {
                    previous: previous.position.clone(),
                    current: current.position.clone(),
                })
            }
            _ => None,
        }
    }

    /// The last `n` rows (fewer if the history is shorter).
    pub fn tail(&self, n: usize) -> &[MonthlySignal] {
        let start = self.rows.len().saturating_sub(n);
        &self.rows[start..]
    }
}

pub struct SignalEngine {
    risk_assets: Vec<String>,
    safe_asset: String,
    horizons: Vec<usize>,
}

impl SignalEngine {
    pub fn new(settings: &StrategySettings) -> Self {
        Self {
            risk_assets: settings.risk_assets.clone(),
            safe_asset: settings.safe_asset.clone(),
            horizons: settings.horizons.clone(),
        }
    }

    /// Resample daily closes, drop the in-progress month and compute the
    /// position for every remaining month.
    pub fn evaluate(&self, daily: &PriceTable) -> Result<SignalReport, SignalError> {
        let last_daily = match daily.last_date() {
            Some(date) if !daily.is_empty() => date,
            _ => return Err(SignalError::EmptyTable),
        };

        let monthly = completed_months(daily);
        if monthly.dates().is_empty() {
            return Err(SignalError::NoCompletedMonths { last_daily });
        }

        Ok(self.evaluate_monthly(&monthly))
    }

    /// Compute positions on an already-resampled table.
    pub fn evaluate_monthly(&self, monthly: &PriceTable) -> SignalReport {
        // (symbol, momentum per row) for risk assets present in the table
        let momentum: Vec<(&str, Vec<Option<f64>>)> = self
            .risk_assets
            .iter()
            .filter_map(|symbol| {
                let closes = monthly.column(symbol)?;
                Some((symbol.as_str(), self.momentum_series(closes)))
            })
            .collect();

        let safe_returns = monthly.column(&self.safe_asset).map(|c| pct_change(c, 1));

        let rows = monthly
            .dates()
            .iter()
            .enumerate()
            .map(|(t, &month_end)| {
                let scores: Vec<(&str, Option<f64>)> =
                    momentum.iter().map(|(s, m)| (*s, m[t])).collect();
                let safe_return = safe_returns.as_ref().and_then(|r| r[t]);
                let safe = safe_returns
                    .as_ref()
                    .map(|_| (self.safe_asset.as_str(), safe_return));

                let position = select_position(&scores, safe);

                debug!(
                    %month_end,
                    momentum = %describe(&scores),
                    safe = self.safe_asset.as_str(),
                    safe_1m = %format_pct(safe_return),
                    %position,
                    "monthly signal"
                );

                MonthlySignal {
                    month_end,
                    momentum: scores.into_iter().map(|(s, m)| (s.to_string(), m)).collect(),
                    safe_return,
                    position,
                }
            })
            .collect();

        SignalReport { rows }
    }

    /// Mean of the horizon returns present at each row.
    fn momentum_series(&self, closes: &[Option<f64>]) -> Vec<Option<f64>> {
        let per_horizon: Vec<Vec<Option<f64>>> =
            self.horizons.iter().map(|&n| pct_change(closes, n)).collect();

        (0..closes.len())
            .map(|t| {
                let at_t: Vec<Option<f64>> = per_horizon.iter().map(|r| r[t]).collect();
                mean_present(&at_t)
            })
            .collect()
    }
}

fn describe(scores: &[(&str, Option<f64>)]) -> String {
    scores
        .iter()
        .map(|(s, m)| format!("{s}={}", format_pct(*m)))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::align::Column;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn month_ends(n: usize) -> Vec<NaiveDate> {
        let mut out = Vec::new();
        let mut date = d("2023-01-31");
        for _ in 0..n {
            out.push(date);
            date = crate::signal::monthly::month_end(date + chrono::Duration::days(1));
        }
        out
    }

    /// Compounded monthly closes from 100.
    fn compounding(rates: &[f64]) -> Vec<Option<f64>> {
        let mut price = 100.0;
        let mut out = vec![Some(price)];
        for r in rates {
            price *= 1.0 + r;
            out.push(Some(price));
        }
        out
    }

    fn monthly(columns: Vec<(&str, Vec<Option<f64>>)>) -> PriceTable {
        let n = columns[0].1.len();
        PriceTable::from_columns(
            month_ends(n),
            columns
                .into_iter()
                .map(|(symbol, values)| Column {
                    symbol: symbol.into(),
                    values,
                })
                .collect(),
        )
    }

    fn engine() -> SignalEngine {
        SignalEngine::new(&StrategySettings::default())
    }

    #[test]
    fn strongest_uptrend_is_held() {
        let table = monthly(vec![
            ("VOO", compounding(&[0.02; 7])),
            ("SCZ", compounding(&[0.01; 7])),
            ("TLT", compounding(&[0.005; 7])),
        ]);

        let report = engine().evaluate_monthly(&table);

        let last = report.latest().unwrap();
        assert_eq!(last.position, Position::Asset("VOO".into()));
        assert!(last.momentum_of("VOO").unwrap() > last.momentum_of("SCZ").unwrap());
    }

    #[test]
    fn first_row_has_no_returns_and_is_cash() {
        let table = monthly(vec![
            ("VOO", compounding(&[0.02; 3])),
            ("SCZ", compounding(&[0.01; 3])),
            ("TLT", compounding(&[0.01; 3])),
        ]);

        let report = engine().evaluate_monthly(&table);

        assert_eq!(report.rows[0].position, Position::Cash);
        assert_eq!(report.rows[0].momentum_of("VOO"), None);
        assert_eq!(report.rows[0].safe_return, None);
        // one horizon available is enough
        assert!((report.rows[1].momentum_of("VOO").unwrap() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn falling_risk_assets_rotate_to_bonds_then_cash() {
        let table = monthly(vec![
            ("VOO", compounding(&[-0.02, -0.02])),
            ("SCZ", compounding(&[-0.01, -0.01])),
            ("TLT", compounding(&[0.01, -0.01])),
        ]);

        let report = engine().evaluate_monthly(&table);

        assert_eq!(report.rows[1].position, Position::Asset("TLT".into()));
        assert_eq!(report.rows[2].position, Position::Cash);
        assert_eq!(
            report.latest_change(),
            Some(PositionChange {
                previous: Position::Asset("TLT".into()),
                current: Position::Cash,
            })
        );
    }

    #[test]
    fn missing_safe_asset_means_cash() {
        let table = monthly(vec![
            ("VOO", compounding(&[-0.02, -0.02])),
            ("SCZ", compounding(&[-0.01, -0.01])),
        ]);

        let report = engine().evaluate_monthly(&table);

        assert!(report.rows.iter().all(|r| r.position.is_cash()));
        assert_eq!(report.latest_change(), None);
    }

    #[test]
    fn absent_risk_asset_is_skipped() {
        let table = monthly(vec![
            ("SCZ", compounding(&[0.01, 0.01])),
            ("TLT", compounding(&[0.02, 0.02])),
        ]);

        let report = engine().evaluate_monthly(&table);

        assert_eq!(report.latest().unwrap().momentum.len(), 1);
        assert_eq!(report.latest().unwrap().position, Position::Asset("SCZ".into()));
    }

    #[test]
    fn no_change_when_positions_match() {
        let table = monthly(vec![
            ("VOO", compounding(&[0.02, 0.02, 0.02])),
            ("SCZ", compounding(&[0.01, 0.01, 0.01])),
            ("TLT", compounding(&[0.01, 0.01, 0.01])),
        ]);

        let report = engine().evaluate_monthly(&table);

        assert_eq!(report.latest_change(), None);
        assert_eq!(report.tail(2).len(), 2);
        assert_eq!(report.tail(50).len(), 4);
    }

    #[test]
    fn single_row_has_no_change() {
        let report = SignalReport {
            rows: vec![MonthlySignal {
                month_end: d("2024-01-31"),
                momentum: vec![],
                safe_return: None,
                position: Position::Cash,
            }],
        };
        assert_eq!(report.latest_change(), None);
    }

    #[test]
    fn empty_table_is_an_error() {
        let err = engine().evaluate(&PriceTable::default()).unwrap_err();
        assert_eq!(err, SignalError::EmptyTable);
    }

    #[test]
    fn partial_month_only_is_an_error() {
        let table = PriceTable::from_columns(
            vec![d("2024-03-04"), d("2024-03-15")],
            vec![Column {
                symbol: "VOO".into(),
                values: vec![Some(100.0), Some(101.0)],
            }],
        );

        let err = engine().evaluate(&table).unwrap_err();
        assert_eq!(
            err,
            SignalError::NoCompletedMonths {
                last_daily: d("2024-03-15")
            }
        );
    }

    #[test]
    fn evaluate_excludes_in_progress_month() {
        let table = PriceTable::from_columns(
            vec![d("2024-01-31"), d("2024-02-29"), d("2024-03-15")],
            vec![Column {
                symbol: "VOO".into(),
                values: vec![Some(100.0), Some(105.0), Some(50.0)],
            }],
        );

        let report = engine().evaluate(&table).unwrap();

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.latest().unwrap().month_end, d("2024-02-29"));
        assert_eq!(report.latest().unwrap().position, Position::Asset("VOO".into()));
    }
}
