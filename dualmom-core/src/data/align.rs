//! Multi-symbol time alignment.
//!
//! Given closes for multiple symbols, align them to a common timeline (the
//! union of all dates). Missing cells stay `None`: no forward-fill, no zero.

use super::series::PriceSeries;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// One symbol's values aligned to the table's dates.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub symbol: String,
    pub values: Vec<Option<f64>>,
}

/// Date-aligned closing prices, columns in caller order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl PriceTable {
    /// Build a table from parts. Every column must be as long as `dates`
    /// and `dates` must be strictly increasing.
    pub fn from_columns(dates: Vec<NaiveDate>, columns: Vec<Column>) -> Self {
        debug_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(columns.iter().all(|c| c.values.len() == dates.len()));
        Self { dates, columns }
    }

    /// Outer-join closes on date, keeping the input order of symbols.
    pub fn align(series: &[(String, PriceSeries)]) -> Self {
        let mut all_dates = BTreeSet::new();
        for (_, s) in series {
            for (date, _) in s.closes() {
                all_dates.insert(date);
            }
        }
        let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

        let columns = series
            .iter()
            .map(|(symbol, s)| {
                let by_date: HashMap<NaiveDate, f64> = s.closes().collect();
                Column {
                    symbol: symbol.clone(),
                    values: dates.iter().map(|d| by_date.get(d).copied()).collect(),
                }
            })
            .collect();

        Self { dates, columns }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.symbol.as_str()).collect()
    }

    pub fn column(&self, symbol: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.symbol == symbol)
            .map(|c| c.values.as_slice())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// No rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.columns.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}
