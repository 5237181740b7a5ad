//! Daily bars and the per-symbol price series.
//!
//! `PriceSeries` keeps its bars sorted by date with no duplicates. Every
//! constructor enforces that, so code downstream (cache, alignment, monthly
//! resampling) can rely on it without re-checking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One trading day for one symbol.
///
/// Upstream arrays contain nulls, so every field except the date is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<u64>,
}

impl DailyBar {
    /// Bar with only a close price. Handy for tests and synthetic tables.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close: Some(close),
            adj_close: None,
            volume: None,
        }
    }

    /// True when every value field is missing.
    pub fn is_empty(&self) -> bool {
        self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.close.is_none()
            && self.adj_close.is_none()
            && self.volume.is_none()
    }
}

/// Date-ordered, date-unique daily history for one symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    bars: Vec<DailyBar>,
}

impl PriceSeries {
    /// Empty series, the "nothing available" sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a series from bars in any order.
    ///
    /// Bars are sorted by date; when a date repeats, the bar appearing later
    /// in the input wins.
    pub fn new(bars: Vec<DailyBar>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, DailyBar> = BTreeMap::new();
        for bar in bars {
            by_date.insert(bar.date, bar);
        }
        Self {
            bars: by_date.into_values().collect(),
        }
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Union of `self` and `newer` by date, re-sorted.
    ///
    /// Where both contain a date, the bar from `newer` replaces the old one
    /// (providers revise recent bars, e.g. after the close settles).
    pub fn merge(&self, newer: &PriceSeries) -> PriceSeries {
        let mut all = Vec::with_capacity(self.len() + newer.len());
        all.extend(self.bars.iter().cloned());
        all.extend(newer.bars.iter().cloned());
        PriceSeries::new(all)
    }

    /// `(date, close)` pairs, skipping bars without a close.
    pub fn closes(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.bars
            .iter()
            .filter_map(|b| b.close.map(|c| (b.date, c)))
    }
}
