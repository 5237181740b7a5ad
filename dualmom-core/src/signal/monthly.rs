//! Month-end resampling and completed-month clipping.
//!
//! Monthly rows are labelled with the calendar month-end date. Each cell is
//! the last close present for that symbol within the month, so a symbol that
//! stopped trading a few days early still gets its final print.

use crate::data::align::{Column, PriceTable};
use chrono::{Datelike, Duration, NaiveDate};

/// Last calendar day of `date`'s month.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Last calendar day of the month before `date`'s month.
pub fn previous_month_end(date: NaiveDate) -> NaiveDate {
    date.with_day(1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(NaiveDate::MIN)
}

/// Resample a daily table to one row per calendar month.
///
/// Every month between the first and the last daily date gets a row, even
/// when it has no data at all (all cells `None`).
pub fn resample_month_end(daily: &PriceTable) -> PriceTable {
    let dates = daily.dates();
    let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
        return empty_like(daily);
    };

    let n_cols = daily.columns().len();
    let mut month_ends = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); n_cols];

    let final_month_end = month_end(last);
    let mut current = month_end(first);
    let mut row = 0;

    loop {
        let mut last_seen: Vec<Option<f64>> = vec![None; n_cols];
        while row < dates.len() && dates[row] <= current {
            for (c, column) in daily.columns().iter().enumerate() {
                if let Some(v) = column.values[row] {
                    last_seen[c] = Some(v);
                }
            }
            row += 1;
        }

        month_ends.push(current);
        for (c, v) in last_seen.into_iter().enumerate() {
            values[c].push(v);
        }

        if current >= final_month_end {
            break;
        }
        current = month_end(current + Duration::days(1));
    }

    let columns = daily
        .columns()
        .iter()
        .zip(values)
        .map(|(column, values)| Column {
            symbol: column.symbol.clone(),
            values,
        })
        .collect();

    PriceTable::from_columns(month_ends, columns)
}

/// Drop the in-progress month.
///
/// A month counts as completed only when `last_daily` falls on or after its
/// last calendar day. Rows after the cutoff are removed.
pub fn clip_to_completed_months(monthly: &PriceTable, last_daily: NaiveDate) -> PriceTable {
    let current = month_end(last_daily);
    let cutoff = if last_daily < current {
        previous_month_end(last_daily)
    } else {
        current
    };

    let keep = monthly.dates().partition_point(|d| *d <= cutoff);
    let columns = monthly
        .columns()
        .iter()
        .map(|column| Column {
            symbol: column.symbol.clone(),
            values: column.values[..keep].to_vec(),
        })
        .collect();

    PriceTable::from_columns(monthly.dates()[..keep].to_vec(), columns)
}

/// Resample and clip in one step.
pub fn completed_months(daily: &PriceTable) -> PriceTable {
    match daily.last_date() {
        Some(last) => clip_to_completed_months(&resample_month_end(daily), last),
        None => empty_like(daily),
    }
}

fn empty_like(table: &PriceTable) -> PriceTable {
    let columns = table
        .columns()
        .iter()
        .map(|column| Column {
            symbol: column.symbol.clone(),
            values: Vec::new(),
        })
        .collect();
    PriceTable::from_columns(Vec::new(), columns)
}
