//! Period returns over a monthly column.

/// `n`-period percent change: `v[t] / v[t-n] - 1`.
///
/// `None` for the first `n` rows, when either endpoint is missing, or when
/// the base is zero. Gaps are never filled.
pub fn pct_change(values: &[Option<f64>], periods: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|t| {
            if periods == 0 || t < periods {
                return None;
            }
            match (values[t - periods], values[t]) {
                (Some(base), Some(now)) if base != 0.0 => Some(now / base - 1.0),
                _ => None,
            }
        })
        .collect()
}

/// Mean of the present values, `None` if there are none.
pub fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Render a fractional return as a percentage, or `N/A`.
pub fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => "N/A".to_string(),
    }
}
