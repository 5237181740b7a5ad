//! Position selection.

use serde::Serialize;
use std::fmt;

/// What the strategy holds for a month.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Position {
    Asset(String),
    Cash,
}

impl Position {
    pub fn is_cash(&self) -> bool {
        matches!(self, Position::Cash)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Asset(symbol) => f.write_str(symbol),
            Position::Cash => f.write_str("CASH"),
        }
    }
}

/// Pick the position for one month.
///
/// `risk` is in configured order. The highest present momentum wins if it is
/// strictly positive; ties keep the earlier asset. Otherwise the safe asset is
/// held when its 1-month return is strictly positive, else cash. Passing
/// `None` for `safe` means the safe asset is unavailable.
pub fn select_position(risk: &[(&str, Option<f64>)], safe: Option<(&str, Option<f64>)>) -> Position {
    let mut best: Option<(&str, f64)> = None;
    for &(symbol, momentum) in risk {
        let Some(m) = momentum.filter(|m| !m.is_nan()) else {
            continue;
        };
        match best {
            Some((_, top)) if m <= top => {}
            _ => best = Some((symbol, m)),
        }
    }

    if let Some((symbol, m)) = best {
        if m.is_finite() && m > 0.0 {
            return Position::Asset(symbol.to_string());
        }
    }

    match safe {
        Some((symbol, Some(r))) if r.is_finite() && r > 0.0 => Position::Asset(symbol.to_string()),
        _ => Position::Cash,
    }
}
