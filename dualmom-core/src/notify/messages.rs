//! Notification texts.

use crate::signal::{Position, PositionChange};
use chrono::NaiveDate;

/// Sent when the last completed month switched position.
pub fn position_change(change: &PositionChange, month_end: NaiveDate) -> String {
    format!(
        "🔔 Dual momentum update ({month_end})\n\nPrevious: {}\nCurrent: {}",
        change.previous, change.current
    )
}

/// Sent when some symbols could not be acquired and the run continues without them.
pub fn partial_failure(failed: &[String]) -> String {
    format!(
        "⚠️ Price download partially failed (continuing without):\n{}",
        failed.join(", ")
    )
}

/// Sent when no symbol could be acquired and the run is skipped.
pub fn total_failure() -> String {
    "❌ Dual momentum: all price downloads failed today (rate limit or network issue), run skipped."
        .to_string()
}

/// One-line summary of a position, used by the CLI listing.
pub fn position_line(month_end: NaiveDate, position: &Position) -> String {
    format!("{month_end}  {position}")
}
