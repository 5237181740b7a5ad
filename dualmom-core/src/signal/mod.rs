//! Monthly dual momentum signals
//!
//! - `monthly` resamples daily closes to calendar month-ends
//! - `returns` computes period returns
//! - `position` applies the relative/absolute momentum rule
//! - `engine` ties them together into a `SignalReport`

pub mod engine;
pub mod monthly;
pub mod position;
pub mod returns;

pub use engine::{MonthlySignal, PositionChange, SignalEngine, SignalError, SignalReport};
pub use monthly::{clip_to_completed_months, completed_months, month_end, resample_month_end};
pub use position::{select_position, Position};
pub use returns::{format_pct, mean_present, pct_change};
