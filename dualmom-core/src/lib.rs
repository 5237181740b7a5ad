//! Dual Momentum Core: price acquisition, caching, monthly signals, notifications.
//!
//! This crate contains everything except the command line:
//! - Configuration (TOML file + environment credentials)
//! - Layered Yahoo chart fetcher with retry/backoff
//! - Per-symbol CSV cache with freshness checks and merge-on-refresh
//! - Date alignment across symbols
//! - Month-end resampling and the dual momentum position rule
//! - Telegram notifications
//! - The end-to-end run that ties them together

pub mod config;
pub mod data;
pub mod notify;
pub mod run;
pub mod signal;

#[cfg(test)]
mod test_server;

pub use config::AppConfig;
pub use run::{run_strategy, RunError, RunOutcome, RunStatus};
