//! Outbound notifications.
//!
//! Delivery is best effort: a notifier reports what happened but never fails
//! the caller.

pub mod messages;
pub mod telegram;

pub use telegram::TelegramNotifier;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http client error: {0}")]
    Client(String),
}

/// Outcome of a delivery the remote end answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryStatus {
    pub status: u16,
    pub body: serde_json::Value,
}

impl DeliveryStatus {
    /// HTTP success and, when present, the API's own `ok` flag.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
            && self.body.get("ok").and_then(|v| v.as_bool()).unwrap_or(true)
    }
}

/// Something that can deliver a text message.
pub trait Notify {
    /// `None` when nothing was delivered (unconfigured or transport failure).
    fn notify(&self, message: &str) -> Option<DeliveryStatus>;
}
