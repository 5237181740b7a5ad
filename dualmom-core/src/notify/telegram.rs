//! Telegram Bot API delivery.

use super::{DeliveryStatus, Notify, NotifyError};
use crate::config::TelegramSettings;
use std::time::Duration;
use tracing::{debug, warn};

pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    settings: TelegramSettings,
}

impl TelegramNotifier {
    pub fn new(settings: TelegramSettings) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self { client, settings })
    }

    /// Whether messages will actually be sent.
    pub fn is_configured(&self) -> bool {
        self.settings.credentials().is_some()
    }

    fn send_url(&self, token: &str) -> String {
        format!(
            "{}/bot{token}/sendMessage",
            self.settings.api_base.trim_end_matches('/')
        )
    }
}

impl Notify for TelegramNotifier {
    fn notify(&self, message: &str) -> Option<DeliveryStatus> {
        let Some((token, chat_id)) = self.settings.credentials() else {
            warn!("telegram not configured, printing message instead");
            println!("{message}");
            return None;
        };

        let resp = match self
            .client
            .post(self.send_url(token))
            .form(&[("chat_id", chat_id), ("text", message)])
            .send()
        {
            Ok(resp) => resp,
            Err(e) => {
                // reqwest errors carry the URL, which contains the token
                warn!(error = %e.without_url(), "telegram delivery failed");
                return None;
            }
        };

        let status = resp.status().as_u16();
        match resp.json::<serde_json::Value>() {
            Ok(body) => {
                let delivery = DeliveryStatus { status, body };
                if delivery.ok() {
                    debug!(status, "telegram message delivered");
                } else {
                    warn!(status, body = %delivery.body, "telegram rejected message");
                }
                Some(delivery)
            }
            Err(e) => {
                warn!(status, error = %e.without_url(), "telegram response unreadable");
                None
            }
        }
    }
}
