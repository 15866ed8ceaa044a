//! Outbound SMS through the Twilio REST API.

use tracing::{info, warn};

use crate::bot::fanout::Outbox;
use crate::bot::member::Phone;

pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Twilio credentials and sender number.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base: String,
    /// Log messages instead of sending them.
    pub dry_run: bool,
}

pub struct SmsClient {
    config: SmsConfig,
    http: reqwest::Client,
}

impl SmsClient {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.config.dry_run
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    /// Send one message.
    pub async fn send(&self, to: &Phone, body: &str) -> Result<(), SendError> {
        info!("==> {} :: {}", to, body);
        if self.config.dry_run {
            return Ok(());
        }

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to.as_str()),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| SendError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Api(format!("{status}: {body}")));
        }
        Ok(())
    }

    /// Send everything in the outbox, in order. Failures are logged and skipped.
    pub async fn deliver(&self, outbox: Outbox) -> usize {
        let mut sent = 0;
        for message in outbox {
            match self.send(&message.to, &message.text).await {
                Ok(()) => sent += 1,
                Err(e) => warn!("Failed to send to {}: {e}", message.to),
            }
        }
        sent
    }
}

#[derive(Debug)]
pub enum SendError {
    Http(String),
    Api(String),
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Http(e) => write!(f, "HTTP error: {e}"),
            SendError::Api(e) => write!(f, "API error: {e}"),
        }
    }
}

impl std::error::Error for SendError {}
