use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use url::Url;

use super::{Notifier, NotifyError};

#[derive(Serialize)]
struct ChatMessage<'a> {
    text: &'a str,
}

/// Posts `{"text": ...}` to an incoming-webhook URL (Slack, Mattermost, ...).
#[derive(Clone)]
pub struct ChatWebhookNotifier {
    client: reqwest::Client,
    url: Url,
}

impl ChatWebhookNotifier {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        info!("✅ Notifications will be posted to {}", url.host_str().unwrap_or("webhook"));
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for ChatWebhookNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&ChatMessage { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "chat-webhook"
    }
}

/// Fallback when no channel is configured: alerts only reach the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        info!(target: "notifications", "{}", text);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
