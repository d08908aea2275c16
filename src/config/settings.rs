use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::env::{self, EnvKey};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("NOTIFY_WEBHOOK_URL is not a valid URL: {0}")]
    InvalidNotifyUrl(#[from] url::ParseError),
    #[error("NOTIFY_QUEUE_CAPACITY must be greater than zero")]
    ZeroQueueCapacity,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    /// `None` runs the service against the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub webhook_shared_secret: Option<String>,
    pub webhook_signing_secret: Option<String>,
    pub notify_webhook_url: Option<Url>,
    pub notify_timeout_ms: u64,
    pub notify_queue_capacity: usize,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let notify_webhook_url = env::get_opt(EnvKey::NotifyWebhookUrl)
            .map(|raw| Url::parse(&raw))
            .transpose()?;

        let notify_queue_capacity = env::get_parsed(EnvKey::NotifyQueueCapacity, 256usize);
        if notify_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            database_url: env::get_opt(EnvKey::DatabaseUrl),
            db_max_connections: env::get_parsed(EnvKey::DbMaxConnections, 20),
            webhook_shared_secret: env::get_opt(EnvKey::WebhookSharedSecret),
            webhook_signing_secret: env::get_opt(EnvKey::WebhookSigningSecret),
            notify_webhook_url,
            notify_timeout_ms: env::get_parsed(EnvKey::NotifyTimeoutMs, 3000),
            notify_queue_capacity,
        })
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }
}
