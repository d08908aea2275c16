use async_trait::async_trait;
use thiserror::Error;

pub mod chat;

pub use chat::{ChatWebhookNotifier, LogNotifier};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("notification channel rejected message with status {0}")]
    Rejected(u16),
}

/// A side channel that accepts human-readable alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;

    fn name(&self) -> &'static str;
}
