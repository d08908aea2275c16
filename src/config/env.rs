use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    DatabaseUrl,
    DbMaxConnections,
    WebhookSharedSecret,
    WebhookSigningSecret,
    NotifyWebhookUrl,
    NotifyTimeoutMs,
    NotifyQueueCapacity,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::DbMaxConnections => "DB_MAX_CONNECTIONS",
            EnvKey::WebhookSharedSecret => "WEBHOOK_SHARED_SECRET",
            EnvKey::WebhookSigningSecret => "WEBHOOK_SIGNING_SECRET",
            EnvKey::NotifyWebhookUrl => "NOTIFY_WEBHOOK_URL",
            EnvKey::NotifyTimeoutMs => "NOTIFY_TIMEOUT_MS",
            EnvKey::NotifyQueueCapacity => "NOTIFY_QUEUE_CAPACITY",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

/// Unset and blank values both read as `None`.
pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str())
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
