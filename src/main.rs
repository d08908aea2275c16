use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use transcode_listener::app;
use transcode_listener::config::settings::AppConfig;
use transcode_listener::infrastructure::db::pool;
use transcode_listener::infrastructure::notify::{ChatWebhookNotifier, LogNotifier, Notifier};
use transcode_listener::middleware::webhook_auth::{AuthChain, HmacSignature, SharedSecret};
use transcode_listener::modules::transcode::memory::MemoryVideoStore;
use transcode_listener::modules::transcode::notification::NotificationDispatcher;
use transcode_listener::modules::transcode::repository::PgVideoStore;
use transcode_listener::modules::transcode::store::VideoStore;
use transcode_listener::state::AppState;
use transcode_listener::workers::notifier::start_notification_worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting transcode listener...");

    let config = AppConfig::new().context("Invalid configuration")?;

    let store: Arc<dyn VideoStore> = match &config.database_url {
        Some(url) => {
            let db = pool::connect_to_db(url, config.db_max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            pool::run_migrations(&db).await.context("Failed to run migrations")?;
            Arc::new(PgVideoStore::new(db))
        }
        None => {
            warn!("DATABASE_URL not set; using the in-memory store (state is lost on restart)");
            Arc::new(MemoryVideoStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => Arc::new(ChatWebhookNotifier::new(url.clone(), config.notify_timeout())?),
        None => {
            info!("NOTIFY_WEBHOOK_URL not set; notifications go to the log only");
            Arc::new(LogNotifier)
        }
    };

    let mut webhook_auth = AuthChain::default();
    if let Some(secret) = &config.webhook_shared_secret {
        webhook_auth = webhook_auth.with(SharedSecret::new(secret.as_bytes()));
    }
    if let Some(secret) = &config.webhook_signing_secret {
        webhook_auth = webhook_auth.with(HmacSignature::new(secret.as_bytes()));
    }
    if webhook_auth.is_empty() {
        warn!("No webhook secret configured; the listener accepts unauthenticated deliveries");
    }

    let (dispatcher, notifications) = NotificationDispatcher::new(config.notify_queue_capacity);
    let worker = tokio::spawn(start_notification_worker(
        notifications,
        notifier,
        config.notify_timeout(),
    ));

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = AppState::new(store, dispatcher, webhook_auth);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router owned the last dispatcher handles; the worker now drains
    // whatever is queued and exits.
    if let Err(e) = worker.await {
        warn!("Notification worker ended abnormally: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
