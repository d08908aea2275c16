use std::sync::Arc;
use std::time::Duration;

use async_channel::Receiver;
use tracing::{error, info, warn};

use crate::infrastructure::notify::Notifier;
use crate::modules::transcode::notification::Notification;

/// Delivers queued notifications until every dispatcher handle is dropped.
///
/// Each send is abandoned after `timeout`; failures are logged and never
/// reach the request that produced the notification.
pub async fn start_notification_worker(
    rx: Receiver<Notification>,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
) {
    info!("📣 Notification worker started ({})", notifier.name());

    while let Ok(notification) = rx.recv().await {
        match tokio::time::timeout(timeout, notifier.send(&notification.text)).await {
            Ok(Ok(())) => info!("Notification sent for job {}", notification.job_id),
            Ok(Err(e)) => error!(
                "❌ Failed to send notification for job {}: {}",
                notification.job_id, e
            ),
            Err(_) => warn!(
                "Notification for job {} abandoned after {:?}",
                notification.job_id, timeout
            ),
        }
    }

    info!("📣 Notification worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::notify::NotifyError;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct Recording(Mutex<Vec<String>>);

    #[async_trait]
    impl Notifier for Recording {
        async fn send(&self, text: &str) -> Result<(), NotifyError> {
            self.0.lock().await.push(text.to_string());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct Hanging;

    #[async_trait]
    impl Notifier for Hanging {
        async fn send(&self, _text: &str) -> Result<(), NotifyError> {
            std::future::pending::<()>().await;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    fn note(job_id: &str) -> Notification {
        Notification {
            job_id: job_id.to_string(),
            text: format!("job {} done", job_id),
        }
    }

    #[tokio::test]
    async fn drains_queue_and_exits_when_senders_drop() {
        let (tx, rx) = async_channel::unbounded();
        let notifier = Arc::new(Recording(Mutex::new(Vec::new())));

        tx.send(note("a")).await.unwrap();
        tx.send(note("b")).await.unwrap();
        drop(tx);

        start_notification_worker(rx, notifier.clone(), Duration::from_secs(1)).await;

        assert_eq!(*notifier.0.lock().await, vec!["job a done", "job b done"]);
    }

    #[tokio::test]
    async fn hanging_sends_are_abandoned() {
        let (tx, rx) = async_channel::unbounded();
        tx.send(note("a")).await.unwrap();
        drop(tx);

        let worker = start_notification_worker(rx, Arc::new(Hanging), Duration::from_millis(50));
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .expect("worker should give up on the hanging send");
    }
}
