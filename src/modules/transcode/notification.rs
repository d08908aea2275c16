use async_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use super::dto::ReconcileResult;
use super::events::TranscodeEvent;
use super::model::VideoStatus;
use super::service::Reconciliation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub job_id: String,
    pub text: String,
}

/// Builds the alert for an outcome worth telling a human about. Duplicates
/// and ignored statuses produce nothing.
pub fn render(outcome: &Reconciliation, event: &TranscodeEvent) -> Option<Notification> {
    let content = outcome
        .content
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown content".to_string());

    let text = match (outcome.result, outcome.video_status) {
        (ReconcileResult::Duplicate | ReconcileResult::Ignored, _) => return None,
        (ReconcileResult::Orphan, _) => format!(
            ":warning: Transcode job `{}` completed but no owning content was found ({}). Output: {}",
            outcome.job_id,
            content,
            event.primary_output().unwrap_or("-")
        ),
        (_, Some(VideoStatus::Failed)) => format!(
            ":x: Transcode job `{}` for {} failed: {} {}",
            outcome.job_id,
            content,
            event.error_code.as_deref().unwrap_or("-"),
            event.error_message.as_deref().unwrap_or("")
        )
        .trim_end()
        .to_string(),
        _ => format!(
            ":white_check_mark: Transcode job `{}` for {} is ready ({} output{})",
            outcome.job_id,
            content,
            event.output_paths.len(),
            if event.output_paths.len() == 1 { "" } else { "s" }
        ),
    };

    Some(Notification {
        job_id: outcome.job_id.clone(),
        text,
    })
}

/// Hands notifications to the background worker without waiting on it.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: Sender<Notification>,
}

impl NotificationDispatcher {
    pub fn new(capacity: usize) -> (Self, Receiver<Notification>) {
        let (tx, rx) = async_channel::bounded(capacity);
        (Self { tx }, rx)
    }

    /// Never blocks. A full or closed queue drops the notification.
    pub fn dispatch(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => debug!("Queued notification"),
            Err(TrySendError::Full(n)) => {
                warn!("Notification queue full; dropping alert for job {}", n.job_id)
            }
            Err(TrySendError::Closed(n)) => {
                warn!("Notification worker stopped; dropping alert for job {}", n.job_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::transcode::events::TranscodeStatus;

    fn event(status: TranscodeStatus) -> TranscodeEvent {
        TranscodeEvent {
            job_id: "job-1".to_string(),
            status,
            output_paths: vec!["s3://out/a.m3u8".to_string()],
            queue: None,
            timestamp: None,
            error_code: Some("1030".to_string()),
            error_message: Some("bad input".to_string()),
            content: None,
        }
    }

    fn outcome(result: ReconcileResult, status: Option<VideoStatus>) -> Reconciliation {
        Reconciliation {
            job_id: "job-1".to_string(),
            result,
            video_status: status,
            content: None,
            content_updated: false,
        }
    }

    #[test]
    fn duplicates_and_ignored_are_silent() {
        let e = event(TranscodeStatus::Complete);
        assert!(render(&outcome(ReconcileResult::Duplicate, Some(VideoStatus::Complete)), &e).is_none());
        assert!(render(&outcome(ReconcileResult::Ignored, None), &e).is_none());
    }

    #[test]
    fn renders_success_failure_and_orphan() {
        let ok = render(
            &outcome(ReconcileResult::Created, Some(VideoStatus::Complete)),
            &event(TranscodeStatus::Complete),
        )
        .unwrap();
        assert!(ok.text.contains("is ready (1 output)"));

        let failed = render(
            &outcome(ReconcileResult::Updated, Some(VideoStatus::Failed)),
            &event(TranscodeStatus::Error),
        )
        .unwrap();
        assert!(failed.text.contains("failed: 1030 bad input"));

        let orphan = render(
            &outcome(ReconcileResult::Orphan, Some(VideoStatus::Complete)),
            &event(TranscodeStatus::Complete),
        )
        .unwrap();
        assert!(orphan.text.contains("no owning content"));
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (dispatcher, rx) = NotificationDispatcher::new(1);
        let note = |n: &str| Notification {
            job_id: n.to_string(),
            text: String::new(),
        };

        dispatcher.dispatch(note("a"));
        dispatcher.dispatch(note("b"));

        assert_eq!(rx.len(), 1);
        assert_eq!(rx.recv().await.unwrap().job_id, "a");
    }
}
