use super::model::{ProcessedVideo, VideoStatus};
use super::store::{Precondition, StoreError, VideoStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Reconcile, conditioned on the state observed here.
    Proceed(Precondition),
    /// The job already reached a terminal status; this delivery is a repeat.
    Duplicate(VideoStatus),
}

pub fn decide(existing: Option<&ProcessedVideo>) -> GuardDecision {
    match existing.map(|v| v.status) {
        None => GuardDecision::Proceed(Precondition::Absent),
        Some(status) if status.is_terminal() => GuardDecision::Duplicate(status),
        Some(_) => GuardDecision::Proceed(Precondition::Pending),
    }
}

pub async fn check(store: &dyn VideoStore, job_id: &str) -> Result<GuardDecision, StoreError> {
    let existing = store.find_video(job_id).await?;
    Ok(decide(existing.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn video(status: VideoStatus) -> ProcessedVideo {
        let mut video = ProcessedVideo::pending("job-1", None, OffsetDateTime::now_utc());
        video.status = status;
        video
    }

    #[test]
    fn unseen_job_proceeds_on_create_path() {
        assert_eq!(decide(None), GuardDecision::Proceed(Precondition::Absent));
    }

    #[test]
    fn pending_job_proceeds_on_update_path() {
        assert_eq!(
            decide(Some(&video(VideoStatus::Pending))),
            GuardDecision::Proceed(Precondition::Pending)
        );
    }

    #[test]
    fn terminal_jobs_short_circuit() {
        assert_eq!(
            decide(Some(&video(VideoStatus::Complete))),
            GuardDecision::Duplicate(VideoStatus::Complete)
        );
        assert_eq!(
            decide(Some(&video(VideoStatus::Failed))),
            GuardDecision::Duplicate(VideoStatus::Failed)
        );
    }
}
