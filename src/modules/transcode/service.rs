use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};
use validator::Validate;

use super::dto::{JobResponse, ReconcileResult, RegisterJobRequest};
use super::error::TranscodeError;
use super::events::{TranscodeEvent, TranscodeStatus};
use super::guard::{self, GuardDecision};
use super::model::{ContentRef, VideoStatus};
use super::store::{
    CommitOutcome, ContentOutcome, RegisterOutcome, StoreError, TerminalWrite, VideoStore,
};

/// What one delivery did to durable state.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub job_id: String,
    pub result: ReconcileResult,
    /// Status stored for the job after this delivery, if a record exists.
    pub video_status: Option<VideoStatus>,
    pub content: Option<ContentRef>,
    pub content_updated: bool,
}

impl Reconciliation {
    fn untouched(job_id: &str, result: ReconcileResult, video_status: Option<VideoStatus>) -> Self {
        Self {
            job_id: job_id.to_string(),
            result,
            video_status,
            content: None,
            content_updated: false,
        }
    }
}

/// Applies validated job events to the store. The store is the only shared
/// state; every terminal write goes through [`TranscodeService::reconcile`].
#[derive(Clone)]
pub struct TranscodeService {
    store: Arc<dyn VideoStore>,
}

impl TranscodeService {
    pub fn new(store: Arc<dyn VideoStore>) -> Self {
        Self { store }
    }

    pub async fn reconcile(&self, event: &TranscodeEvent) -> Result<Reconciliation, StoreError> {
        let terminal = match &event.status {
            TranscodeStatus::Complete => VideoStatus::Complete,
            TranscodeStatus::Error => VideoStatus::Failed,
            TranscodeStatus::Unhandled(status) => {
                info!("Ignoring job {} with unhandled status {}", event.job_id, status);
                return Ok(Reconciliation::untouched(&event.job_id, ReconcileResult::Ignored, None));
            }
        };

        let expected = match guard::check(self.store.as_ref(), &event.job_id).await? {
            GuardDecision::Proceed(expected) => expected,
            GuardDecision::Duplicate(current) => {
                debug!(
                    "Duplicate delivery for job {} (already {})",
                    event.job_id,
                    current.as_str()
                );
                return Ok(Reconciliation::untouched(
                    &event.job_id,
                    ReconcileResult::Duplicate,
                    Some(current),
                ));
            }
        };

        let write = TerminalWrite {
            job_id: event.job_id.clone(),
            status: terminal,
            output_paths: event.output_paths.clone(),
            queue: event.queue.clone(),
            error_code: event.error_code.clone(),
            error_message: event.error_message.clone(),
            completed_at: event.timestamp.unwrap_or_else(OffsetDateTime::now_utc),
            content_hint: event.content,
        };

        let (video, created, content) = match self.store.commit_terminal(expected, write).await? {
            CommitOutcome::Committed {
                video,
                created,
                content,
            } => (video, created, content),
            CommitOutcome::Conflict { current } => {
                debug!(
                    "Job {} changed concurrently (now {:?}); treating delivery as duplicate",
                    event.job_id, current
                );
                return Ok(Reconciliation::untouched(
                    &event.job_id,
                    ReconcileResult::Duplicate,
                    current,
                ));
            }
        };

        let (content_ref, content_updated) = match content {
            ContentOutcome::Updated(content) => (Some(content), true),
            ContentOutcome::NotFound(content) => (content, false),
        };

        let result = match (video.status, content_updated, created) {
            (VideoStatus::Complete, false, _) => {
                warn!(
                    "Job {} completed but no owning content was found ({}); video stored as orphan",
                    video.job_id,
                    content_ref.map(|c| c.to_string()).unwrap_or_else(|| "no reference".to_string())
                );
                ReconcileResult::Orphan
            }
            (_, _, true) => ReconcileResult::Created,
            (_, _, false) => ReconcileResult::Updated,
        };

        match video.status {
            VideoStatus::Failed => warn!(
                "Job {} failed: {} {}",
                video.job_id,
                video.error_code.as_deref().unwrap_or("-"),
                video.error_message.as_deref().unwrap_or("")
            ),
            _ => info!("Job {} reconciled as {}", video.job_id, result.as_str()),
        }

        Ok(Reconciliation {
            job_id: video.job_id,
            result,
            video_status: Some(video.status),
            content: content_ref,
            content_updated,
        })
    }

    pub async fn register_job(&self, req: RegisterJobRequest) -> Result<JobResponse, TranscodeError> {
        req.validate()?;

        let content = ContentRef {
            kind: req.content_type,
            id: req.content_id,
        };

        match self.store.register_pending(&req.job_id, content).await? {
            RegisterOutcome::Registered(video) => {
                info!("Registered job {} for {}", video.job_id, content);
                Ok(JobResponse { video, content: None })
            }
            RegisterOutcome::AlreadyRegistered(video) => Ok(JobResponse { video, content: None }),
            RegisterOutcome::Conflict(video) => Err(TranscodeError::JobConflict(video.job_id)),
            RegisterOutcome::ContentMissing => Err(TranscodeError::ContentNotFound(content)),
        }
    }

    pub async fn get_job(&self, job_id: &str) -> Result<JobResponse, TranscodeError> {
        let video = self
            .store
            .find_video(job_id)
            .await?
            .ok_or_else(|| TranscodeError::JobNotFound(job_id.to_string()))?;

        let content = match &video.content {
            Some(content) => self.store.find_content(content).await?,
            None => None,
        };

        Ok(JobResponse { video, content })
    }
}
