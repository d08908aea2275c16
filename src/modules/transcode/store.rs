use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use super::model::{ContentRecord, ContentRef, ProcessedVideo, VideoStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt processed video row: {0}")]
    Corrupt(String),
}

/// Prior state a terminal write is conditioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// No record exists for the job yet.
    Absent,
    /// A record exists and is still `pending`.
    Pending,
}

#[derive(Debug, Clone)]
pub struct TerminalWrite {
    pub job_id: String,
    pub status: VideoStatus,
    pub output_paths: Vec<String>,
    pub queue: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub completed_at: OffsetDateTime,
    /// Used when the record has no registered content of its own.
    pub content_hint: Option<ContentRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentOutcome {
    Updated(ContentRef),
    /// The reference (if any) did not resolve to an existing row.
    NotFound(Option<ContentRef>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed {
        video: ProcessedVideo,
        created: bool,
        content: ContentOutcome,
    },
    /// The precondition no longer held; nothing was written.
    Conflict { current: Option<VideoStatus> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    Registered(ProcessedVideo),
    AlreadyRegistered(ProcessedVideo),
    /// The job exists and is bound elsewhere or already terminal.
    Conflict(ProcessedVideo),
    ContentMissing,
}

/// Durable state for processed videos and the content rows they feed.
///
/// `commit_terminal` is the only path to a terminal status and must apply the
/// video write and the content write as one unit, or neither.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn find_video(&self, job_id: &str) -> Result<Option<ProcessedVideo>, StoreError>;

    async fn find_content(&self, content: &ContentRef) -> Result<Option<ContentRecord>, StoreError>;

    async fn register_pending(
        &self,
        job_id: &str,
        content: ContentRef,
    ) -> Result<RegisterOutcome, StoreError>;

    async fn commit_terminal(
        &self,
        expected: Precondition,
        write: TerminalWrite,
    ) -> Result<CommitOutcome, StoreError>;
}
