use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::model::{ContentRecord, ContentRef, ContentStatus, ProcessedVideo, VideoStatus};
use super::store::{
    CommitOutcome, ContentOutcome, Precondition, RegisterOutcome, StoreError, TerminalWrite,
    VideoStore,
};

#[derive(Default)]
struct MemoryState {
    videos: HashMap<String, ProcessedVideo>,
    contents: HashMap<ContentRef, ContentRecord>,
}

/// Process-local store used when no database is configured, and by tests.
///
/// A single lock covers both maps, so every operation is atomic.
#[derive(Default)]
pub struct MemoryVideoStore {
    state: Mutex<MemoryState>,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a movie or episode row in `DRAFT`.
    pub async fn insert_content(&self, content: ContentRef) {
        let mut state = self.state.lock().await;
        state.contents.insert(
            content,
            ContentRecord {
                content,
                status: ContentStatus::Draft,
                video_url: None,
            },
        );
    }

    pub async fn video_count(&self) -> usize {
        self.state.lock().await.videos.len()
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn find_video(&self, job_id: &str) -> Result<Option<ProcessedVideo>, StoreError> {
        Ok(self.state.lock().await.videos.get(job_id).cloned())
    }

    async fn find_content(&self, content: &ContentRef) -> Result<Option<ContentRecord>, StoreError> {
        Ok(self.state.lock().await.contents.get(content).cloned())
    }

    async fn register_pending(
        &self,
        job_id: &str,
        content: ContentRef,
    ) -> Result<RegisterOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let MemoryState { videos, contents } = &mut *state;

        let Some(record) = contents.get_mut(&content) else {
            return Ok(RegisterOutcome::ContentMissing);
        };

        let now = OffsetDateTime::now_utc();
        match videos.get_mut(job_id) {
            None => {
                let video = ProcessedVideo::pending(job_id, Some(content), now);
                videos.insert(job_id.to_string(), video.clone());
                record.status = ContentStatus::Processing;
                Ok(RegisterOutcome::Registered(video))
            }
            Some(existing) if existing.content == Some(content) => {
                Ok(RegisterOutcome::AlreadyRegistered(existing.clone()))
            }
            Some(existing) if existing.content.is_none() && existing.status == VideoStatus::Pending => {
                existing.content = Some(content);
                existing.updated_at = now;
                record.status = ContentStatus::Processing;
                Ok(RegisterOutcome::Registered(existing.clone()))
            }
            Some(existing) => Ok(RegisterOutcome::Conflict(existing.clone())),
        }
    }

    async fn commit_terminal(
        &self,
        expected: Precondition,
        write: TerminalWrite,
    ) -> Result<CommitOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let MemoryState { videos, contents } = &mut *state;

        let current = videos.get(&write.job_id).map(|v| v.status);
        let holds = match expected {
            Precondition::Absent => current.is_none(),
            Precondition::Pending => current == Some(VideoStatus::Pending),
        };
        if !holds {
            return Ok(CommitOutcome::Conflict { current });
        }

        let now = OffsetDateTime::now_utc();
        let video = videos
            .entry(write.job_id.clone())
            .or_insert_with(|| ProcessedVideo::pending(&write.job_id, None, now));

        video.status = write.status;
        video.output_paths = write.output_paths;
        if write.queue.is_some() {
            video.queue = write.queue;
        }
        video.error_code = write.error_code;
        video.error_message = write.error_message;
        video.completed_at = Some(write.completed_at);
        if video.content.is_none() {
            video.content = write.content_hint;
        }
        video.updated_at = now;
        let video = video.clone();

        let content = match video.content {
            Some(content) => match contents.get_mut(&content) {
                Some(record) => {
                    if video.status == VideoStatus::Complete {
                        record.status = ContentStatus::Ready;
                        record.video_url = video.output_paths.first().cloned();
                    } else {
                        record.status = ContentStatus::Failed;
                    }
                    ContentOutcome::Updated(content)
                }
                None => ContentOutcome::NotFound(Some(content)),
            },
            None => ContentOutcome::NotFound(None),
        };

        Ok(CommitOutcome::Committed {
            video,
            created: expected == Precondition::Absent,
            content,
        })
    }
}
