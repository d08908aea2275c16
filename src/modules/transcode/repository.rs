use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{ContentKind, ContentRecord, ContentRef, ContentStatus, ProcessedVideo, VideoStatus};
use super::store::{
    CommitOutcome, ContentOutcome, Precondition, RegisterOutcome, StoreError, TerminalWrite,
    VideoStore,
};

const VIDEO_COLUMNS: &str = "id, job_id, content_type, content_id, status, output_paths, queue, \
     error_code, error_message, completed_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct VideoRow {
    id: Uuid,
    job_id: String,
    content_type: Option<String>,
    content_id: Option<Uuid>,
    status: String,
    output_paths: Vec<String>,
    queue: Option<String>,
    error_code: Option<String>,
    error_message: Option<String>,
    completed_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<VideoRow> for ProcessedVideo {
    type Error = StoreError;

    fn try_from(row: VideoRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<VideoStatus>()
            .map_err(|e| StoreError::Corrupt(format!("job {}: {}", row.job_id, e)))?;

        let content = match (row.content_type, row.content_id) {
            (Some(kind), Some(id)) => Some(ContentRef {
                kind: kind
                    .parse::<ContentKind>()
                    .map_err(|e| StoreError::Corrupt(format!("job {}: {}", row.job_id, e)))?,
                id,
            }),
            _ => None,
        };

        Ok(ProcessedVideo {
            id: row.id,
            job_id: row.job_id,
            content,
            status,
            output_paths: row.output_paths,
            queue: row.queue,
            error_code: row.error_code,
            error_message: row.error_message,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ContentRow {
    status: Option<String>,
    video_url: Option<String>,
}

impl TryFrom<(ContentRef, ContentRow)> for ContentRecord {
    type Error = StoreError;

    fn try_from((content, row): (ContentRef, ContentRow)) -> Result<Self, Self::Error> {
        // A NULL status column is the table default, DRAFT.
        let status = match row.status.as_deref() {
            Some(raw) => raw
                .parse::<ContentStatus>()
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", content, e)))?,
            None => ContentStatus::Draft,
        };

        Ok(ContentRecord {
            content,
            status,
            video_url: row.video_url,
        })
    }
}

/// Postgres-backed store. Each terminal commit runs in one transaction.
#[derive(Clone)]
pub struct PgVideoStore {
    pool: PgPool,
}

impl PgVideoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_video(
        conn: &mut PgConnection,
        job_id: &str,
    ) -> Result<Option<ProcessedVideo>, StoreError> {
        let sql = format!("SELECT {} FROM processed_videos WHERE job_id = $1", VIDEO_COLUMNS);
        sqlx::query_as::<_, VideoRow>(&sql)
            .bind(job_id)
            .fetch_optional(conn)
            .await?
            .map(ProcessedVideo::try_from)
            .transpose()
    }

    async fn insert_terminal(
        conn: &mut PgConnection,
        write: &TerminalWrite,
    ) -> Result<Option<VideoRow>, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO processed_videos
                (id, job_id, content_type, content_id, status, output_paths, queue,
                 error_code, error_message, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (job_id) DO NOTHING
            RETURNING {}
            "#,
            VIDEO_COLUMNS
        );

        let row = sqlx::query_as::<_, VideoRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&write.job_id)
            .bind(write.content_hint.map(|c| c.kind.as_str()))
            .bind(write.content_hint.map(|c| c.id))
            .bind(write.status.as_str())
            .bind(&write.output_paths)
            .bind(&write.queue)
            .bind(&write.error_code)
            .bind(&write.error_message)
            .bind(write.completed_at)
            .fetch_optional(conn)
            .await?;
        Ok(row)
    }

    async fn finish_pending(
        conn: &mut PgConnection,
        write: &TerminalWrite,
    ) -> Result<Option<VideoRow>, StoreError> {
        // The status predicate is the compare-and-set: a concurrent commit
        // leaves zero matching rows once it holds the row lock.
        let sql = format!(
            r#"
            UPDATE processed_videos
            SET
                status = $2,
                output_paths = $3,
                queue = COALESCE($4, queue),
                error_code = $5,
                error_message = $6,
                completed_at = $7,
                content_type = CASE WHEN content_id IS NULL THEN $8 ELSE content_type END,
                content_id = COALESCE(content_id, $9),
                updated_at = NOW()
            WHERE job_id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            VIDEO_COLUMNS
        );

        let row = sqlx::query_as::<_, VideoRow>(&sql)
            .bind(&write.job_id)
            .bind(write.status.as_str())
            .bind(&write.output_paths)
            .bind(&write.queue)
            .bind(&write.error_code)
            .bind(&write.error_message)
            .bind(write.completed_at)
            .bind(write.content_hint.map(|c| c.kind.as_str()))
            .bind(write.content_hint.map(|c| c.id))
            .fetch_optional(conn)
            .await?;
        Ok(row)
    }

    async fn update_content(
        conn: &mut PgConnection,
        content: ContentRef,
        video: &ProcessedVideo,
    ) -> Result<ContentOutcome, StoreError> {
        let result = match video.status {
            VideoStatus::Complete => {
                let sql = format!(
                    "UPDATE {} SET video_url = $1, status = $2, updated_at = NOW() WHERE id = $3",
                    content.kind.table()
                );
                sqlx::query(&sql)
                    .bind(video.output_paths.first())
                    .bind(ContentStatus::Ready.as_str())
                    .bind(content.id)
                    .execute(conn)
                    .await?
            }
            _ => {
                let sql = format!(
                    "UPDATE {} SET status = $1, updated_at = NOW() WHERE id = $2",
                    content.kind.table()
                );
                sqlx::query(&sql)
                    .bind(ContentStatus::Failed.as_str())
                    .bind(content.id)
                    .execute(conn)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Ok(ContentOutcome::NotFound(Some(content)));
        }
        Ok(ContentOutcome::Updated(content))
    }

    async fn content_exists(conn: &mut PgConnection, content: ContentRef) -> Result<bool, StoreError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", content.kind.table());
        let exists = sqlx::query_scalar::<_, bool>(&sql)
            .bind(content.id)
            .fetch_one(conn)
            .await?;
        Ok(exists)
    }

    async fn mark_processing(conn: &mut PgConnection, content: ContentRef) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {} SET status = $1, updated_at = NOW() WHERE id = $2",
            content.kind.table()
        );
        sqlx::query(&sql)
            .bind(ContentStatus::Processing.as_str())
            .bind(content.id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VideoStore for PgVideoStore {
    async fn find_video(&self, job_id: &str) -> Result<Option<ProcessedVideo>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_video(&mut conn, job_id).await
    }

    async fn find_content(&self, content: &ContentRef) -> Result<Option<ContentRecord>, StoreError> {
        let sql = format!("SELECT status, video_url FROM {} WHERE id = $1", content.kind.table());
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(content.id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| ContentRecord::try_from((*content, row))).transpose()
    }

    async fn register_pending(
        &self,
        job_id: &str,
        content: ContentRef,
    ) -> Result<RegisterOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        if !Self::content_exists(&mut tx, content).await? {
            return Ok(RegisterOutcome::ContentMissing);
        }

        let sql = format!(
            r#"
            INSERT INTO processed_videos (id, job_id, content_type, content_id, status)
            VALUES ($1, $2, $3, $4, 'pending')
            ON CONFLICT (job_id) DO NOTHING
            RETURNING {}
            "#,
            VIDEO_COLUMNS
        );
        let inserted = sqlx::query_as::<_, VideoRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(job_id)
            .bind(content.kind.as_str())
            .bind(content.id)
            .fetch_optional(&mut *tx)
            .await?;

        let outcome = match inserted {
            Some(row) => {
                Self::mark_processing(&mut tx, content).await?;
                RegisterOutcome::Registered(row.try_into()?)
            }
            None => {
                let existing = Self::fetch_video(&mut tx, job_id)
                    .await?
                    .ok_or_else(|| StoreError::Corrupt(format!("job {} vanished", job_id)))?;

                if existing.content == Some(content) {
                    RegisterOutcome::AlreadyRegistered(existing)
                } else if existing.content.is_none() && existing.status == VideoStatus::Pending {
                    let sql = format!(
                        r#"
                        UPDATE processed_videos
                        SET content_type = $2, content_id = $3, updated_at = NOW()
                        WHERE job_id = $1 AND content_id IS NULL
                        RETURNING {}
                        "#,
                        VIDEO_COLUMNS
                    );
                    let row = sqlx::query_as::<_, VideoRow>(&sql)
                        .bind(job_id)
                        .bind(content.kind.as_str())
                        .bind(content.id)
                        .fetch_one(&mut *tx)
                        .await?;
                    Self::mark_processing(&mut tx, content).await?;
                    RegisterOutcome::Registered(row.try_into()?)
                } else {
                    RegisterOutcome::Conflict(existing)
                }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn commit_terminal(
        &self,
        expected: Precondition,
        write: TerminalWrite,
    ) -> Result<CommitOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = match expected {
            Precondition::Absent => Self::insert_terminal(&mut tx, &write).await?,
            Precondition::Pending => Self::finish_pending(&mut tx, &write).await?,
        };

        let Some(row) = row else {
            let current = Self::fetch_video(&mut tx, &write.job_id).await?.map(|v| v.status);
            tx.rollback().await?;
            return Ok(CommitOutcome::Conflict { current });
        };

        let video = ProcessedVideo::try_from(row)?;
        let content = match video.content {
            Some(content) => Self::update_content(&mut tx, content, &video).await?,
            None => ContentOutcome::NotFound(None),
        };

        tx.commit().await?;

        Ok(CommitOutcome::Committed {
            video,
            created: expected == Precondition::Absent,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(job_id: &str, content_hint: Option<ContentRef>) -> TerminalWrite {
        TerminalWrite {
            job_id: job_id.to_string(),
            status: VideoStatus::Complete,
            output_paths: vec!["s3://out/a.m3u8".to_string()],
            queue: Some("Default".to_string()),
            error_code: None,
            error_message: None,
            completed_at: OffsetDateTime::now_utc(),
            content_hint,
        }
    }

    async fn seed_movie(pool: &PgPool) -> ContentRef {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO movies (id, title) VALUES ($1, 'Test')")
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
        ContentRef {
            kind: ContentKind::Movie,
            id,
        }
    }

    #[test]
    fn unknown_content_status_is_corrupt() {
        let content = ContentRef {
            kind: ContentKind::Episode,
            id: Uuid::new_v4(),
        };
        let row = ContentRow {
            status: Some("ARCHIVED".to_string()),
            video_url: None,
        };

        let err = ContentRecord::try_from((content, row)).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(msg) if msg.contains("ARCHIVED")));
    }

    #[test]
    fn null_content_status_reads_as_draft() {
        let content = ContentRef {
            kind: ContentKind::Movie,
            id: Uuid::new_v4(),
        };
        let row = ContentRow {
            status: None,
            video_url: None,
        };

        let record = ContentRecord::try_from((content, row)).unwrap();
        assert_eq!(record.status, ContentStatus::Draft);
    }

    // The cases below need Postgres: DATABASE_URL=postgres://... cargo test -- --ignored
    // `sqlx::test` creates a throwaway database per test and applies ./migrations.

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn stale_absent_commit_conflicts(pool: PgPool) {
        let store = PgVideoStore::new(pool);

        let first = store
            .commit_terminal(Precondition::Absent, complete("job-1", None))
            .await
            .unwrap();
        let mut failed = complete("job-1", None);
        failed.status = VideoStatus::Failed;
        let second = store.commit_terminal(Precondition::Absent, failed).await.unwrap();

        assert!(matches!(first, CommitOutcome::Committed { created: true, .. }));
        assert_eq!(
            second,
            CommitOutcome::Conflict {
                current: Some(VideoStatus::Complete)
            }
        );
        let video = store.find_video("job-1").await.unwrap().unwrap();
        assert_eq!(video.status, VideoStatus::Complete);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn pending_commit_marks_content_ready_once(pool: PgPool) {
        let content = seed_movie(&pool).await;
        let store = PgVideoStore::new(pool);

        let registered = store.register_pending("job-1", content).await.unwrap();
        assert!(matches!(registered, RegisterOutcome::Registered(_)));
        let record = store.find_content(&content).await.unwrap().unwrap();
        assert_eq!(record.status, ContentStatus::Processing);

        let outcome = store
            .commit_terminal(Precondition::Pending, complete("job-1", None))
            .await
            .unwrap();
        match outcome {
            CommitOutcome::Committed {
                video,
                created,
                content: updated,
            } => {
                assert!(!created);
                assert_eq!(video.status, VideoStatus::Complete);
                assert_eq!(updated, ContentOutcome::Updated(content));
            }
            other => panic!("expected commit, got {:?}", other),
        }
        let record = store.find_content(&content).await.unwrap().unwrap();
        assert_eq!(record.status, ContentStatus::Ready);
        assert_eq!(record.video_url.as_deref(), Some("s3://out/a.m3u8"));

        let again = store
            .commit_terminal(Precondition::Pending, complete("job-1", None))
            .await
            .unwrap();
        assert_eq!(
            again,
            CommitOutcome::Conflict {
                current: Some(VideoStatus::Complete)
            }
        );
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn registered_content_wins_over_hint(pool: PgPool) {
        let registered = seed_movie(&pool).await;
        let hinted = seed_movie(&pool).await;
        let store = PgVideoStore::new(pool);
        store.register_pending("job-1", registered).await.unwrap();

        store
            .commit_terminal(Precondition::Pending, complete("job-1", Some(hinted)))
            .await
            .unwrap();

        let video = store.find_video("job-1").await.unwrap().unwrap();
        assert_eq!(video.content, Some(registered));
        let untouched = store.find_content(&hinted).await.unwrap().unwrap();
        assert_eq!(untouched.status, ContentStatus::Draft);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn hint_binds_content_on_create(pool: PgPool) {
        let content = seed_movie(&pool).await;
        let store = PgVideoStore::new(pool);

        let outcome = store
            .commit_terminal(Precondition::Absent, complete("job-1", Some(content)))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            CommitOutcome::Committed { created: true, content: ContentOutcome::Updated(c), .. } if c == content
        ));
        let video = store.find_video("job-1").await.unwrap().unwrap();
        assert_eq!(video.content, Some(content));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn register_rejects_rebinding_and_missing_content(pool: PgPool) {
        let content = seed_movie(&pool).await;
        let other = seed_movie(&pool).await;
        let store = PgVideoStore::new(pool);

        store.register_pending("job-1", content).await.unwrap();
        let again = store.register_pending("job-1", content).await.unwrap();
        let rebind = store.register_pending("job-1", other).await.unwrap();
        let missing = store
            .register_pending(
                "job-2",
                ContentRef {
                    kind: ContentKind::Episode,
                    id: Uuid::new_v4(),
                },
            )
            .await
            .unwrap();

        assert!(matches!(again, RegisterOutcome::AlreadyRegistered(_)));
        assert!(matches!(rebind, RegisterOutcome::Conflict(_)));
        assert_eq!(missing, RegisterOutcome::ContentMissing);
    }
}
