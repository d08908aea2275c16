use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Visibility of a movie or episode. Stored upper-case in the content tables.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentStatus {
    Draft,
    Processing,
    Ready,
    Failed,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "DRAFT",
            ContentStatus::Processing => "PROCESSING",
            ContentStatus::Ready => "READY",
            ContentStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for ContentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(ContentStatus::Draft),
            "PROCESSING" => Ok(ContentStatus::Processing),
            "READY" => Ok(ContentStatus::Ready),
            "FAILED" => Ok(ContentStatus::Failed),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Episode,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Episode => "episode",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movies",
            ContentKind::Episode => "episodes",
        }
    }
}

impl FromStr for ContentKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movie" => Ok(ContentKind::Movie),
            "episode" => Ok(ContentKind::Episode),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant `{}`", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Points at the movie or episode a transcoded video belongs to.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
pub struct ContentRef {
    pub kind: ContentKind,
    pub id: Uuid,
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Pending,
    Complete,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Complete => "complete",
            VideoStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Complete | VideoStatus::Failed)
    }
}

impl FromStr for VideoStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VideoStatus::Pending),
            "complete" => Ok(VideoStatus::Complete),
            "failed" => Ok(VideoStatus::Failed),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct ProcessedVideo {
    pub id: Uuid,
    pub job_id: String,
    pub content: Option<ContentRef>,
    pub status: VideoStatus,
    pub output_paths: Vec<String>,
    pub queue: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::iso8601::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::iso8601")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::iso8601")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl ProcessedVideo {
    pub fn pending(job_id: &str, content: Option<ContentRef>, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id: job_id.to_string(),
            content,
            status: VideoStatus::Pending,
            output_paths: Vec::new(),
            queue: None,
            error_code: None,
            error_message: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The slice of a movie or episode row this service reads and writes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct ContentRecord {
    pub content: ContentRef,
    pub status: ContentStatus,
    pub video_url: Option<String>,
}
