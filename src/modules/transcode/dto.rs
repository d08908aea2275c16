use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::model::{ContentKind, ContentRecord, ProcessedVideo};

// --- INBOUND NOTIFICATION ---

/// Job state change notification as delivered by the transcoding pipeline.
///
/// Every field is optional on the wire so that missing data surfaces as a
/// validation failure rather than a deserializer error.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TranscodeNotification {
    pub detail: Option<EventDetail>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    pub status: Option<String>,
    pub job_id: Option<String>,
    pub queue: Option<String>,
    /// ISO-8601 string or epoch milliseconds.
    #[schema(value_type = Option<String>)]
    pub timestamp: Option<serde_json::Value>,
    pub output_group_details: Option<Vec<OutputGroupDetail>>,
    #[schema(value_type = Option<Object>)]
    pub user_metadata: Option<HashMap<String, serde_json::Value>>,
    #[schema(value_type = Option<String>)]
    pub error_code: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutputGroupDetail {
    pub output_details: Option<Vec<OutputDetail>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutputDetail {
    pub output_file_paths: Option<Vec<String>>,
}

// --- WEBHOOK RESPONSE ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileResult {
    Created,
    Updated,
    Duplicate,
    Orphan,
    Ignored,
}

impl ReconcileResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileResult::Created => "created",
            ReconcileResult::Updated => "updated",
            ReconcileResult::Duplicate => "duplicate",
            ReconcileResult::Orphan => "orphan",
            ReconcileResult::Ignored => "ignored",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub status: String,
    pub result: ReconcileResult,
}

impl WebhookAck {
    pub fn ok(result: ReconcileResult) -> Self {
        Self {
            status: "ok".to_string(),
            result,
        }
    }
}

// --- JOB REGISTRATION ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterJobRequest {
    #[validate(length(min = 1, max = 255, message = "Job id must be 1-255 characters"))]
    pub job_id: String,
    pub content_id: Uuid,
    pub content_type: ContentKind,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobResponse {
    pub video: ProcessedVideo,
    pub content: Option<ContentRecord>,
}
