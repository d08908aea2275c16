use time::OffsetDateTime;

use super::model::ContentRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeStatus {
    Complete,
    Error,
    /// Any other pipeline status (`PROGRESSING`, `INPUT_INFORMATION`, ...).
    Unhandled(String),
}

impl TranscodeStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "COMPLETE" => TranscodeStatus::Complete,
            "ERROR" => TranscodeStatus::Error,
            other => TranscodeStatus::Unhandled(other.to_string()),
        }
    }
}

/// A structurally valid job notification, ready for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeEvent {
    pub job_id: String,
    pub status: TranscodeStatus,
    pub output_paths: Vec<String>,
    pub queue: Option<String>,
    pub timestamp: Option<OffsetDateTime>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    /// Owning content carried in the job's user metadata, if any.
    pub content: Option<ContentRef>,
}

impl TranscodeEvent {
    /// First reported output; becomes the content's video URL.
    pub fn primary_output(&self) -> Option<&str> {
        self.output_paths.first().map(String::as_str)
    }
}
