use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::event_validator::ValidationError;
use super::model::ContentRef;
use super::store::StoreError;
use crate::common::response::ApiError;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] validator::ValidationErrors),
    #[error("{0} not found")]
    ContentNotFound(ContentRef),
    #[error("job {0} not found")]
    JobNotFound(String),
    #[error("job {0} is already registered to other content or finished")]
    JobConflict(String),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
    #[error("request body too large")]
    PayloadTooLarge,
}

impl From<BytesRejection> for TranscodeError {
    fn from(rejection: BytesRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => TranscodeError::PayloadTooLarge,
            _ => ValidationError::Malformed(rejection.body_text()).into(),
        }
    }
}

impl TranscodeError {
    /// Stable name reported as `reason` in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            TranscodeError::Validation(ValidationError::Malformed(_)) => "MalformedPayload",
            TranscodeError::Validation(ValidationError::Inconsistent(_)) => "InconsistentEvent",
            TranscodeError::InvalidRequest(_) => "InvalidRequest",
            TranscodeError::ContentNotFound(_) => "ContentNotFound",
            TranscodeError::JobNotFound(_) => "JobNotFound",
            TranscodeError::JobConflict(_) => "JobConflict",
            TranscodeError::Storage(_) => "StorageFailure",
            TranscodeError::PayloadTooLarge => "PayloadTooLarge",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            TranscodeError::Validation(_) | TranscodeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            TranscodeError::ContentNotFound(_) | TranscodeError::JobNotFound(_) => StatusCode::NOT_FOUND,
            TranscodeError::JobConflict(_) => StatusCode::CONFLICT,
            TranscodeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TranscodeError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for TranscodeError {
    fn into_response(self) -> Response {
        ApiError::new(self.kind(), self.to_string(), self.status_code()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_map_to_bad_request() {
        let malformed = TranscodeError::from(ValidationError::Malformed("x".into()));
        let inconsistent = TranscodeError::from(ValidationError::Inconsistent("x".into()));

        assert_eq!(malformed.kind(), "MalformedPayload");
        assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(inconsistent.kind(), "InconsistentEvent");
        assert_eq!(inconsistent.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_failures_map_to_server_error() {
        let err = TranscodeError::from(StoreError::Corrupt("bad status".into()));

        assert_eq!(err.kind(), "StorageFailure");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn oversize_body_maps_to_payload_too_large() {
        let err = TranscodeError::PayloadTooLarge;

        assert_eq!(err.kind(), "PayloadTooLarge");
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
