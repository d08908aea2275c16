use axum::{
    extract::{rejection::BytesRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use tracing::{error, warn};

use super::dto::{JobResponse, RegisterJobRequest, TranscodeNotification, WebhookAck};
use super::error::TranscodeError;
use super::event_validator;
use super::notification;
use crate::common::response::{ApiResponse, ApiSuccess, ErrorBody};
use crate::state::AppState;

/// Receive a transcoding job state change
#[utoipa::path(
    post,
    path = "/aws/listener/eventbridge/video",
    request_body = TranscodeNotification,
    responses(
        (status = 200, description = "Delivery acknowledged", body = WebhookAck),
        (status = 400, description = "Malformed or inconsistent event", body = ErrorBody),
        (status = 401, description = "Authentication failed", body = ErrorBody),
        (status = 413, description = "Body exceeds the listener limit", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    ),
    tag = "Transcode"
)]
pub async fn receive_event(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, TranscodeError> {
    let body = body.inspect_err(|e| warn!("Rejected transcode body: {}", e))?;
    let event = event_validator::validate(&body)
        .inspect_err(|e| warn!("Rejected transcode event: {}", e))?;

    let outcome = state
        .transcode
        .reconcile(&event)
        .await
        .inspect_err(|e| error!("❌ Failed to reconcile job {}: {}", event.job_id, e))?;

    // Committed state stands from here on; only the alert remains and it
    // never affects the response.
    if let Some(note) = notification::render(&outcome, &event) {
        state.dispatcher.dispatch(note);
    }

    Ok((StatusCode::OK, Json(WebhookAck::ok(outcome.result))))
}

/// Register a submitted transcoding job against its movie or episode
#[utoipa::path(
    post,
    path = "/api/v1/transcode-jobs",
    request_body = RegisterJobRequest,
    responses(
        (status = 201, description = "Job registered", body = ApiResponse<JobResponse>),
        (status = 400, description = "Bad Request", body = ErrorBody),
        (status = 404, description = "Content not found", body = ErrorBody),
        (status = 409, description = "Job bound to other content", body = ErrorBody)
    ),
    tag = "Transcode"
)]
pub async fn register_job(
    State(state): State<AppState>,
    Json(req): Json<RegisterJobRequest>,
) -> impl IntoResponse {
    match state.transcode.register_job(req).await {
        Ok(res) => ApiSuccess(
            ApiResponse::success(res, "Job registered successfully"),
            StatusCode::CREATED,
        )
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get the processing state of a transcoding job
#[utoipa::path(
    get,
    path = "/api/v1/transcode-jobs/{job_id}",
    params(
        ("job_id" = String, Path, description = "Transcoding job ID")
    ),
    responses(
        (status = 200, description = "Job details", body = ApiResponse<JobResponse>),
        (status = 404, description = "Job not found", body = ErrorBody)
    ),
    tag = "Transcode"
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match state.transcode.get_job(&job_id).await {
        Ok(res) => ApiSuccess(
            ApiResponse::success(res, "Job retrieved successfully"),
            StatusCode::OK,
        )
        .into_response(),
        Err(e) => e.into_response(),
    }
}
