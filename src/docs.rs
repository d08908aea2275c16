use utoipa::OpenApi;

use crate::common::response::ErrorBody;
use crate::modules::transcode::dto::*;
use crate::modules::transcode::model::{
    ContentKind, ContentRecord, ContentRef, ContentStatus, ProcessedVideo, VideoStatus,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::transcode::handler::receive_event,
        crate::modules::transcode::handler::register_job,
        crate::modules::transcode::handler::get_job,
    ),
    components(
        schemas(
            TranscodeNotification, EventDetail, OutputGroupDetail, OutputDetail,
            WebhookAck, ReconcileResult, RegisterJobRequest, JobResponse, ErrorBody,
            ProcessedVideo, VideoStatus, ContentRecord, ContentRef, ContentKind, ContentStatus,
        )
    ),
    tags(
        (name = "Transcode", description = "Transcoding job status ingestion")
    )
)]
pub struct ApiDoc;
