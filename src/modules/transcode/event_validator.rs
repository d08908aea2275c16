//! Turns a raw webhook body into a [`TranscodeEvent`].
//!
//! Validation is pure: nothing here touches storage or logs.

use std::collections::HashMap;

use thiserror::Error;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{EventDetail, TranscodeNotification};
use super::events::{TranscodeEvent, TranscodeStatus};
use super::model::{ContentKind, ContentRef};

const META_CONTENT_ID: &str = "contentId";
const META_CONTENT_TYPE: &str = "contentType";

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("inconsistent event: {0}")]
    Inconsistent(String),
}

pub fn validate(body: &[u8]) -> Result<TranscodeEvent, ValidationError> {
    let notification: TranscodeNotification = serde_json::from_slice(body)
        .map_err(|e| ValidationError::Malformed(format!("invalid JSON body: {}", e)))?;

    let detail = notification
        .detail
        .ok_or_else(|| ValidationError::Malformed("missing `detail`".to_string()))?;

    validate_detail(detail)
}

fn validate_detail(detail: EventDetail) -> Result<TranscodeEvent, ValidationError> {
    let job_id = required(detail.job_id, "detail.jobId")?;
    let status = TranscodeStatus::parse(&required(detail.status, "detail.status")?);

    let timestamp = detail.timestamp.as_ref().map(parse_timestamp).transpose()?;

    let output_paths: Vec<String> = detail
        .output_group_details
        .unwrap_or_default()
        .into_iter()
        .flat_map(|group| group.output_details.unwrap_or_default())
        .flat_map(|output| output.output_file_paths.unwrap_or_default())
        .filter(|path| !path.trim().is_empty())
        .collect();

    if status == TranscodeStatus::Complete && output_paths.is_empty() {
        return Err(ValidationError::Inconsistent(format!(
            "job {} is COMPLETE but reported no output files",
            job_id
        )));
    }

    let error_code = detail.error_code.and_then(|code| match code {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    });

    Ok(TranscodeEvent {
        job_id,
        status,
        output_paths,
        queue: detail.queue.filter(|q| !q.is_empty()),
        timestamp,
        error_code,
        error_message: detail.error_message,
        content: detail.user_metadata.as_ref().and_then(content_from_metadata),
    })
}

fn required(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValidationError::Malformed(format!("missing required field `{}`", field)))
}

fn parse_timestamp(raw: &serde_json::Value) -> Result<OffsetDateTime, ValidationError> {
    let invalid = || ValidationError::Malformed(format!("invalid `detail.timestamp`: {}", raw));

    match raw {
        serde_json::Value::String(s) => OffsetDateTime::parse(s, &Rfc3339)
            .or_else(|_| OffsetDateTime::parse(s, &Iso8601::DEFAULT))
            .map_err(|_| invalid()),
        serde_json::Value::Number(n) => {
            let millis = n.as_i64().ok_or_else(invalid)?;
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
                .map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

/// Metadata that does not name a known content kind and a UUID is treated as
/// absent; the job then reconciles through its registered relation, if any.
fn content_from_metadata(meta: &HashMap<String, serde_json::Value>) -> Option<ContentRef> {
    let id = meta.get(META_CONTENT_ID)?.as_str()?;
    let kind = meta.get(META_CONTENT_TYPE)?.as_str()?;

    Some(ContentRef {
        kind: kind.parse::<ContentKind>().ok()?,
        id: Uuid::parse_str(id).ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn complete_detail() -> serde_json::Value {
        json!({
            "detail": {
                "status": "COMPLETE",
                "jobId": "1700000000000-abc123",
                "queue": "arn:aws:mediaconvert:us-east-1:000000000000:queues/Default",
                "timestamp": "2024-05-01T12:30:00Z",
                "outputGroupDetails": [
                    { "outputDetails": [ { "outputFilePaths": ["s3://bucket/out/video.m3u8"] } ] },
                    { "outputDetails": [
                        { "outputFilePaths": ["s3://bucket/out/video_720.mp4"] },
                        { "outputFilePaths": ["s3://bucket/out/video_480.mp4"] }
                    ] }
                ]
            }
        })
    }

    #[test]
    fn flattens_outputs_in_order() {
        let event = validate(&body(complete_detail())).unwrap();

        assert_eq!(event.job_id, "1700000000000-abc123");
        assert_eq!(event.status, TranscodeStatus::Complete);
        assert_eq!(
            event.output_paths,
            vec![
                "s3://bucket/out/video.m3u8",
                "s3://bucket/out/video_720.mp4",
                "s3://bucket/out/video_480.mp4",
            ]
        );
        assert_eq!(event.primary_output(), Some("s3://bucket/out/video.m3u8"));
        assert_eq!(event.timestamp.unwrap().unix_timestamp(), 1_714_566_600);
        assert!(event.content.is_none());
    }

    #[test]
    fn missing_job_id_is_malformed() {
        let mut value = complete_detail();
        value["detail"].as_object_mut().unwrap().remove("jobId");

        assert!(matches!(
            validate(&body(value)),
            Err(ValidationError::Malformed(msg)) if msg.contains("jobId")
        ));
    }

    #[test]
    fn blank_status_is_malformed() {
        let mut value = complete_detail();
        value["detail"]["status"] = json!("  ");

        assert!(matches!(validate(&body(value)), Err(ValidationError::Malformed(_))));
    }

    #[test]
    fn non_json_and_missing_detail_are_malformed() {
        assert!(matches!(validate(b"not json"), Err(ValidationError::Malformed(_))));
        assert!(matches!(
            validate(&body(json!({ "source": "aws.mediaconvert" }))),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            validate(&body(json!({ "detail": "COMPLETE" }))),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn complete_without_outputs_is_inconsistent() {
        let value = json!({
            "detail": {
                "status": "COMPLETE",
                "jobId": "job-1",
                "outputGroupDetails": [ { "outputDetails": [ { "outputFilePaths": [] } ] } ]
            }
        });

        assert!(matches!(validate(&body(value)), Err(ValidationError::Inconsistent(_))));
    }

    #[test]
    fn error_without_outputs_is_accepted() {
        let value = json!({
            "detail": {
                "status": "ERROR",
                "jobId": "job-1",
                "errorCode": 1030,
                "errorMessage": "Unable to open input file"
            }
        });

        let event = validate(&body(value)).unwrap();
        assert_eq!(event.status, TranscodeStatus::Error);
        assert!(event.output_paths.is_empty());
        assert_eq!(event.error_code.as_deref(), Some("1030"));
        assert_eq!(event.error_message.as_deref(), Some("Unable to open input file"));
    }

    #[test]
    fn unknown_status_is_flagged_not_rejected() {
        let value = json!({ "detail": { "status": "PROGRESSING", "jobId": "job-1" } });

        let event = validate(&body(value)).unwrap();
        assert_eq!(event.status, TranscodeStatus::Unhandled("PROGRESSING".to_string()));
    }

    #[test]
    fn epoch_millis_timestamp_is_accepted() {
        let mut value = complete_detail();
        value["detail"]["timestamp"] = json!(1_714_566_600_000i64);

        let event = validate(&body(value)).unwrap();
        assert_eq!(event.timestamp.unwrap().unix_timestamp(), 1_714_566_600);
    }

    #[test]
    fn garbage_timestamp_is_malformed() {
        let mut value = complete_detail();
        value["detail"]["timestamp"] = json!("yesterday");

        assert!(matches!(validate(&body(value)), Err(ValidationError::Malformed(_))));
    }

    #[test]
    fn reads_content_reference_from_user_metadata() {
        let content_id = Uuid::new_v4();
        let mut value = complete_detail();
        value["detail"]["userMetadata"] = json!({
            "contentId": content_id.to_string(),
            "contentType": "episode"
        });

        let event = validate(&body(value)).unwrap();
        assert_eq!(
            event.content,
            Some(ContentRef { kind: ContentKind::Episode, id: content_id })
        );
    }

    #[test]
    fn ignores_unusable_user_metadata() {
        let mut value = complete_detail();
        value["detail"]["userMetadata"] = json!({ "contentId": "not-a-uuid", "contentType": "movie" });

        let event = validate(&body(value)).unwrap();
        assert!(event.content.is_none());
    }
}
