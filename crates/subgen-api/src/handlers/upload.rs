//! Video upload and subtitle generation.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use tracing::Instrument;
use uuid::Uuid;

use subgen_media::{Artifact, ArtifactKind};
use subgen_models::classify;

use crate::error::{ApiError, ApiResult};
use crate::logging::{RequestLogger, Stage};
use crate::metrics::{self, UploadOutcome};
use crate::middleware::RequestId;
use crate::state::AppState;

/// Multipart field carrying the video.
pub const FILE_FIELD: &str = "file";

/// File part read from the multipart body.
#[derive(Debug)]
struct UploadedVideo {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

/// Accept a video and respond with its SRT subtitles.
///
/// POST /upload-video
pub async fn upload_video(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let request_id = request_id
        .map(|Extension(id)| id.0)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let log = RequestLogger::new(request_id, "upload_video");
    let span = log.create_span();

    async move {
        let result = process_upload(&state, multipart, &log).await;

        match &result {
            Ok(_) => metrics::record_upload(UploadOutcome::Accepted),
            Err(e) if e.status_code().is_client_error() => {
                log.stage(Stage::Rejected, &e.to_string());
                metrics::record_upload(UploadOutcome::Rejected);
            }
            Err(e) => {
                log.stage(Stage::Failed, &e.to_string());
                metrics::record_upload(UploadOutcome::Failed);
            }
        }

        result
    }
    .instrument(span)
    .await
}

async fn process_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
    log: &RequestLogger,
) -> ApiResult<Response> {
    let mut multipart = multipart.map_err(|rejection| ApiError::Multipart {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;

    let UploadedVideo {
        filename,
        content_type,
        bytes,
    } = read_video_field(&mut multipart)
        .await?
        .ok_or(ApiError::MissingFile)?;

    log.stage(
        Stage::Received,
        &format!(
            "Received {} ({} bytes, content type {})",
            filename.as_deref().unwrap_or("<unnamed>"),
            bytes.len(),
            content_type.as_deref().unwrap_or("<none>"),
        ),
    );

    let format = classify(content_type.as_deref(), filename.as_deref())
        .ok_or(ApiError::InvalidFileType)?;
    log.stage(Stage::Validated, &format!("Accepted as {}", format.extension()));

    let video = state.store.persist(&bytes, format.extension()).await?;
    drop(bytes);
    log.stage(
        Stage::Persisted,
        &format!("Saved upload to {}", video.path().display()),
    );

    let started = Instant::now();
    let generated = state.generator.generate(&video).await;
    metrics::record_transcription_duration(generated.is_ok(), started.elapsed().as_secs_f64());

    release(state, video, log).await;
    let subtitles = generated?;
    log.stage(
        Stage::Transcribed,
        &format!(
            "Subtitles generated in {}ms",
            started.elapsed().as_millis()
        ),
    );

    let body = subtitles.read().await;
    release(state, subtitles, log).await;
    let body = body?;

    log.stage(
        Stage::Responded,
        &format!("Returning {} bytes of subtitles", body.len()),
    );

    let disposition = format!(
        "attachment; filename=\"{}\"",
        subtitle_filename(filename.as_deref())
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Read the first `file` field, skipping any others.
async fn read_video_field(multipart: &mut Multipart) -> ApiResult<Option<UploadedVideo>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        return Ok(Some(UploadedVideo {
            filename,
            content_type,
            bytes,
        }));
    }

    Ok(None)
}

async fn release<K: ArtifactKind>(state: &AppState, artifact: Artifact<K>, log: &RequestLogger) {
    let path = artifact.path().to_path_buf();
    if let Err(e) = state.store.release(artifact).await {
        log.warning(&format!(
            "Failed to remove {} artifact {}: {}",
            K::LABEL,
            path.display(),
            e
        ));
    }
}

/// Download name for the subtitles of `upload_name`: the upload's stem with
/// an `.srt` extension, restricted to characters safe in a header.
pub fn subtitle_filename(upload_name: Option<&str>) -> String {
    let base = upload_name
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .unwrap_or_default();
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim() {
        "" => "subtitles.srt".to_string(),
        stem => format!("{stem}.srt"),
    }
}
