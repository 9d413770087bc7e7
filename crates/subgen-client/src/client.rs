//! HTTP client for the upload endpoint.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use tracing::{debug, info, warn};

use subgen_models::video_type::guess_mime;
use subgen_models::ErrorDetail;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, UNKNOWN_ERROR};

/// Multipart field the server reads the video from.
const FILE_FIELD: &str = "file";

/// Client for the subtitle upload endpoint. Requests are never retried.
#[derive(Debug, Clone)]
pub struct IngestionClient {
    http: Client,
    endpoint: String,
}

impl IngestionClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(ClientError::config("upload endpoint is empty"));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Upload `video` as `filename` and return the subtitle bytes.
    pub async fn upload(&self, video: &Path, filename: &str) -> ClientResult<Vec<u8>> {
        let file = tokio::fs::File::open(video).await?;
        let length = file.metadata().await?.len();

        let mut part =
            Part::stream_with_length(Body::from(file), length).file_name(filename.to_string());
        if let Some(mime) = guess_mime(filename) {
            part = part.mime_str(mime)?;
        }
        let form = Form::new().part(FILE_FIELD, part);

        info!(endpoint = %self.endpoint, filename, bytes = length, "Uploading video");

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let message = error_detail(&body);
            warn!(status = status.as_u16(), detail = %message, "Upload rejected");
            return Err(ClientError::Transport {
                status: Some(status.as_u16()),
                message,
            });
        }

        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), "Received subtitles");
        Ok(bytes.to_vec())
    }
}

/// The server's `detail` field, or a generic message for non-JSON bodies.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorDetail>(body)
        .map(|e| e.detail)
        .unwrap_or_else(|_| UNKNOWN_ERROR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_from_json() {
        assert_eq!(
            error_detail(r#"{"detail":"Failed to generate subtitles."}"#),
            "Failed to generate subtitles."
        );
    }

    #[test]
    fn test_error_detail_fallback() {
        assert_eq!(error_detail("<html>Bad Gateway</html>"), UNKNOWN_ERROR);
        assert_eq!(error_detail(""), UNKNOWN_ERROR);
        assert_eq!(error_detail(r#"{"error":"nope"}"#), UNKNOWN_ERROR);
    }

    #[test]
    fn test_empty_endpoint_is_config_error() {
        let config = ClientConfig::default().with_endpoint("  ");
        assert!(matches!(
            IngestionClient::new(&config),
            Err(ClientError::Config(_))
        ));
    }
}
