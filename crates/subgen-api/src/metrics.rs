//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "subgen_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "subgen_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "subgen_http_requests_in_flight";

    pub const UPLOADS_TOTAL: &str = "subgen_uploads_total";
    pub const TRANSCRIPTION_DURATION_SECONDS: &str = "subgen_transcription_duration_seconds";
}

/// Final state of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Accepted,
    Rejected,
    Failed,
}

impl UploadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadOutcome::Accepted => "accepted",
            UploadOutcome::Rejected => "rejected",
            UploadOutcome::Failed => "failed",
        }
    }
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record how an upload ended.
pub fn record_upload(outcome: UploadOutcome) {
    let labels = [("outcome", outcome.as_str().to_string())];
    counter!(names::UPLOADS_TOTAL, &labels).increment(1);
}

/// Record transcription engine wall time, successful or not.
pub fn record_transcription_duration(success: bool, duration_secs: f64) {
    let labels = [("success", success.to_string())];
    histogram!(names::TRANSCRIPTION_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    // Route templates keep label cardinality bounded.
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_outcome_labels() {
        assert_eq!(UploadOutcome::Accepted.as_str(), "accepted");
        assert_eq!(UploadOutcome::Rejected.as_str(), "rejected");
        assert_eq!(UploadOutcome::Failed.as_str(), "failed");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_upload(UploadOutcome::Accepted);
        record_transcription_duration(true, 1.5);
        record_http_request("POST", "/upload-video", 200, 0.2);
    }
}
