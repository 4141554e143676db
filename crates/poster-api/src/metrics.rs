//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "poster_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "poster_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "poster_http_requests_in_flight";

    // Pipeline metrics
    pub const GENERATIONS_TOTAL: &str = "poster_generations_total";
    pub const GENERATION_DURATION_SECONDS: &str = "poster_generation_duration_seconds";
    pub const TEMPLATE_IMAGES_TOTAL: &str = "poster_template_images_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a finished poster generation.
pub fn record_generation(outcome: &str, tone: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string()), ("tone", tone.to_string())];
    counter!(names::GENERATIONS_TOTAL, &labels).increment(1);
    histogram!(names::GENERATION_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an image added to a template gallery.
pub fn record_template_image(source: &str) {
    let labels = [("source", source.to_string())];
    counter!(names::TEMPLATE_IMAGES_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels.
/// Static asset keys are collapsed so each upload does not create a series.
fn sanitize_path(path: &str) -> String {
    if path.starts_with("/uploads/") {
        return "/uploads/:key".to_string();
    }
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
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
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/uploads/generated/550e8400-e29b-41d4-a716-446655440000.png"),
            "/uploads/:key"
        );
        assert_eq!(sanitize_path("/generate-meme"), "/generate-meme");
    }
}
