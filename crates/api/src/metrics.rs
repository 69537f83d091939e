//! Prometheus recorder setup, request metrics and business counters.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_RESPONSE_TIME_SECONDS: &str = "http_response_time_seconds";
pub const PICKUP_POINTS_CREATED: &str = "pickup_points_created_total";
pub const RECEPTIONS_CREATED: &str = "order_acceptances_created_total";
pub const PRODUCTS_ADDED: &str = "products_added_total";

const RESPONSE_TIME_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0];

/// Installs the global Prometheus recorder.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_RESPONSE_TIME_SECONDS.to_string()),
            RESPONSE_TIME_BUCKETS,
        )?
        .install_recorder()
}

/// Sink for business events, called by handlers after a successful operation.
pub trait BusinessMetrics: Send + Sync {
    fn increment_counter(&self, name: &'static str);
}

/// Forwards business counters to the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl BusinessMetrics for PrometheusMetrics {
    fn increment_counter(&self, name: &'static str) {
        metrics::counter!(name).increment(1);
    }
}

/// Records request count and latency per matched route.
pub async fn track_http(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(HTTP_RESPONSE_TIME_SECONDS, "method" => method, "path" => path)
        .record(elapsed);

    response
}

/// GET /metrics: Prometheus text exposition.
pub async fn render(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
