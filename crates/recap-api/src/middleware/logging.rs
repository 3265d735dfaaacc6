use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Logs one line per request with its duration, escalating server errors to `warn`
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let started = Instant::now();

    let response = next.run(req).await;
    let status = response.status().as_u16();
    let duration_ms = started.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        tracing::warn!(%method, %uri, status, duration_ms, "Request failed");
    } else {
        tracing::info!(%method, %uri, status, duration_ms, "Request handled");
    }

    response
}
