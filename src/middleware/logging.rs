//! Request logging middleware

use crate::handlers::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, Uri},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Submissions wait on every upstream model, so only flag really long requests
const SLOW_REQUEST: Duration = Duration::from_secs(30);

/// Wrap each request in an `http_request` span with a fresh id.
/// Model proxy routes also carry the catalog model id.
pub async fn request_logging_middleware(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let model = state
        .catalog
        .model_by_route(uri.path())
        .map(|entry| entry.id.as_str())
        .unwrap_or("-");

    let span = tracing::info_span!(
        "http_request",
        request_id = %Uuid::new_v4(),
        method = %method,
        path = %uri.path(),
        model = %model,
    );

    async move {
        let started = Instant::now();
        let agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        info!("{} {} from {}", method, uri, agent);

        let response = next.run(request).await;

        let elapsed = started.elapsed();
        let status = response.status();
        let millis = elapsed.as_secs_f64() * 1000.0;

        match status.as_u16() {
            500.. => warn!(%status, "Server error after {:.2}ms", millis),
            400..=499 => warn!(%status, "Client error after {:.2}ms", millis),
            _ => info!(%status, "Completed in {:.2}ms", millis),
        }

        if elapsed > SLOW_REQUEST {
            warn!("Slow request: {} {} took {:.2}s", method, uri, elapsed.as_secs_f64());
        }

        response
    }
    .instrument(span)
    .await
}
