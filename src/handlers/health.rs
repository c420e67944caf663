//! Health check handlers
//!
//! Provides application health status check endpoints

use crate::handlers::AppState;
use crate::services::TokenizerState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service name
    pub service: String,
    /// Version information
    pub version: String,
    /// Timestamp
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthDetails {
    /// Number of catalog models
    pub models: usize,
    /// Local tokenizer lifecycle: uninitialized, ready or failed
    pub tokenizer: String,
    pub uptime_seconds: u64,
    /// Resident memory in bytes (Linux only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_rss_bytes: Option<u64>,
}

fn tokenizer_status(state: TokenizerState) -> &'static str {
    match state {
        TokenizerState::Uninitialized => "uninitialized",
        TokenizerState::Ready => "ready",
        TokenizerState::Failed => "failed",
    }
}

fn response(status: &str, details: Option<HealthDetails>) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        service: crate::NAME.to_string(),
        version: crate::VERSION.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details,
    }
}

/// Basic health check
///
/// GET /health
///
/// A failed tokenizer does not make the service unhealthy; counts fall back
/// to the heuristic.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Executing health check");

    let details = HealthDetails {
        models: state.catalog.models.len(),
        tokenizer: tokenizer_status(state.local_tokenizer.state()).to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        memory_rss_bytes: memory_rss_bytes(),
    };

    Json(response("healthy", Some(details)))
}

/// Liveness check
///
/// GET /health/live
pub async fn liveness_check() -> Json<HealthResponse> {
    Json(response("alive", None))
}

/// Read VmRSS from /proc/self/status
fn memory_rss_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        status
            .lines()
            .find(|line| line.starts_with("VmRSS:"))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|kb| kb.parse::<u64>().ok())
            .map(|kb| kb * 1024)
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
