//! Session handlers
//!
//! Thin HTTP surface over the session orchestrator

use crate::handlers::{json_body, AppState};
use crate::models::{SessionInput, SubmitResponse};
use crate::services::Snapshot;
use crate::utils::error::AppResult;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

/// GET /api/session
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(state.orchestrator.snapshot())
}

/// POST /api/session/input
///
/// Records the edit and answers with the state right after it; the token
/// count follows once the debounce window closes.
pub async fn handle_input(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SessionInput>, JsonRejection>,
) -> AppResult<Json<Snapshot>> {
    let input = json_body(body, "Text must be a string")?;
    let snapshot = state.orchestrator.input(input.text).await?;
    Ok(Json(snapshot))
}

/// POST /api/session/submit
pub async fn handle_submit(State(state): State<Arc<AppState>>) -> AppResult<Json<SubmitResponse>> {
    let submitted = state.orchestrator.submit().await?;
    Ok(Json(submitted))
}
