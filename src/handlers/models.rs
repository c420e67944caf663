//! Catalog endpoint

use crate::config::AppConfig;
use crate::handlers::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// GET /api/models
///
/// Coefficients, routes and tokenizer hints of every model, plus the carbon
/// intensity and equivalency factors the estimates use.
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<AppConfig> {
    Json(state.catalog.clone())
}
