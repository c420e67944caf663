//! Tokenizer endpoint
//!
//! POST /api/tokenize counts with the local encoding and reports its failures
//! instead of falling back.

use crate::handlers::{json_body, AppState};
use crate::models::{TokenizeRequest, TokenizeResponse};
use crate::services::TokenCounter;
use crate::utils::error::{helpers::validation_error, AppResult};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;
use tracing::debug;

const TEXT_REQUIRED: &str = "Text is required";

pub async fn handle_tokenize(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TokenizeRequest>, JsonRejection>,
) -> AppResult<Json<TokenizeResponse>> {
    let request = json_body(body, TEXT_REQUIRED)?;

    let text = match request.text {
        Some(text) if !text.is_empty() => text,
        _ => return Err(validation_error(TEXT_REQUIRED)),
    };

    let token_count = state.local_tokenizer.count(&text).await?;
    debug!("Tokenized {} chars into {} tokens", text.chars().count(), token_count);

    Ok(Json(TokenizeResponse { token_count }))
}
