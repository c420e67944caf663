//! Error handling module
//!
//! Failure taxonomy of the service and its mapping onto HTTP responses

use crate::models::ErrorBody;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or incomplete request; the message is shown as-is
    #[error("{0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Tokenizer backend could not be loaded; cached for the process lifetime
    #[error("Tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),

    /// A single tokenization call failed
    #[error("Tokenize call failed: {0}")]
    TokenizeCallFailed(String),

    /// A model's upstream request failed
    #[error("Gateway call to {model} failed: {reason}")]
    GatewayCallFailed { model: String, reason: String },

    /// Provider credential or base URL absent from the environment
    #[error("Missing credential: {0} is not set")]
    MissingCredential(String),

    #[error("Service temporarily unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::TokenizerUnavailable(_)
            | AppError::TokenizeCallFailed(_)
            | AppError::GatewayCallFailed { .. }
            | AppError::MissingCredential(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Category used in log lines
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "invalid_request_error",
            AppError::NotFound(_) => "not_found_error",
            AppError::TokenizerUnavailable(_) | AppError::TokenizeCallFailed(_) => "tokenizer_error",
            AppError::GatewayCallFailed { .. } | AppError::MissingCredential(_) => "gateway_error",
            AppError::ServiceUnavailable(_) => "overloaded_error",
            AppError::Internal(_) => "api_error",
        }
    }

    /// Message exposed to HTTP clients; upstream causes stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::TokenizerUnavailable(_) => "Failed to initialize tokenizer".to_string(),
            AppError::TokenizeCallFailed(_) => "Failed to tokenize text".to_string(),
            AppError::GatewayCallFailed { .. } | AppError::MissingCredential(_) => {
                "Failed to process request".to_string()
            }
            AppError::ServiceUnavailable(_) => "Service temporarily unavailable".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Client mistakes are logged at warn without detail
    pub fn should_log_details(&self) -> bool {
        !matches!(self, AppError::Validation(_) | AppError::NotFound(_))
    }

    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.public_message(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.should_log_details() {
            tracing::error!("Request failed: {} ({}) - Status code: {}", self, self.error_type(), status);
        } else {
            tracing::warn!("Rejected request: {} ({}) - Status code: {}", self, self.error_type(), status);
        }

        (status, Json(self.to_error_body())).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Constructors for the common variants
pub mod helpers {
    use super::*;

    pub fn validation_error(message: impl Into<String>) -> AppError {
        AppError::Validation(message.into())
    }

    pub fn not_found_error(message: impl Into<String>) -> AppError {
        AppError::NotFound(message.into())
    }

    pub fn gateway_error(model: impl Into<String>, reason: impl std::fmt::Display) -> AppError {
        AppError::GatewayCallFailed {
            model: model.into(),
            reason: reason.to_string(),
        }
    }
}

/// Attach tokenizer context to foreign errors
pub trait ErrorContext<T> {
    fn tokenize_context(self, message: &str) -> AppResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn tokenize_context(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::TokenizeCallFailed(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer_failures_are_server_errors() {
        let unavailable = AppError::TokenizerUnavailable("vocabulary missing".to_string());
        let call_failed = AppError::TokenizeCallFailed("socket closed".to_string());

        assert_eq!(unavailable.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(call_failed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(unavailable.error_type(), "tokenizer_error");
    }

    #[test]
    fn test_public_messages_hide_causes() {
        let err = helpers::gateway_error("Mistral", "connection refused");
        assert_eq!(err.public_message(), "Failed to process request");
        assert!(err.to_string().contains("connection refused"));

        assert_eq!(
            AppError::TokenizerUnavailable("no vocab".to_string()).public_message(),
            "Failed to initialize tokenizer"
        );
    }

    #[test]
    fn test_tokenize_context() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "peer reset",
        ));

        match result.tokenize_context("Failed to reach tokenizer") {
            Err(AppError::TokenizeCallFailed(msg)) => {
                assert_eq!(msg, "Failed to reach tokenizer: peer reset");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
