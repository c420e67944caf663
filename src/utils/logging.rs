//! Logging utilities
//!
//! Subscriber setup and helpers that keep prompts out of the logs at full length

use crate::config::settings::LoggingConfig;
use tracing::info;

/// Maximum number of prompt characters written to a log line
pub const PROMPT_PREVIEW_CHARS: usize = 80;

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` syntax is honored, so `info,promptprint=debug` works as expected.
pub fn init_logging(config: &LoggingConfig) {
    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if config.format == "json" {
        // JSON format logs (production environment)
        Box::new(tracing_subscriber::fmt()
            .with_env_filter(config.level.as_str())
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .finish())
    } else {
        // Human readable format (development environment)
        Box::new(tracing_subscriber::fmt()
            .with_env_filter(config.level.as_str())
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish())
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already installed (tests, embedding applications)
        return;
    }

    info!("Logging system initialized");
}

/// Truncate a string with a note about original length
pub fn truncate_content(s: &str, max_chars: usize) -> String {
    let total = s.chars().count();
    if total > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}... ({} chars truncated)", head, total - max_chars)
    } else {
        s.to_string()
    }
}

/// Prompt preview for log lines
pub fn prompt_preview(prompt: &str) -> String {
    truncate_content(prompt, PROMPT_PREVIEW_CHARS)
}
