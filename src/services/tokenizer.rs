//! Tokenizer service
//!
//! Counts prompt tokens through a pluggable backend and falls back to a
//! deterministic word/character heuristic whenever the backend fails.
//!
//! The local backend loads a BPE encoding lazily through [`TokenizerCell`]:
//! one load attempt per process, success or failure cached from then on.

use crate::models::{ErrorBody, TokenizeRequest, TokenizeResponse};
use crate::utils::error::{AppError, AppResult, ErrorContext};
use crate::utils::logging::prompt_preview;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Heuristic token count: whitespace-separated words plus a quarter of the characters
///
/// Words are the non-empty runs between whitespace, so leading or trailing
/// whitespace adds no word of its own (`" hi"` is one word, not two).
/// Characters are Unicode scalar values.
pub fn fallback_estimate(text: &str) -> usize {
    text.split_whitespace().count() + text.chars().count() / 4
}

/// Backend capable of counting tokens
#[async_trait]
pub trait TokenCounter: Send + Sync {
    /// Backend name used in logs
    fn name(&self) -> &str;

    /// Count the tokens of non-empty text
    async fn count(&self, text: &str) -> AppResult<usize>;
}

/// A loaded encoding
pub trait Encoder: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Produces an [`Encoder`]; called at most once per [`TokenizerCell`]
#[async_trait]
pub trait EncoderLoader: Send + Sync {
    fn describe(&self) -> String;

    async fn load(&self) -> anyhow::Result<Arc<dyn Encoder>>;
}

/// Lifecycle of a [`TokenizerCell`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerState {
    Uninitialized,
    Ready,
    Failed,
}

/// Single-attempt initialization guard for an encoder
///
/// Concurrent first callers wait on the same load; a failed load is cached and
/// reported as [`AppError::TokenizerUnavailable`] without being retried.
pub struct TokenizerCell {
    loader: Arc<dyn EncoderLoader>,
    slot: OnceCell<Result<Arc<dyn Encoder>, String>>,
}

impl TokenizerCell {
    pub fn new(loader: Arc<dyn EncoderLoader>) -> Self {
        Self {
            loader,
            slot: OnceCell::new(),
        }
    }

    pub fn state(&self) -> TokenizerState {
        match self.slot.get() {
            None => TokenizerState::Uninitialized,
            Some(Ok(_)) => TokenizerState::Ready,
            Some(Err(_)) => TokenizerState::Failed,
        }
    }

    /// Get the encoder, loading it on first use
    pub async fn get_or_init(&self) -> AppResult<Arc<dyn Encoder>> {
        let slot = self
            .slot
            .get_or_init(|| async {
                let description = self.loader.describe();
                match self.loader.load().await {
                    Ok(encoder) => {
                        info!("Tokenizer {} loaded", description);
                        Ok(encoder)
                    }
                    Err(e) => {
                        warn!("Failed to initialize tokenizer {}: {:#}", description, e);
                        Err(format!("{:#}", e))
                    }
                }
            })
            .await;

        match slot {
            Ok(encoder) => Ok(encoder.clone()),
            Err(reason) => Err(AppError::TokenizerUnavailable(reason.clone())),
        }
    }
}

/// tiktoken byte-pair encoding
struct BpeEncoder {
    bpe: tiktoken_rs::CoreBPE,
}

impl Encoder for BpeEncoder {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Loads a named tiktoken encoding
#[derive(Debug, Clone)]
pub struct BpeLoader {
    encoding: String,
}

impl BpeLoader {
    pub fn new(encoding: impl Into<String>) -> Self {
        Self {
            encoding: encoding.into(),
        }
    }
}

#[async_trait]
impl EncoderLoader for BpeLoader {
    fn describe(&self) -> String {
        format!("bpe:{}", self.encoding)
    }

    async fn load(&self) -> anyhow::Result<Arc<dyn Encoder>> {
        let encoding = self.encoding.clone();

        let bpe = tokio::task::spawn_blocking(move || match encoding.as_str() {
            // GPT-2 uses the r50k vocabulary
            "gpt2" | "r50k_base" => tiktoken_rs::r50k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            other => Err(anyhow::anyhow!("Unknown encoding: {}", other)),
        })
        .await??;

        Ok(Arc::new(BpeEncoder { bpe }))
    }
}

/// In-process tokenizer backed by a lazily loaded encoder
pub struct LocalTokenizer {
    cell: TokenizerCell,
}

impl LocalTokenizer {
    pub fn new(loader: Arc<dyn EncoderLoader>) -> Self {
        Self {
            cell: TokenizerCell::new(loader),
        }
    }

    /// Local backend for a tiktoken encoding name
    pub fn bpe(encoding: &str) -> Self {
        Self::new(Arc::new(BpeLoader::new(encoding)))
    }

    pub fn state(&self) -> TokenizerState {
        self.cell.state()
    }
}

#[async_trait]
impl TokenCounter for LocalTokenizer {
    fn name(&self) -> &str {
        "local"
    }

    async fn count(&self, text: &str) -> AppResult<usize> {
        let encoder = self.cell.get_or_init().await?;
        let text = text.to_string();

        tokio::task::spawn_blocking(move || encoder.count_tokens(&text))
            .await
            .tokenize_context("Tokenization task failed")
    }
}

/// Tokenizer reached over HTTP (`POST {text}` → `{token_count}`)
#[derive(Debug, Clone)]
pub struct RemoteTokenizer {
    client: Client,
    url: String,
}

impl RemoteTokenizer {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("promptprint/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TokenCounter for RemoteTokenizer {
    fn name(&self) -> &str {
        "remote"
    }

    async fn count(&self, text: &str) -> AppResult<usize> {
        let request = TokenizeRequest {
            text: Some(text.to_string()),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .tokenize_context("Failed to reach tokenizer")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorBody>(&error_text)
                .map(|body| body.error)
                .unwrap_or(error_text);
            return Err(AppError::TokenizeCallFailed(format!("{} - {}", status, reason)));
        }

        let body: TokenizeResponse = response
            .json()
            .await
            .tokenize_context("Failed to parse tokenizer response")?;

        Ok(body.token_count)
    }
}

/// Token counting with fallback
#[derive(Clone)]
pub struct TokenizerService {
    counter: Arc<dyn TokenCounter>,
}

impl TokenizerService {
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self { counter }
    }

    pub fn backend(&self) -> &str {
        self.counter.name()
    }

    /// Count tokens; never fails
    ///
    /// Blank text counts as zero without touching the backend. Any backend
    /// error degrades to [`fallback_estimate`] for this call only.
    pub async fn tokenize(&self, text: &str) -> usize {
        if text.trim().is_empty() {
            return 0;
        }

        match self.counter.count(text).await {
            Ok(count) => {
                debug!("Counted {} tokens with {} tokenizer", count, self.counter.name());
                count
            }
            Err(e) => {
                let estimate = fallback_estimate(text);
                warn!(
                    "Tokenizer {} failed ({}), using heuristic estimate {} for '{}'",
                    self.counter.name(),
                    e,
                    estimate,
                    prompt_preview(text)
                );
                estimate
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct WordEncoder;

    impl Encoder for WordEncoder {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    struct CountingLoader {
        attempts: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EncoderLoader for CountingLoader {
        fn describe(&self) -> String {
            "counting".to_string()
        }

        async fn load(&self) -> anyhow::Result<Arc<dyn Encoder>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail {
                anyhow::bail!("vocabulary missing");
            }
            Ok(Arc::new(WordEncoder))
        }
    }

    fn loader(fail: bool) -> Arc<CountingLoader> {
        Arc::new(CountingLoader {
            attempts: AtomicUsize::new(0),
            fail,
        })
    }

    #[test]
    fn test_fallback_estimate() {
        assert_eq!(fallback_estimate("Hello world"), 4);
        assert_eq!(fallback_estimate(""), 0);
        assert_eq!(fallback_estimate("one  two\tthree\n"), 3 + 15 / 4);
    }

    #[test]
    fn test_fallback_ignores_edge_whitespace() {
        assert_eq!(fallback_estimate(" hi"), 1);
        assert_eq!(fallback_estimate("  hi there  "), 2 + 12 / 4);
        assert_eq!(fallback_estimate("héllo wörld"), 2 + 11 / 4);
    }

    #[tokio::test]
    async fn test_cell_initializes_once_under_concurrency() {
        let loader = loader(false);
        let cell = Arc::new(TokenizerCell::new(loader.clone()));
        assert_eq!(cell.state(), TokenizerState::Uninitialized);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                tokio::spawn(async move { cell.get_or_init().await.is_ok() })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap());
        }

        assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(cell.state(), TokenizerState::Ready);
    }

    #[tokio::test]
    async fn test_cell_caches_failure() {
        let loader = loader(true);
        let cell = TokenizerCell::new(loader.clone());

        for _ in 0..3 {
            let err = cell.get_or_init().await.err().unwrap();
            assert!(matches!(err, AppError::TokenizerUnavailable(_)));
        }

        assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(cell.state(), TokenizerState::Failed);
    }

    #[tokio::test]
    async fn test_service_falls_back_when_unavailable() {
        let service = TokenizerService::new(Arc::new(LocalTokenizer::new(loader(true))));
        assert_eq!(service.tokenize("Hello world").await, 4);
        assert_eq!(service.tokenize("Hello world").await, 4);
    }

    #[tokio::test]
    async fn test_service_blank_input_skips_backend() {
        let loader = loader(false);
        let local = Arc::new(LocalTokenizer::new(loader.clone()));
        let service = TokenizerService::new(local.clone());

        assert_eq!(service.tokenize("").await, 0);
        assert_eq!(service.tokenize("  \n\t ").await, 0);
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 0);
        assert_eq!(local.state(), TokenizerState::Uninitialized);
    }

    #[tokio::test]
    async fn test_service_uses_backend_when_ready() {
        let service = TokenizerService::new(Arc::new(LocalTokenizer::new(loader(false))));
        assert_eq!(service.tokenize("a b c d e").await, 5);
        assert_eq!(service.backend(), "local");
    }

    #[tokio::test]
    async fn test_unknown_encoding_is_unavailable() {
        let local = LocalTokenizer::bpe("no-such-encoding");
        let err = local.count("hello").await.unwrap_err();
        assert!(matches!(err, AppError::TokenizerUnavailable(_)));
        assert_eq!(local.state(), TokenizerState::Failed);
    }
}
