//! Model gateway tests against mocked upstream providers

use async_trait::async_trait;
use httpmock::prelude::*;
use promptprint::config::settings::ProviderCredentials;
use promptprint::config::{AppConfig, Settings};
use promptprint::services::{invoke_all, Gateway, ModelGateway};
use promptprint::utils::error::{helpers::gateway_error, AppError, AppResult};
use serde_json::json;
use std::time::Duration;

fn credentials(server: &MockServer) -> ProviderCredentials {
    let mut credentials = Settings::default().providers;
    credentials.replicate_api_token = Some("r8_test".to_string());
    credentials.replicate_base_url = server.base_url();
    credentials.replicate_poll_interval_ms = 10;
    credentials.openai_api_key = Some("sk-test".to_string());
    credentials.deepseek_api_base = Some(server.url("/v1"));
    credentials
}

fn create_gateway(server: &MockServer) -> ModelGateway {
    ModelGateway::new(AppConfig::builtin(), &credentials(server)).unwrap()
}

#[tokio::test]
async fn test_replicate_prediction_is_polled_until_done() {
    let server = MockServer::start_async().await;

    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/models/meta/llama-2-7b-chat/predictions")
                .header("Prefer", "wait")
                .json_body_partial(r#"{"input": {"prompt": "Hi", "max_new_tokens": 800, "temperature": 0.75}}"#);
            then.status(201).json_body(json!({
                "id": "p-42",
                "status": "processing",
                "output": null,
                "urls": { "get": server.url("/predictions/p-42") }
            }));
        })
        .await;

    let poll = server
        .mock_async(|when, then| {
            when.method(GET).path("/predictions/p-42");
            then.status(200).json_body(json!({
                "id": "p-42",
                "status": "succeeded",
                "output": ["Hello", " there"]
            }));
        })
        .await;

    let gateway = create_gateway(&server);
    let output = gateway.generate("Llama 2", "Hi").await.unwrap();

    create.assert_async().await;
    poll.assert_async().await;
    assert_eq!(output, "Hello there");
}

#[tokio::test]
async fn test_replicate_failed_prediction_is_a_call_failure() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/models/deepseek-ai/deepseek-r1/predictions");
            then.status(201).json_body(json!({
                "id": "p-7",
                "status": "failed",
                "error": "CUDA out of memory"
            }));
        })
        .await;

    let gateway = create_gateway(&server);
    let err = gateway.generate("DeepSeek", "Hi").await.unwrap_err();

    match err {
        AppError::GatewayCallFailed { model, reason } => {
            assert_eq!(model, "DeepSeek");
            assert!(reason.contains("CUDA out of memory"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_chat_completion() {
    let server = MockServer::start_async().await;

    let completion = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test")
                .json_body_partial(
                    r#"{
                        "model": "deepseek-ai/DeepSeek-R1",
                        "stream": false,
                        "messages": [
                            { "role": "system", "content": "You are a helpful assistant." },
                            { "role": "user", "content": "Hi" }
                        ]
                    }"#,
                );
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Hello!" } }]
            }));
        })
        .await;

    let gateway = create_gateway(&server);
    let output = gateway.generate("Sundai R1", "Hi").await.unwrap();

    completion.assert_async().await;
    assert_eq!(output, "Hello!");
}

#[tokio::test]
async fn test_openai_error_is_a_call_failure() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).json_body(json!({
                "error": { "message": "Rate limit reached", "type": "rate_limit_error" }
            }));
        })
        .await;

    let gateway = create_gateway(&server);
    let err = gateway.generate("Sundai R1", "Hi").await.unwrap_err();

    assert!(matches!(err, AppError::GatewayCallFailed { .. }));
    assert!(err.to_string().contains("Rate limit reached"));
    assert_eq!(err.public_message(), "Failed to process request");
}

#[tokio::test]
async fn test_invoke_all_settles_every_call() {
    let server = MockServer::start_async().await;

    // Only Mistral and the chat model answer; the other routes fall through to 404
    server
        .mock_async(|when, then| {
            when.method(POST).path("/models/mistralai/mistral-7b-v0.1/predictions");
            then.status(201).json_body(json!({ "id": "m", "status": "succeeded", "output": "ok" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .json_body(json!({ "choices": [{ "message": { "content": "ok" } }] }));
        })
        .await;

    let gateway = create_gateway(&server);
    let model_ids = gateway.model_ids();
    let failed = invoke_all(&gateway, &model_ids, "Hi").await;

    assert_eq!(failed, vec!["Llama 3", "DeepSeek", "Llama 2"]);
}

#[tokio::test]
async fn test_missing_credentials_fail_each_call() {
    let gateway = ModelGateway::new(AppConfig::builtin(), &Settings::default().providers).unwrap();

    let model_ids = gateway.model_ids();
    let failed = invoke_all(&gateway, &model_ids, "Hi").await;

    assert_eq!(failed, model_ids);
}

#[tokio::test]
async fn test_unknown_model_is_not_found() {
    let gateway = ModelGateway::new(AppConfig::builtin(), &Settings::default().providers).unwrap();

    let err = gateway.generate("GPT-9", "Hi").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

/// Each model answers after its own delay; models listed in `failing` error out
struct DelayedGateway {
    delays: Vec<(String, Duration)>,
    failing: Vec<String>,
}

#[async_trait]
impl Gateway for DelayedGateway {
    fn model_ids(&self) -> Vec<String> {
        self.delays.iter().map(|(id, _)| id.clone()).collect()
    }

    async fn invoke(&self, model_id: &str, _prompt: &str) -> AppResult<()> {
        let delay = self
            .delays
            .iter()
            .find(|(id, _)| id == model_id)
            .map(|(_, delay)| *delay)
            .unwrap_or_default();
        tokio::time::sleep(delay).await;

        if self.failing.iter().any(|id| id == model_id) {
            return Err(gateway_error(model_id, "upstream returned 500"));
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_invoke_all_is_bounded_by_slowest_call() {
    let gateway = DelayedGateway {
        delays: vec![
            ("Llama 2".to_string(), Duration::from_secs(1)),
            ("Llama 3".to_string(), Duration::from_secs(2)),
            ("Mistral".to_string(), Duration::from_secs(3)),
        ],
        failing: vec!["Llama 2".to_string()],
    };
    let model_ids = gateway.model_ids();

    let started = tokio::time::Instant::now();
    let failed = invoke_all(&gateway, &model_ids, "Hi").await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(3), "returned before the slowest call: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(4), "calls ran one after another: {:?}", elapsed);
    assert_eq!(failed, vec!["Llama 2".to_string()]);
}
