//! Integration tests for the OpenAI-compatible translator against a mock server.
//!
//! Each test stands up a `mockito` server and checks that one provider
//! response maps onto the expected result or failure class.

use babel_abstraction::{InferenceClient, InferenceError, InferenceRequest};
use babel_models::OpenAiTranslator;
use std::time::Duration;

fn translator(server: &mockito::ServerGuard) -> OpenAiTranslator {
    OpenAiTranslator::with_api_key("gpt-4o-mini".to_string(), "test-key".to_string())
        .with_base_url(server.url())
}

#[tokio::test]
async fn test_successful_translation() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "model": "gpt-4o-mini-2024-07-18",
                "choices": [{"message": {"role": "assistant", "content": " おはようございます \n"}}],
                "usage": {"prompt_tokens": 30, "completion_tokens": 6, "total_tokens": 36}
            }"#,
        )
        .create_async()
        .await;

    let result = translator(&server)
        .invoke(&InferenceRequest::new("Good morning", "ja").with_source("en"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.output, "おはようございます");
    assert_eq!(result.provider_metadata.model_id.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    assert_eq!(result.provider_metadata.usage.map(|u| u.total_tokens), Some(36));
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_header("retry-after", "4")
        .with_body(r#"{"error": {"message": "Rate limit reached"}}"#)
        .create_async()
        .await;

    let err = translator(&server).invoke(&InferenceRequest::new("Hello", "fr")).await.unwrap_err();
    assert_eq!(err, InferenceError::RateLimited { retry_after: Some(Duration::from_secs(4)) });
}

#[tokio::test]
async fn test_unauthorized_is_auth_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error": {"message": "Incorrect API key provided"}}"#)
        .create_async()
        .await;

    let err = translator(&server).invoke(&InferenceRequest::new("Hello", "fr")).await.unwrap_err();
    assert!(matches!(err, InferenceError::AuthFailure(ref msg) if msg.contains("Incorrect API key")));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_server_error_is_service_unavailable() {
    let mut server = mockito::Server::new_async().await;
    server.mock("POST", "/chat/completions").with_status(503).create_async().await;

    let err = translator(&server).invoke(&InferenceRequest::new("Hello", "fr")).await.unwrap_err();
    assert!(matches!(err, InferenceError::ServiceUnavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_bad_request_is_malformed_input() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(400)
        .with_body(r#"{"error": {"message": "maximum context length exceeded"}}"#)
        .create_async()
        .await;

    let err = translator(&server).invoke(&InferenceRequest::new("Hello", "fr")).await.unwrap_err();
    assert!(matches!(err, InferenceError::MalformedInput(_)));
}

#[tokio::test]
async fn test_empty_choices_is_unknown() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices": []}"#)
        .create_async()
        .await;

    let err = translator(&server).invoke(&InferenceRequest::new("Hello", "fr")).await.unwrap_err();
    assert!(matches!(err, InferenceError::Unknown(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_network_failure() {
    // Nothing listens on port 9 (discard) on test machines.
    let translator = OpenAiTranslator::with_api_key("m".to_string(), "k".to_string())
        .with_base_url("http://127.0.0.1:9")
        .with_timeout(Duration::from_secs(2));

    let err = translator.invoke(&InferenceRequest::new("Hello", "fr")).await.unwrap_err();
    assert!(matches!(err, InferenceError::NetworkFailure(_)), "got {err:?}");
}
