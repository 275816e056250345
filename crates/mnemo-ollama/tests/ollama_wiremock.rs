// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama client against a mock HTTP server.

use futures::StreamExt;
use mnemo_config::model::OllamaConfig;
use mnemo_core::types::{ChatMessage, ChatRole, GenerationRequest};
use mnemo_core::GenerationBackend;
use mnemo_ollama::OllamaClient;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OllamaClient {
    OllamaClient::new(&OllamaConfig {
        base_url: server.uri(),
        autostart: false,
        ..OllamaConfig::default()
    })
    .unwrap()
}

fn request() -> GenerationRequest {
    GenerationRequest {
        model: "llama3.2".to_string(),
        messages: vec![
            ChatMessage::new(ChatRole::System, "be brief"),
            ChatMessage::new(ChatRole::User, "hello"),
        ],
        temperature: 0.3,
        context_window: 2048,
    }
}

fn ndjson(lines: &[serde_json::Value]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

#[tokio::test]
async fn probe_and_list_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3.2:latest", "model": "llama3.2:latest", "size": 2147483648u64, "modified_at": "2026-02-01T10:00:00Z"},
                {"name": "qwen3:8b", "size": 5261334937u64}
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.ensure_running().await.unwrap();

    let models = client.list_models().await.unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].name, "llama3.2:latest");
    assert_eq!(models[0].size, "2.0GB");
    assert_eq!(models[0].modified, "2026-02-01T10:00:00Z");
    assert_eq!(models[1].name, "qwen3:8b");
    assert_eq!(models[1].size, "4.9GB");
}

#[tokio::test]
async fn stream_chat_sends_options_and_yields_fragments() {
    let server = MockServer::start().await;
    let body = ndjson(&[
        json!({"message": {"role": "assistant", "content": "<think>"}, "done": false}),
        json!({"message": {"role": "assistant", "content": "hmm</think>"}, "done": false}),
        json!({"message": {"role": "assistant", "content": " Hi!"}, "done": false}),
        json!({"message": {"role": "assistant", "content": ""}, "done": true}),
    ]);
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "stream": true,
            "options": {"num_ctx": 2048},
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let fragments: Vec<String> = client
        .stream_chat(request())
        .await
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
        .await;
    assert_eq!(fragments, vec!["<think>", "hmm</think>", " Hi!"]);
}

#[tokio::test]
async fn http_error_surfaces_ollama_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "model 'llama3.2' not found"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.stream_chat(request()).await.err().unwrap();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn mid_stream_error_is_an_item() {
    let server = MockServer::start().await;
    let body = ndjson(&[
        json!({"message": {"role": "assistant", "content": "partial"}, "done": false}),
        json!({"error": "out of memory"}),
    ]);
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let items: Vec<_> = client.stream_chat(request()).await.unwrap().collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "partial");
    assert!(items[1].as_ref().unwrap_err().to_string().contains("out of memory"));
}

#[tokio::test]
async fn server_error_on_tags_fails_probe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.probe().await.is_err());
    assert!(client.list_models().await.is_err());
}
