//! Integration tests for `GeminiClient` using wiremock HTTP mocks.

use std::sync::{Arc, Mutex};

use tkpro_core::{BatchStatus, Product};
use tkpro_generate::gemini::DEFAULT_MODEL;
use tkpro_generate::{
    latest_headline, BatchPipeline, GeminiClient, GenerationClient, GenerationError,
    MemoryResultStore, HEADLINE_UNAVAILABLE, NO_HEADLINE,
};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STREAM_PATH: &str = "/v1beta/models/gemini-3-flash-preview:streamGenerateContent";
const UNARY_PATH: &str = "/v1beta/models/gemini-3-flash-preview:generateContent";

fn test_client(base_url: &str) -> GeminiClient {
    GeminiClient::with_base_url(Some("test-key"), DEFAULT_MODEL, 5, base_url)
        .expect("client construction should not fail")
}

fn sse_body(pieces: &[&str]) -> String {
    pieces
        .iter()
        .map(|text| {
            let event = serde_json::json!({
                "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
            });
            format!("data: {event}\r\n\r\n")
        })
        .collect()
}

fn sse_response(pieces: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse_body(pieces), "text/event-stream")
}

#[tokio::test]
async fn stream_text_concatenates_events_and_reports_partials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": "write a title" }] }],
            "generationConfig": { "temperature": 0.5 }
        })))
        .respond_with(sse_response(&["Galaxy ", "Lamp", " ✨"]))
        .expect(1)
        .mount(&server)
        .await;

    let partials = Mutex::new(Vec::new());
    let sink = |text: &str| partials.lock().unwrap().push(text.to_owned());

    let text = test_client(&server.uri())
        .stream_text("write a title", 0.5, Some(&sink))
        .await
        .expect("stream should succeed");

    assert_eq!(text, "Galaxy Lamp ✨");
    assert_eq!(
        *partials.lock().unwrap(),
        vec!["Galaxy ", "Galaxy Lamp", "Galaxy Lamp ✨"]
    );
}

#[tokio::test]
async fn api_error_carries_provider_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .generate_text("hello", 0.7)
        .await
        .unwrap_err();

    match err {
        GenerationError::Api { status, message } => {
            assert_eq!(status, 400);
            assert!(message.starts_with("API key not valid"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn api_error_without_json_body_uses_status_reason() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .generate_text("hello", 0.7)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GenerationError::Api { status: 503, ref message } if message == "Service Unavailable"
    ));
}

#[tokio::test]
async fn empty_stream_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(sse_response(&[]))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .generate_structured("hello", 0.7)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::EmptyResponse));
}

#[tokio::test]
async fn missing_key_sends_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = GeminiClient::with_base_url(None, DEFAULT_MODEL, 5, &server.uri()).unwrap();
    let err = client.generate_text("hello", 0.7).await.unwrap_err();

    assert!(matches!(err, GenerationError::MissingCredential));
}

#[tokio::test]
async fn search_text_enables_search_tool() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UNARY_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "tools": [{ "google_search": {} }],
            "generationConfig": { "temperature": 0.3 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": " 东南亚电商大促开启 \n" }] }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let headline = latest_headline(&client, "36Kr", "TikTok Shop").await.unwrap();

    assert_eq!(headline, "东南亚电商大促开启");
}

#[tokio::test]
async fn headline_without_candidates_uses_placeholder() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UNARY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let headline = latest_headline(&client, "36Kr", "TikTok Shop").await.unwrap();

    assert_eq!(headline, NO_HEADLINE);
}

#[tokio::test]
async fn headline_failure_uses_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UNARY_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let headline = latest_headline(&client, "36Kr", "TikTok Shop").await.unwrap();

    assert_eq!(headline, HEADLINE_UNAVAILABLE);
}

#[tokio::test]
async fn pipeline_runs_against_streaming_endpoint() {
    let server = MockServer::start().await;

    let content = serde_json::json!({
        "title_en": "Galaxy Projector ✨",
        "title_zh": "星空投影灯 ✨",
        "description_en": "Turn any room into a night sky.",
        "description_zh": "一秒把卧室变成星空。",
        "script_en": "Scene 1 (0-3s): lights off.",
        "script_zh": "镜头1 (0-3s)：关灯。"
    })
    .to_string();
    let mid = content.find("\"description_en\"").unwrap();
    let (head, tail) = content.split_at(mid);
    let first = format!("```json\n{head}");
    let second = format!("{tail}\n```");

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(sse_response(&[&first, &second]))
        .expect(2)
        .mount(&server)
        .await;

    let products = vec![
        Product::new("p-0", "Galaxy Projector", 24.99, 12_500.0),
        Product::new("p-1", "Shapewear", 18.5, 8_900.0),
    ];
    let store = Arc::new(MemoryResultStore::default());
    let pipeline = BatchPipeline::open(
        Arc::new(test_client(&server.uri())),
        store.clone(),
        &products,
    )
    .await
    .unwrap();

    let summary = pipeline.run_batch().await.unwrap();

    assert_eq!(summary.completed, 2);
    let saved = store.get("p-0").unwrap();
    assert_eq!(saved.status(), BatchStatus::Completed);
    assert_eq!(saved.content_zh().unwrap().title, "星空投影灯 ✨");
}
