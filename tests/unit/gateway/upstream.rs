use super::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png() -> InlineImage {
    InlineImage {
        base64: "iVBORw0KGgo=".to_string(),
        mime_type: "image/png".to_string(),
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "cmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

#[test]
fn body_carries_system_user_parts_and_schema() {
    let req = ChatRequest::new("be brief")
        .text("topic: exams")
        .image(png())
        .with_schema("captions", json!({ "type": "object" }));
    let body = req.to_openai_body("test-model");

    assert_eq!(body["model"], "test-model");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "be brief");
    let content = &body["messages"][1]["content"];
    assert_eq!(content[0]["type"], "text");
    assert_eq!(
        content[1]["image_url"]["url"],
        "data:image/png;base64,iVBORw0KGgo="
    );
    assert_eq!(body["response_format"]["type"], "json_schema");
    assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    assert_eq!(req.image_count(), 1);
}

#[test]
fn free_form_body_has_no_response_format() {
    let body = ChatRequest::new("s").text("u").to_openai_body("m");
    assert!(body.get("response_format").is_none());
}

#[test]
fn error_message_prefers_provider_message() {
    assert_eq!(
        error_message(r#"{"error":{"message":"quota exceeded"}}"#),
        "quota exceeded"
    );
    assert_eq!(error_message("  plain failure "), "plain failure");
    assert!(error_message(&"x".repeat(2000)).ends_with("..."));
}

#[tokio::test]
async fn returns_first_choice_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"ok\":true}")))
        .expect(1)
        .mount(&server)
        .await;

    let upstream =
        OpenAiUpstream::new(&format!("{}/v1/", server.uri()), "m", Some("sk-test".into()), 5)
            .unwrap();
    assert!(upstream.endpoint().ends_with("/v1/chat/completions"));
    let out = upstream
        .complete(ChatRequest::new("s").text("u"))
        .await
        .unwrap();
    assert_eq!(out, "{\"ok\":true}");
}

#[tokio::test]
async fn non_success_status_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "error": { "message": "slow down" } })),
        )
        .mount(&server)
        .await;

    let upstream = OpenAiUpstream::new(&server.uri(), "m", Some("k".into()), 5).unwrap();
    let err = upstream
        .complete(ChatRequest::new("s").text("u"))
        .await
        .unwrap_err();
    match err {
        MemecapError::Upstream { status, message } => {
            assert_eq!(status, Some(429));
            assert_eq!(message, "slow down");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_content_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let upstream = OpenAiUpstream::new(&server.uri(), "m", Some("k".into()), 5).unwrap();
    let err = upstream
        .complete(ChatRequest::new("s").text("u"))
        .await
        .unwrap_err();
    assert!(matches!(err, MemecapError::MalformedResponse(_)));
}

#[tokio::test]
async fn missing_key_fails_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("x")))
        .expect(0)
        .mount(&server)
        .await;

    let upstream = OpenAiUpstream::new(&server.uri(), "m", None, 5).unwrap();
    let err = upstream
        .complete(ChatRequest::new("s").text("u"))
        .await
        .unwrap_err();
    assert!(matches!(err, MemecapError::Upstream { status: None, .. }));
}
