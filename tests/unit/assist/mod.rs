use super::*;
use crate::gateway::fake::FakeUpstream;

fn hints() -> Vec<TemplateHint> {
    vec![TemplateHint::new("t1"), TemplateHint::new("t2")]
}

#[tokio::test]
async fn ideas_are_extracted_from_prose() {
    let assistant = CaptionAssistant::new(FakeUpstream::text(
        r#"Here you go: [{"templateId":"t1","caption":"x"}] thanks"#,
    ));
    let out = assistant.generate_memes_ai("exams", &hints()).await.unwrap();
    assert_eq!(out.source, AssistSource::Upstream);
    assert_eq!(
        out.value,
        vec![MemeIdea {
            template_id: "t1".into(),
            caption: "x".into()
        }]
    );
}

#[tokio::test]
async fn wrapped_ideas_drop_unknown_templates() {
    let assistant = CaptionAssistant::new(FakeUpstream::text(
        r#"{"ideas":[{"templateId":"zz","caption":"a"},{"templateId":"t2","caption":" b "}]}"#,
    ));
    let out = assistant.generate_memes_ai("exams", &hints()).await.unwrap();
    assert!(!out.is_fallback());
    assert_eq!(out.value.len(), 1);
    assert_eq!(out.value[0].caption, "b");
}

#[tokio::test]
async fn upstream_failure_falls_back_with_reason() {
    let assistant = CaptionAssistant::new(FakeUpstream::status(500));
    let out = assistant.generate_memes_ai("exams", &hints()).await.unwrap();
    match &out.source {
        AssistSource::Fallback { reason } => assert!(reason.contains("status 500")),
        other => panic!("expected fallback, got {other:?}"),
    }
    assert_eq!(out.value.len(), 2);
    assert_eq!(out.value[1].template_id, "t2");
    assert!(out.value.iter().all(|i| i.caption.contains("exams")));
}

#[tokio::test]
async fn unparseable_reply_falls_back() {
    let assistant = CaptionAssistant::new(FakeUpstream::text("I cannot do that."));
    let out = assistant.generate_memes_ai("exams", &hints()).await.unwrap();
    match out.source {
        AssistSource::Fallback { reason } => assert!(reason.starts_with("response parse error")),
        other => panic!("expected fallback, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_topic_is_validation_without_call() {
    let assistant = CaptionAssistant::new(FakeUpstream::text("[]"));
    assert!(matches!(
        assistant.generate_memes_ai(" ", &hints()).await,
        Err(MemecapError::Validation(_))
    ));
    assert!(matches!(
        assistant.generate_memes_ai("exams", &[]).await,
        Err(MemecapError::Validation(_))
    ));
    assert_eq!(assistant.upstream.calls(), 0);
}

#[tokio::test]
async fn help_returns_suggestions_or_fallback() {
    let hint = TemplateHint {
        template_id: "t1".into(),
        description: Some("distracted boyfriend".into()),
        image: None,
    };
    let assistant =
        CaptionAssistant::new(FakeUpstream::text(r#"Sure! ["shorter one", "  ", "punchier"]"#));
    let out = assistant
        .ask_ai_for_help("exams", &hint, "my draft")
        .await
        .unwrap();
    assert_eq!(out.value, vec!["shorter one", "punchier"]);
    let sent = assistant.upstream.last_request().unwrap();
    assert!(sent.parts.iter().any(|p| matches!(
        p,
        crate::gateway::upstream::ChatPart::Text(t) if t == "Template t1: distracted boyfriend"
    )));

    let failing = CaptionAssistant::new(FakeUpstream::text("[]"));
    let out = failing.ask_ai_for_help("exams", &hint, "my draft").await.unwrap();
    assert!(out.is_fallback());
    assert_eq!(out.value.len(), 3);
    assert!(out.value.iter().any(|s| s.contains("my draft")));
}
