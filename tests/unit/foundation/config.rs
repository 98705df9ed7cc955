use super::*;

#[test]
fn empty_document_yields_defaults() {
    let cfg = AppConfig::from_toml_str("").unwrap();
    assert_eq!(cfg, AppConfig::default());
    assert_eq!(cfg.compositor.default_output_width, DEFAULT_OUTPUT_WIDTH);
    assert_eq!(cfg.compositor.font_families[0], "Impact");
}

#[test]
fn partial_sections_keep_other_defaults() {
    let cfg = AppConfig::from_toml_str(
        r#"
[compositor]
default_output_width = 800

[upstream]
model = "local-vision"
"#,
    )
    .unwrap();
    assert_eq!(cfg.compositor.default_output_width, 800);
    assert_eq!(cfg.upstream.model, "local-vision");
    assert_eq!(cfg.upstream.api_key_env, "OPENAI_API_KEY");
    assert_eq!(cfg.gateway.bind, "127.0.0.1:8787");
}

#[test]
fn invalid_toml_is_a_serde_error() {
    let err = AppConfig::from_toml_str("compositor = 3").unwrap_err();
    assert!(matches!(err, MemecapError::Serde(_)));
}

#[test]
fn zero_width_fails_validation() {
    let mut cfg = AppConfig::default();
    cfg.compositor.default_output_width = 0;
    assert!(matches!(cfg.validate(), Err(MemecapError::Validation(_))));
}
