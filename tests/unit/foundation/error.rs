use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        MemecapError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        MemecapError::image_load("x")
            .to_string()
            .contains("image load error:")
    );
    assert!(
        MemecapError::unsupported("x")
            .to_string()
            .contains("unsupported environment:")
    );
    assert!(
        MemecapError::malformed("x")
            .to_string()
            .contains("malformed response:")
    );
    assert!(
        MemecapError::response_parse("x")
            .to_string()
            .contains("response parse error:")
    );
    assert!(
        MemecapError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn upstream_display_includes_status_when_known() {
    let with = MemecapError::upstream(Some(503), "busy").to_string();
    assert_eq!(with, "upstream error (status 503): busy");

    let without = MemecapError::upstream(None, "connection refused").to_string();
    assert_eq!(without, "upstream error: connection refused");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = MemecapError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn client_errors_are_classified() {
    assert!(MemecapError::validation("x").is_client_error());
    assert!(!MemecapError::malformed("x").is_client_error());
    assert!(!MemecapError::upstream(Some(500), "x").is_client_error());
}
