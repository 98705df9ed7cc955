use serde_json::Value;

use crate::foundation::error::{MemecapError, MemecapResult};

/// Recover a JSON value from free-form model output.
///
/// The whole text is tried first. Otherwise the span running from the first
/// opener to the last matching closer is tried, for whichever of `[` / `{`
/// occurs first, then for the other one. Nested or multiple JSON-like spans
/// can mis-extract; that is accepted.
pub fn extract_json(text: &str) -> MemecapResult<Value> {
    let trimmed = text.trim();
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Ok(v);
    }

    let mut openers: Vec<(usize, char)> = [('[', ']'), ('{', '}')]
        .into_iter()
        .filter_map(|(open, close)| trimmed.find(open).map(|at| (at, close)))
        .collect();
    openers.sort_by_key(|(at, _)| *at);

    for (start, close) in openers {
        let Some(end) = trimmed.rfind(close) else {
            continue;
        };
        if end <= start {
            continue;
        }
        if let Ok(v) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
            return Ok(v);
        }
    }

    Err(MemecapError::response_parse(format!(
        "no JSON value found in {} chars of model output",
        text.chars().count()
    )))
}

/// [`extract_json`] followed by typed deserialization.
pub fn extract_as<T: serde::de::DeserializeOwned>(text: &str) -> MemecapResult<T> {
    let value = extract_json(text)?;
    serde_json::from_value(value)
        .map_err(|e| MemecapError::response_parse(format!("unexpected JSON shape: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/assist/extract.rs"]
mod tests;
