//! Chat-completion upstream: a provider-neutral request type, the [`Upstream`]
//! seam, and the OpenAI-compatible HTTP implementation.

use std::{future::Future, time::Duration};

use serde_json::{Value, json};

use crate::{
    foundation::{
        config::UpstreamConfig,
        error::{MemecapError, MemecapResult},
    },
    model::template::InlineImage,
};

/// Longest slice of an upstream error body carried into error messages.
const ERROR_BODY_SNIPPET: usize = 512;

#[derive(Clone, Debug, PartialEq)]
/// One piece of the user turn.
pub enum ChatPart {
    /// Plain text.
    Text(String),
    /// Inline image, sent as a `data:` URL.
    Image(InlineImage),
}

#[derive(Clone, Debug, PartialEq)]
/// JSON schema the upstream is asked to conform to.
pub struct ResponseSchema {
    /// Schema name reported to the provider.
    pub name: &'static str,
    /// JSON Schema document.
    pub schema: Value,
}

#[derive(Clone, Debug, PartialEq)]
/// A single-turn chat completion request.
pub struct ChatRequest {
    /// System instruction.
    pub system: String,
    /// User turn content, in order.
    pub parts: Vec<ChatPart>,
    /// Structured-output schema; `None` asks for free-form text.
    pub schema: Option<ResponseSchema>,
}

impl ChatRequest {
    /// Start a request with a system instruction and no user content.
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            parts: Vec::new(),
            schema: None,
        }
    }

    /// Append a text part.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(ChatPart::Text(text.into()));
        self
    }

    /// Append an image part.
    pub fn image(mut self, image: InlineImage) -> Self {
        self.parts.push(ChatPart::Image(image));
        self
    }

    /// Require a strict JSON schema response.
    pub fn with_schema(mut self, name: &'static str, schema: Value) -> Self {
        self.schema = Some(ResponseSchema { name, schema });
        self
    }

    /// Number of image parts.
    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, ChatPart::Image(_)))
            .count()
    }

    /// Provider wire body for `POST /chat/completions`.
    pub fn to_openai_body(&self, model: &str) -> Value {
        let content: Vec<Value> = self
            .parts
            .iter()
            .map(|part| match part {
                ChatPart::Text(text) => json!({ "type": "text", "text": text }),
                ChatPart::Image(img) => json!({
                    "type": "image_url",
                    "image_url": { "url": img.data_url() },
                }),
            })
            .collect();
        let mut body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": self.system },
                { "role": "user", "content": content },
            ],
        });
        if let Some(schema) = &self.schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "strict": true,
                    "schema": schema.schema,
                },
            });
        }
        body
    }
}

/// Anything that can answer a [`ChatRequest`] with the assistant's text.
pub trait Upstream: Send + Sync {
    /// Run the completion and return the first choice's message content.
    fn complete(&self, request: ChatRequest) -> impl Future<Output = MemecapResult<String>> + Send;
}

#[derive(serde::Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(serde::Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone, Debug)]
/// OpenAI-compatible chat-completion client.
pub struct OpenAiUpstream {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiUpstream {
    /// Build a client from configuration, reading the key from the environment.
    pub fn from_config(cfg: &UpstreamConfig) -> MemecapResult<Self> {
        Self::new(&cfg.base_url, &cfg.model, cfg.api_key(), cfg.timeout_secs)
    }

    /// Build a client for `base_url` (without `/chat/completions`).
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> MemecapResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|e| MemecapError::unsupported(format!("http client: {e}")))?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        })
    }

    /// Full completions URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Upstream for OpenAiUpstream {
    #[tracing::instrument(skip_all, fields(model = %self.model, images = request.image_count()))]
    async fn complete(&self, request: ChatRequest) -> MemecapResult<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(MemecapError::upstream(None, "no API key configured"));
        };
        let body = request.to_openai_body(&self.model);
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MemecapError::upstream(None, format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| MemecapError::upstream(Some(status.as_u16()), format!("read body: {e}")))?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "upstream returned an error status");
            return Err(MemecapError::upstream(
                Some(status.as_u16()),
                error_message(&text),
            ));
        }

        let completion: Completion = serde_json::from_str(&text)
            .map_err(|e| MemecapError::malformed(format!("completion body: {e}")))?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| MemecapError::malformed("completion has no message content"))
    }
}

/// Prefer the provider's `error.message`, else a bounded slice of the body.
fn error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body)
        && let Some(msg) = v.pointer("/error/message").and_then(Value::as_str)
    {
        return msg.to_string();
    }
    truncate(body.trim(), ERROR_BODY_SNIPPET)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
#[path = "../../tests/unit/gateway/upstream.rs"]
mod tests;
