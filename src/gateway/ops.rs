use serde_json::json;

use crate::{
    foundation::error::{MemecapError, MemecapResult},
    gateway::{
        types::{
            GenerateCaptionsRequest, GenerateCaptionsResponse, RefineCaptionRequest,
            RefineCaptionResponse, SelectTemplateRequest, SelectTemplateResponse,
        },
        upstream::{ChatRequest, Upstream},
    },
    model::template::IDEAS_PER_TEMPLATE,
};

const SELECT_SYSTEM: &str = "You pick the meme template that best fits a topic. \
Answer with the id of exactly one of the offered templates.";

const GENERATE_SYSTEM: &str = "You write short, funny meme captions for a given template image \
and topic. Produce exactly three distinct captions.";

const REFINE_SYSTEM: &str = "You combine a person's three draft meme captions into one improved \
caption for the given template image and topic. Keep their voice and keep it short.";

/// Caption-assist operations, each a single upstream round trip.
///
/// Every operation validates its input before calling the upstream and
/// checks the upstream payload against the declared response shape before
/// returning; a partially shaped result is never surfaced.
#[derive(Debug)]
pub struct Gateway<U> {
    upstream: U,
}

impl<U: Upstream> Gateway<U> {
    /// Wrap an upstream client.
    pub fn new(upstream: U) -> Self {
        Self { upstream }
    }

    /// The wrapped upstream.
    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    /// Ask the model which offered template suits `topic`.
    #[tracing::instrument(skip_all, fields(templates = req.templates.len()))]
    pub async fn select_template(
        &self,
        req: &SelectTemplateRequest,
    ) -> MemecapResult<SelectTemplateResponse> {
        req.validate()?;

        let ids: Vec<&str> = req.templates.iter().map(|t| t.template_id.as_str()).collect();
        let mut chat = ChatRequest::new(SELECT_SYSTEM)
            .text(format!("Topic: {}", req.topic.trim()))
            .with_schema(
                "template_selection",
                json!({
                    "type": "object",
                    "properties": {
                        "selectedTemplateId": { "type": "string", "enum": ids },
                    },
                    "required": ["selectedTemplateId"],
                    "additionalProperties": false,
                }),
            );
        for t in &req.templates {
            let label = match t.description.as_deref().map(str::trim) {
                Some(d) if !d.is_empty() => format!("Template id: {} ({d})", t.template_id),
                _ => format!("Template id: {}", t.template_id),
            };
            chat = chat.text(label).image(t.image());
        }

        let content = self.upstream.complete(chat).await?;
        let resp: SelectTemplateResponse = parse_shaped(&content)?;
        if !ids.contains(&resp.selected_template_id.as_str()) {
            return Err(MemecapError::malformed(format!(
                "selected template '{}' was not offered",
                resp.selected_template_id
            )));
        }
        tracing::debug!(selected = %resp.selected_template_id, "template selected");
        Ok(resp)
    }

    /// Ask the model for three captions for one template.
    #[tracing::instrument(skip_all)]
    pub async fn generate_captions(
        &self,
        req: &GenerateCaptionsRequest,
    ) -> MemecapResult<GenerateCaptionsResponse> {
        req.validate()?;

        let chat = ChatRequest::new(GENERATE_SYSTEM)
            .text(topic_line(&req.topic, req.template_description.as_deref()))
            .image(req.template_image.clone())
            .with_schema(
                "caption_ideas",
                json!({
                    "type": "object",
                    "properties": {
                        "aiCaptions": {
                            "type": "array",
                            "items": { "type": "string" },
                            "minItems": IDEAS_PER_TEMPLATE,
                            "maxItems": IDEAS_PER_TEMPLATE,
                        },
                    },
                    "required": ["aiCaptions"],
                    "additionalProperties": false,
                }),
            );

        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            ai_captions: Vec<String>,
        }

        let content = self.upstream.complete(chat).await?;
        let payload: Payload = parse_shaped(&content)?;
        let got = payload.ai_captions.len();
        let captions: [String; IDEAS_PER_TEMPLATE] = payload
            .ai_captions
            .into_iter()
            .map(|c| c.trim().to_string())
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|_| {
                MemecapError::malformed(format!(
                    "expected {IDEAS_PER_TEMPLATE} captions, got {got}"
                ))
            })?;
        if captions.iter().any(|c| c.is_empty()) {
            return Err(MemecapError::malformed("upstream returned an empty caption"));
        }
        Ok(GenerateCaptionsResponse {
            ai_captions: captions,
        })
    }

    /// Ask the model to merge the participant's three captions into one.
    #[tracing::instrument(skip_all)]
    pub async fn refine_caption(
        &self,
        req: &RefineCaptionRequest,
    ) -> MemecapResult<RefineCaptionResponse> {
        req.validate()?;

        let mut drafts = String::from("Draft captions:");
        for (i, c) in req.human_captions.iter().enumerate() {
            drafts.push_str(&format!("\n{}. {}", i + 1, c.trim()));
        }
        let chat = ChatRequest::new(REFINE_SYSTEM)
            .text(topic_line(&req.topic, req.template_description.as_deref()))
            .text(drafts)
            .image(req.template_image.clone())
            .with_schema(
                "refined_caption",
                json!({
                    "type": "object",
                    "properties": { "finalCaption": { "type": "string" } },
                    "required": ["finalCaption"],
                    "additionalProperties": false,
                }),
            );

        let content = self.upstream.complete(chat).await?;
        let resp: RefineCaptionResponse = parse_shaped(&content)?;
        let final_caption = resp.final_caption.trim().to_string();
        if final_caption.is_empty() {
            return Err(MemecapError::malformed("upstream returned an empty caption"));
        }
        Ok(RefineCaptionResponse { final_caption })
    }
}

fn topic_line(topic: &str, description: Option<&str>) -> String {
    match description.map(str::trim) {
        Some(d) if !d.is_empty() => format!("Topic: {}\nTemplate: {d}", topic.trim()),
        _ => format!("Topic: {}", topic.trim()),
    }
}

/// Structured-output content must deserialize exactly into `T`.
fn parse_shaped<T: serde::de::DeserializeOwned>(content: &str) -> MemecapResult<T> {
    serde_json::from_str(content.trim())
        .map_err(|e| MemecapError::malformed(format!("unexpected response shape: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/gateway/ops.rs"]
mod tests;
