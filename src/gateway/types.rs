//! JSON request/response shapes shared by the HTTP surface and the library API.

use crate::{
    foundation::error::{MemecapError, MemecapResult},
    model::template::{IDEAS_PER_TEMPLATE, InlineImage},
};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// One template offered to `select-template`.
pub struct TemplateCandidate {
    /// Catalog id echoed back by the model.
    pub template_id: String,
    /// Base64 image payload.
    pub image_base64: String,
    /// MIME type of the payload.
    pub mime_type: String,
    /// Optional human description of the template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TemplateCandidate {
    /// Image payload as an [`InlineImage`].
    pub fn image(&self) -> InlineImage {
        InlineImage {
            base64: self.image_base64.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Body of `POST /select-template`.
pub struct SelectTemplateRequest {
    /// Study topic.
    pub topic: String,
    /// Candidate templates (at least one).
    pub templates: Vec<TemplateCandidate>,
}

impl SelectTemplateRequest {
    /// Input contract checked before any upstream call.
    pub fn validate(&self) -> MemecapResult<()> {
        require_topic(&self.topic)?;
        if self.templates.is_empty() {
            return Err(MemecapError::validation("templates must be non-empty"));
        }
        let mut seen = std::collections::HashSet::new();
        for (i, t) in self.templates.iter().enumerate() {
            if t.template_id.trim().is_empty() {
                return Err(MemecapError::validation(format!(
                    "templates[{i}].templateId must be non-empty"
                )));
            }
            if !seen.insert(t.template_id.as_str()) {
                return Err(MemecapError::validation(format!(
                    "duplicate templateId '{}'",
                    t.template_id
                )));
            }
            t.image().validate(&format!("templates[{i}]"))?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Success body of `POST /select-template`.
pub struct SelectTemplateResponse {
    /// Id of the chosen template.
    pub selected_template_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Body of `POST /generate-captions`.
pub struct GenerateCaptionsRequest {
    /// Study topic.
    pub topic: String,
    /// Template image.
    pub template_image: InlineImage,
    /// Optional template description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_description: Option<String>,
}

impl GenerateCaptionsRequest {
    /// Input contract checked before any upstream call.
    pub fn validate(&self) -> MemecapResult<()> {
        require_topic(&self.topic)?;
        self.template_image.validate("templateImage")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Success body of `POST /generate-captions`.
pub struct GenerateCaptionsResponse {
    /// Exactly three AI captions.
    pub ai_captions: [String; IDEAS_PER_TEMPLATE],
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Body of `POST /refine-caption`.
pub struct RefineCaptionRequest {
    /// Study topic.
    pub topic: String,
    /// Template image.
    pub template_image: InlineImage,
    /// Optional template description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_description: Option<String>,
    /// The participant's three captions.
    pub human_captions: Vec<String>,
}

impl RefineCaptionRequest {
    /// Input contract checked before any upstream call.
    pub fn validate(&self) -> MemecapResult<()> {
        require_topic(&self.topic)?;
        self.template_image.validate("templateImage")?;
        if self.human_captions.len() != IDEAS_PER_TEMPLATE {
            return Err(MemecapError::validation(format!(
                "humanCaptions must have exactly {IDEAS_PER_TEMPLATE} entries, got {}",
                self.human_captions.len()
            )));
        }
        if let Some(i) = self.human_captions.iter().position(|c| c.trim().is_empty()) {
            return Err(MemecapError::validation(format!(
                "humanCaptions[{i}] must be non-empty"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Success body of `POST /refine-caption`.
pub struct RefineCaptionResponse {
    /// Refined caption, trimmed.
    pub final_caption: String,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Body of every non-200 gateway response.
pub struct ErrorBody {
    /// Human-readable failure description.
    pub error: String,
}

fn require_topic(topic: &str) -> MemecapResult<()> {
    if topic.trim().is_empty() {
        return Err(MemecapError::validation("topic must be non-empty"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/gateway/types.rs"]
mod tests;
