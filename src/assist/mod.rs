//! Client-side caption assistant.
//!
//! Free-form chat calls whose replies go through best-effort JSON extraction
//! ([`extract::extract_json`]). Any upstream or parse failure degrades to a
//! fixed local generator; the outcome says which source produced the value.

/// Best-effort JSON recovery from free-form model replies.
pub mod extract;
pub mod fallback;

use serde::Deserialize;

use crate::{
    foundation::error::{MemecapError, MemecapResult},
    gateway::upstream::{ChatRequest, Upstream},
    model::template::InlineImage,
};

const IDEAS_SYSTEM: &str = "You suggest meme captions. Reply with a JSON array of objects \
`{\"templateId\": string, \"caption\": string}`, one per template listed.";

const HELP_SYSTEM: &str = "You help someone improve a meme caption. Reply with a JSON array \
of up to three short alternative captions.";

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// A caption proposed for one template.
pub struct MemeIdea {
    /// Template the caption belongs to.
    pub template_id: String,
    /// Caption text.
    pub caption: String,
}

#[derive(Clone, Debug, PartialEq)]
/// Template context handed to the assistant.
pub struct TemplateHint {
    /// Catalog id.
    pub template_id: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional image, attached to the request when present.
    pub image: Option<InlineImage>,
}

impl TemplateHint {
    /// Text-only hint.
    pub fn new(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            description: None,
            image: None,
        }
    }

    fn label(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => format!("{}: {d}", self.template_id),
            _ => self.template_id.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Where an assistant value came from.
pub enum AssistSource {
    /// Parsed from the upstream reply.
    Upstream,
    /// Produced locally after a failure.
    Fallback {
        /// Description of the failure that triggered the fallback.
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
/// An assistant result plus its provenance.
pub struct AssistOutcome<T> {
    /// The ideas or suggestions.
    pub value: T,
    /// Which path produced `value`.
    pub source: AssistSource,
}

impl<T> AssistOutcome<T> {
    /// Whether the local generator was used.
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, AssistSource::Fallback { .. })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdeasReply {
    List(Vec<MemeIdea>),
    Wrapped { ideas: Vec<MemeIdea> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SuggestionsReply {
    List(Vec<String>),
    Wrapped { suggestions: Vec<String> },
}

/// Caption assistant over any [`Upstream`].
#[derive(Debug)]
pub struct CaptionAssistant<U> {
    upstream: U,
}

impl<U: Upstream> CaptionAssistant<U> {
    /// Wrap an upstream client.
    pub fn new(upstream: U) -> Self {
        Self { upstream }
    }

    /// Propose one caption per template.
    ///
    /// Only an empty topic or template list is an error; everything else
    /// resolves to upstream ideas or the local fallback.
    #[tracing::instrument(skip_all, fields(templates = templates.len()))]
    pub async fn generate_memes_ai(
        &self,
        topic: &str,
        templates: &[TemplateHint],
    ) -> MemecapResult<AssistOutcome<Vec<MemeIdea>>> {
        if topic.trim().is_empty() {
            return Err(MemecapError::validation("topic must be non-empty"));
        }
        if templates.is_empty() {
            return Err(MemecapError::validation("templates must be non-empty"));
        }

        let mut chat = ChatRequest::new(IDEAS_SYSTEM).text(format!("Topic: {}", topic.trim()));
        for t in templates {
            chat = chat.text(format!("Template {}", t.label()));
            if let Some(img) = &t.image {
                chat = chat.image(img.clone());
            }
        }

        let result = self
            .upstream
            .complete(chat)
            .await
            .and_then(|text| extract::extract_as::<IdeasReply>(&text))
            .and_then(|reply| usable_ideas(reply, templates));
        Ok(match result {
            Ok(value) => AssistOutcome {
                value,
                source: AssistSource::Upstream,
            },
            Err(err) => {
                tracing::warn!(error = %err, "caption ideas fell back to local generator");
                AssistOutcome {
                    value: fallback::fallback_ideas(topic, templates),
                    source: AssistSource::Fallback {
                        reason: err.to_string(),
                    },
                }
            }
        })
    }

    /// Suggest rewrites of a draft caption.
    #[tracing::instrument(skip_all, fields(template = %template.template_id))]
    pub async fn ask_ai_for_help(
        &self,
        topic: &str,
        template: &TemplateHint,
        draft: &str,
    ) -> MemecapResult<AssistOutcome<Vec<String>>> {
        if topic.trim().is_empty() {
            return Err(MemecapError::validation("topic must be non-empty"));
        }

        let mut chat = ChatRequest::new(HELP_SYSTEM)
            .text(format!("Topic: {}", topic.trim()))
            .text(format!("Template {}", template.label()))
            .text(format!("Draft: {}", draft.trim()));
        if let Some(img) = &template.image {
            chat = chat.image(img.clone());
        }

        let result = self
            .upstream
            .complete(chat)
            .await
            .and_then(|text| extract::extract_as::<SuggestionsReply>(&text))
            .and_then(usable_suggestions);
        Ok(match result {
            Ok(value) => AssistOutcome {
                value,
                source: AssistSource::Upstream,
            },
            Err(err) => {
                tracing::warn!(error = %err, "caption help fell back to local generator");
                AssistOutcome {
                    value: fallback::fallback_suggestions(topic, draft),
                    source: AssistSource::Fallback {
                        reason: err.to_string(),
                    },
                }
            }
        })
    }
}

/// Keep ideas for offered templates with non-blank captions.
fn usable_ideas(reply: IdeasReply, templates: &[TemplateHint]) -> MemecapResult<Vec<MemeIdea>> {
    let ideas = match reply {
        IdeasReply::List(v) | IdeasReply::Wrapped { ideas: v } => v,
    };
    let kept: Vec<MemeIdea> = ideas
        .into_iter()
        .filter(|i| templates.iter().any(|t| t.template_id == i.template_id))
        .map(|i| MemeIdea {
            caption: i.caption.trim().to_string(),
            ..i
        })
        .filter(|i| !i.caption.is_empty())
        .collect();
    if kept.is_empty() {
        return Err(MemecapError::response_parse(
            "reply contained no ideas for the offered templates",
        ));
    }
    Ok(kept)
}

fn usable_suggestions(reply: SuggestionsReply) -> MemecapResult<Vec<String>> {
    let list = match reply {
        SuggestionsReply::List(v) | SuggestionsReply::Wrapped { suggestions: v } => v,
    };
    let kept: Vec<String> = list
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if kept.is_empty() {
        return Err(MemecapError::response_parse("reply contained no suggestions"));
    }
    Ok(kept)
}

#[cfg(test)]
#[path = "../../tests/unit/assist/mod.rs"]
mod tests;
