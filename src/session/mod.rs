//! Study session state: one participant working through a topic.

pub mod submit;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
    foundation::error::{MemecapError, MemecapResult},
    model::{
        layer::LayerSet,
        template::{IdeaSet, Template},
    },
};

#[derive(Clone, Debug, Default, PartialEq)]
/// Ideas and the editable layers for one template.
pub struct TemplateWork {
    /// Three caption ideas plus the preferred index.
    pub ideas: IdeaSet,
    /// Layers whose locked layer mirrors the preferred idea.
    pub layers: LayerSet,
}

#[derive(Debug)]
/// Explicit per-participant session context.
///
/// Created with [`StudySession::begin`] and closed with
/// [`StudySession::finish`]; nothing is held globally.
pub struct StudySession {
    participant_id: String,
    session_id: String,
    topic: String,
    templates: Vec<Template>,
    work: BTreeMap<String, TemplateWork>,
    started_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
/// What a finished session produced.
pub struct SessionSummary {
    /// Participant identifier.
    pub participant_id: String,
    /// Session identifier.
    pub session_id: String,
    /// Study topic.
    pub topic: String,
    /// Templates with a complete idea set.
    pub completed_templates: Vec<String>,
    /// Start timestamp.
    pub started_at: DateTime<Utc>,
    /// End timestamp.
    pub finished_at: DateTime<Utc>,
}

impl StudySession {
    /// Open a session. Ids and topic must be non-blank; templates must have
    /// unique ids.
    pub fn begin(
        participant_id: impl Into<String>,
        session_id: impl Into<String>,
        topic: impl Into<String>,
        templates: Vec<Template>,
    ) -> MemecapResult<Self> {
        let participant_id = participant_id.into();
        let session_id = session_id.into();
        let topic = topic.into();
        for (name, value) in [
            ("participant id", &participant_id),
            ("session id", &session_id),
            ("topic", &topic),
        ] {
            if value.trim().is_empty() {
                return Err(MemecapError::validation(format!("{name} must be non-empty")));
            }
        }
        let mut work = BTreeMap::new();
        for t in &templates {
            if t.id.trim().is_empty() {
                return Err(MemecapError::validation("template id must be non-empty"));
            }
            if work
                .insert(t.id.clone(), TemplateWork::with_caption(""))
                .is_some()
            {
                return Err(MemecapError::validation(format!(
                    "duplicate template id '{}'",
                    t.id
                )));
            }
        }
        tracing::info!(participant = %participant_id, session = %session_id, "session started");
        Ok(Self {
            participant_id,
            session_id,
            topic,
            templates,
            work,
            started_at: Utc::now(),
        })
    }

    /// Participant identifier.
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Study topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Templates in catalog order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Work for one template.
    pub fn work(&self, template_id: &str) -> MemecapResult<&TemplateWork> {
        self.work
            .get(template_id)
            .ok_or_else(|| unknown_template(template_id))
    }

    /// Mutable layers for one template.
    pub fn layers_mut(&mut self, template_id: &str) -> MemecapResult<&mut LayerSet> {
        self.work
            .get_mut(template_id)
            .map(|w| &mut w.layers)
            .ok_or_else(|| unknown_template(template_id))
    }

    /// Replace a template's ideas and mirror the preferred one into its
    /// locked layer.
    pub fn set_ideas(&mut self, template_id: &str, ideas: IdeaSet) -> MemecapResult<()> {
        ideas.validate()?;
        let work = self
            .work
            .get_mut(template_id)
            .ok_or_else(|| unknown_template(template_id))?;
        work.ideas = ideas;
        work.ideas.mirror_into(&mut work.layers);
        Ok(())
    }

    /// Change the preferred idea and mirror it into the locked layer.
    pub fn select_best(&mut self, template_id: &str, best: usize) -> MemecapResult<()> {
        let work = self
            .work
            .get_mut(template_id)
            .ok_or_else(|| unknown_template(template_id))?;
        work.ideas.select(best)?;
        work.ideas.mirror_into(&mut work.layers);
        Ok(())
    }

    /// Close the session.
    pub fn finish(self) -> SessionSummary {
        let completed_templates: Vec<String> = self
            .templates
            .iter()
            .filter(|t| self.work.get(&t.id).is_some_and(|w| w.ideas.is_complete()))
            .map(|t| t.id.clone())
            .collect();
        tracing::info!(
            participant = %self.participant_id,
            session = %self.session_id,
            completed = completed_templates.len(),
            "session finished"
        );
        SessionSummary {
            participant_id: self.participant_id,
            session_id: self.session_id,
            topic: self.topic,
            completed_templates,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

impl TemplateWork {
    fn with_caption(caption: &str) -> Self {
        Self {
            ideas: IdeaSet::default(),
            layers: LayerSet::new_with_caption(caption),
        }
    }
}

fn unknown_template(id: &str) -> MemecapError {
    MemecapError::validation(format!("template '{id}' is not part of this session"))
}

#[cfg(test)]
#[path = "../../tests/unit/session/mod.rs"]
mod tests;
