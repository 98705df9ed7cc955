//! Fixed local content used when the upstream cannot be reached or parsed.

use super::{MemeIdea, TemplateHint};

const IDEA_PATTERNS: &[&str] = &[
    "When someone says {topic} is easy",
    "Me pretending to understand {topic}",
    "Nobody:\nMe at 3am: thinking about {topic}",
    "{topic} expectations vs reality",
    "Explaining {topic} to my family",
];

const SUGGESTION_PATTERNS: &[&str] = &[
    "Shorten it: keep only the punchline about {topic}",
    "Try a setup/punchline split: \"{draft}\" on top, the twist below",
    "Exaggerate it: make {topic} sound far more dramatic than it is",
];

/// One idea per template, cycling through the fixed patterns.
pub fn fallback_ideas(topic: &str, templates: &[TemplateHint]) -> Vec<MemeIdea> {
    templates
        .iter()
        .zip(IDEA_PATTERNS.iter().cycle())
        .map(|(t, pattern)| MemeIdea {
            template_id: t.template_id.clone(),
            caption: fill(pattern, topic, ""),
        })
        .collect()
}

/// Three generic rewrite suggestions for a draft caption.
pub fn fallback_suggestions(topic: &str, draft: &str) -> Vec<String> {
    SUGGESTION_PATTERNS
        .iter()
        .map(|p| fill(p, topic, draft))
        .collect()
}

fn fill(pattern: &str, topic: &str, draft: &str) -> String {
    pattern
        .replace("{topic}", topic.trim())
        .replace("{draft}", draft.trim())
}
