//! memecap: tooling for a meme-captioning study.
//!
//! Two independent parts share one error type and one configuration file:
//!
//! - the layer compositor ([`Compositor`]) flattens a template image and
//!   positioned text layers into a PNG using a CPU rasterizer;
//! - the caption-assist gateway ([`Gateway`]) proxies three strictly shaped
//!   operations to a chat-completion service, with a client-side
//!   [`CaptionAssistant`] that tolerates free-form replies.
//!
//! Session state, submission persistence and the CSV batch tool build on
//! those two parts.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Client-side caption assistant with local fallback.
pub mod assist;
/// Offline CSV refinement.
pub mod batch;
/// Layer compositor.
pub mod compose;
/// Errors and configuration.
pub mod foundation;
/// Caption-assist gateway.
pub mod gateway;
/// Layers, templates and idea sets.
pub mod model;
/// Study sessions and submission persistence.
pub mod session;

pub use crate::assist::{AssistOutcome, AssistSource, CaptionAssistant, MemeIdea, TemplateHint};
pub use crate::compose::export::ExportedImage;
pub use crate::compose::fonts::FontBook;
pub use crate::compose::{Compositor, ExportRequest};
pub use crate::foundation::config::AppConfig;
pub use crate::foundation::error::{MemecapError, MemecapResult};
pub use crate::gateway::ops::Gateway;
pub use crate::gateway::upstream::{ChatRequest, OpenAiUpstream, Upstream};
pub use crate::model::layer::{LayerSet, TextLayer};
pub use crate::model::template::{IdeaSet, InlineImage, Template};
pub use crate::session::StudySession;
