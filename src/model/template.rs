use std::path::Path;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::{
    foundation::error::{MemecapError, MemecapResult},
    model::layer::LayerSet,
};

/// Number of caption ideas collected per template.
pub const IDEAS_PER_TEMPLATE: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Immutable catalog reference to a base meme image.
pub struct Template {
    /// Catalog identifier.
    pub id: String,
    /// Display name.
    #[serde(alias = "title")]
    pub name: String,
    /// Image location (path, `http(s)` URL or `data:` URL).
    pub image_url: String,
}

#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// An image inlined as base64 for transport to the upstream model.
pub struct InlineImage {
    /// Standard-alphabet base64 payload, without a `data:` prefix.
    pub base64: String,
    /// MIME type such as `image/png`.
    pub mime_type: String,
}

impl std::fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineImage")
            .field("base64_len", &self.base64.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl InlineImage {
    /// Encode raw image bytes, sniffing the MIME type from the content.
    pub fn from_bytes(bytes: &[u8]) -> MemecapResult<Self> {
        let format = image::guess_format(bytes)
            .map_err(|e| MemecapError::image_load(format!("unrecognized image data: {e}")))?;
        Ok(Self {
            base64: BASE64.encode(bytes),
            mime_type: format.to_mime_type().to_string(),
        })
    }

    /// Read and encode an image file.
    pub fn from_path(path: &Path) -> MemecapResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read template image '{}'", path.display()))
            .map_err(|e| MemecapError::image_load(format!("{e:#}")))?;
        Self::from_bytes(&bytes)
    }

    /// `data:` URL form used in chat-completion image parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    /// Check that both fields are present and the MIME type is an image type.
    pub fn validate(&self, field: &str) -> MemecapResult<()> {
        if self.base64.trim().is_empty() {
            return Err(MemecapError::validation(format!(
                "{field}.base64 must be non-empty"
            )));
        }
        if !self.mime_type.starts_with("image/") {
            return Err(MemecapError::validation(format!(
                "{field}.mimeType must be an image MIME type, got '{}'",
                self.mime_type
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Three caption ideas for one template plus the index of the preferred one.
pub struct IdeaSet {
    /// Caption drafts, in entry order.
    pub captions: [String; IDEAS_PER_TEMPLATE],
    /// Index (0-2) of the preferred caption.
    pub best: usize,
}

impl IdeaSet {
    /// Build an idea set, rejecting an out-of-range `best` index.
    pub fn new(captions: [String; IDEAS_PER_TEMPLATE], best: usize) -> MemecapResult<Self> {
        let set = Self { captions, best };
        set.validate()?;
        Ok(set)
    }

    /// Text of the preferred caption.
    pub fn best_caption(&self) -> &str {
        self.captions
            .get(self.best)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Change the preferred caption index.
    pub fn select(&mut self, best: usize) -> MemecapResult<()> {
        if best >= IDEAS_PER_TEMPLATE {
            return Err(MemecapError::validation(format!(
                "best index {best} out of range 0..{IDEAS_PER_TEMPLATE}"
            )));
        }
        self.best = best;
        Ok(())
    }

    /// Copy the preferred caption into the locked layer of `layers`.
    ///
    /// Returns `false` when the set has no locked layer.
    pub fn mirror_into(&self, layers: &mut LayerSet) -> bool {
        match layers.locked_mut() {
            Some(layer) => {
                layer.text = self.best_caption().to_string();
                true
            }
            None => false,
        }
    }

    /// Whether every caption has non-whitespace content.
    pub fn is_complete(&self) -> bool {
        self.captions.iter().all(|c| !c.trim().is_empty())
    }

    /// Check the `best` index.
    pub fn validate(&self) -> MemecapResult<()> {
        if self.best >= IDEAS_PER_TEMPLATE {
            return Err(MemecapError::validation(format!(
                "best index {} out of range 0..{IDEAS_PER_TEMPLATE}",
                self.best
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/template.rs"]
mod tests;
