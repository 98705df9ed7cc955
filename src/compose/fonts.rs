use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    compose::wrap::TextMeasure,
    foundation::error::{MemecapError, MemecapResult},
};

/// Cap on font files registered from directory scans.
const MAX_SCANNED_FONT_FILES: usize = 32;
const MAX_SCAN_DEPTH: usize = 4;

/// Registered font faces plus the family fallback order used for captions.
///
/// Faces only come from explicitly loaded files or bytes; the system font
/// index is never consulted, so the same inputs always shape the same way.
pub struct FontBook {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    preferred: Vec<String>,
    families: Vec<String>,
    stack: Option<String>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("preferred", &self.preferred)
            .field("families", &self.families)
            .finish()
    }
}

impl Default for FontBook {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FontBook {
    /// Empty book with the given family preference order.
    pub fn new(preferred: Vec<String>) -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            preferred,
            families: Vec::new(),
            stack: None,
        }
    }

    /// Build a book by scanning `dirs` for `ttf`/`otf`/`ttc` files.
    ///
    /// Files whose names look like a preferred family are registered first.
    /// Unreadable directories and files are skipped.
    pub fn from_dirs(dirs: &[PathBuf], preferred: Vec<String>) -> Self {
        let mut book = Self::new(preferred);

        let mut candidates = Vec::new();
        for dir in dirs {
            collect_font_files(dir, MAX_SCAN_DEPTH, &mut candidates);
        }
        candidates.sort_by_key(|p| (book.preference_rank(p), p.clone()));
        candidates.dedup();

        for path in candidates.into_iter().take(MAX_SCANNED_FONT_FILES) {
            if let Err(err) = book.load_font_file(&path) {
                tracing::debug!(path = %path.display(), %err, "skipping font file");
            }
        }
        tracing::debug!(families = ?book.families, "font book ready");
        book
    }

    /// Register one font file; returns the family names it provided.
    pub fn load_font_file(&mut self, path: &Path) -> MemecapResult<Vec<String>> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        self.register_font_bytes(bytes)
    }

    /// Register font data; returns the family names it provided.
    pub fn register_font_bytes(&mut self, bytes: Vec<u8>) -> MemecapResult<Vec<String>> {
        let registered = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes), None);
        if registered.is_empty() {
            return Err(MemecapError::validation(
                "no font families registered from font bytes",
            ));
        }

        let mut names = Vec::new();
        for (family_id, _) in registered {
            let Some(name) = self.font_ctx.collection.family_name(family_id) else {
                continue;
            };
            let name = name.to_string();
            if !self.families.contains(&name) {
                self.families.push(name.clone());
            }
            names.push(name);
        }
        self.stack = self.build_stack();
        Ok(names)
    }

    /// Registered family names in registration order.
    pub fn families(&self) -> &[String] {
        &self.families
    }

    /// Family the caption text resolves to first, if any face is loaded.
    pub fn primary_family(&self) -> Option<&str> {
        self.resolved_order().into_iter().next()
    }

    /// Whether at least one face is available for drawing.
    pub fn has_faces(&self) -> bool {
        !self.families.is_empty()
    }

    /// Shape a single unwrapped line.
    pub fn layout_line(
        &mut self,
        text: &str,
        font_px: f32,
    ) -> MemecapResult<parley::Layout<()>> {
        if !font_px.is_finite() || font_px <= 0.0 {
            return Err(MemecapError::validation(
                "font size must be finite and > 0",
            ));
        }
        let stack = self
            .stack
            .clone()
            .ok_or_else(|| MemecapError::unsupported("no font faces loaded"))?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(stack)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font_px));

        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);
        layout.align(
            None,
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );
        Ok(layout)
    }

    fn resolved_order(&self) -> Vec<&str> {
        let mut order: Vec<&str> = Vec::new();
        for want in &self.preferred {
            if let Some(have) = self
                .families
                .iter()
                .find(|f| f.eq_ignore_ascii_case(want))
            {
                if !order.contains(&have.as_str()) {
                    order.push(have.as_str());
                }
            }
        }
        for have in &self.families {
            if !order.contains(&have.as_str()) {
                order.push(have.as_str());
            }
        }
        order
    }

    fn build_stack(&self) -> Option<String> {
        let order = self.resolved_order();
        if order.is_empty() {
            None
        } else {
            Some(order.join(", "))
        }
    }

    fn preference_rank(&self, path: &Path) -> usize {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(squash)
            .unwrap_or_default();
        self.preferred
            .iter()
            .position(|family| stem.starts_with(&squash(family)))
            .unwrap_or(self.preferred.len())
    }
}

impl TextMeasure for FontBook {
    fn measure(&mut self, text: &str, font_px: f32) -> MemecapResult<f32> {
        Ok(self.layout_line(text, font_px)?.width())
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn collect_font_files(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if depth > 0 {
                collect_font_files(&path, depth - 1, out);
            }
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext == "ttf" || ext == "otf" || ext == "ttc" {
            out.push(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/fonts.rs"]
mod tests;
