//! Layer compositor: template image + positioned text layers -> flattened PNG.
//!
//! Exports run in two steps. [`plan::plan_export`] is pure: it sizes the
//! output surface, scales fonts and strokes and wraps every layer into
//! positioned lines. [`cpu::CpuRasterizer`] then executes the plan. Image
//! fetching and font loading happen before either step.

/// Rasterizes an [`plan::ExportPlan`] onto the scaled base image.
pub mod cpu;
/// PNG encoding and saving of finished frames.
pub mod export;
/// Font discovery and single-line shaping.
pub mod fonts;
/// Pure export planning: output size, scaled fonts, wrapped lines.
pub mod plan;
/// Template image references and decoding.
pub mod source;
/// Greedy word wrapping against a measured width.
pub mod wrap;

use crate::{
    foundation::config::CompositorConfig,
    foundation::error::{MemecapError, MemecapResult},
    model::layer::{TextLayer, validate_layers},
};

use self::{
    cpu::CpuRasterizer,
    export::ExportedImage,
    fonts::FontBook,
    plan::plan_export,
    source::{ImageSource, PreparedImage},
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Input to [`Compositor::export`].
pub struct ExportRequest {
    /// Template image reference (path, `http(s)` URL or `data:` URL).
    pub image_url: String,
    /// Layers in draw order.
    pub layers: Vec<TextLayer>,
    /// Output width in pixels; the configured default when unset.
    #[serde(default)]
    pub output_width: Option<u32>,
}

/// Owns the font book and CPU rasterizer used for exports.
#[derive(Debug)]
pub struct Compositor {
    config: CompositorConfig,
    fonts: FontBook,
    raster: CpuRasterizer,
}

impl Compositor {
    /// Build a compositor, loading fonts from `config.font_dirs`.
    pub fn new(config: CompositorConfig) -> Self {
        let fonts = FontBook::from_dirs(&config.font_dirs, config.font_families.clone());
        Self::with_fonts(config, fonts)
    }

    /// Build a compositor around an already-populated font book.
    pub fn with_fonts(config: CompositorConfig, fonts: FontBook) -> Self {
        Self {
            config,
            fonts,
            raster: CpuRasterizer::new(),
        }
    }

    /// Font book used for shaping.
    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Mutable font book, e.g. to register extra faces.
    pub fn fonts_mut(&mut self) -> &mut FontBook {
        &mut self.fonts
    }

    /// Load the request's image and export it.
    #[tracing::instrument(skip(self, request), fields(layers = request.layers.len()))]
    pub fn export(&mut self, request: &ExportRequest) -> MemecapResult<ExportedImage> {
        let base = ImageSource::parse(&request.image_url).load()?;
        let width = request
            .output_width
            .unwrap_or(self.config.default_output_width);
        self.export_image(&base, &request.layers, width)
    }

    /// Export an already-decoded image.
    pub fn export_image(
        &mut self,
        base: &PreparedImage,
        layers: &[TextLayer],
        output_width: u32,
    ) -> MemecapResult<ExportedImage> {
        if output_width == 0 {
            return Err(MemecapError::validation("output width must be > 0"));
        }
        validate_layers(layers)?;

        let plan = plan_export(base.size(), layers, output_width, &mut self.fonts)?;
        tracing::debug!(
            width = plan.width,
            height = plan.height,
            scale = plan.scale,
            texts = plan.texts.len(),
            "export planned"
        );

        let frame = self.raster.render(&plan, base, &mut self.fonts)?;
        ExportedImage::from_frame(&frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/mod.rs"]
mod tests;
