use crate::{
    compose::wrap::{TextMeasure, wrap_text},
    foundation::error::{MemecapError, MemecapResult},
    model::layer::TextLayer,
};

/// Smallest font size, in output pixels, any layer is drawn at.
pub const MIN_FONT_PX: f32 = 10.0;
/// Outline width at scale 1.0.
pub const BASE_STROKE_PX: f32 = 4.0;
/// Smallest outline width, in output pixels.
pub const MIN_STROKE_PX: f32 = 2.0;
/// Wrapped lines are limited to this fraction of the output width.
pub const MAX_LINE_WIDTH_FRACTION: f32 = 0.9;
/// Line pitch as a multiple of the scaled font size.
pub const LINE_PITCH_FACTOR: f32 = 1.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Pixel dimensions of the decoded source image.
pub struct SourceSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq)]
/// Backend-agnostic description of one export: output surface plus the
/// exact text lines to draw and where.
pub struct ExportPlan {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels, aspect ratio preserved.
    pub height: u32,
    /// `width / source width`.
    pub scale: f64,
    /// Outline width shared by every line.
    pub stroke_px: f32,
    /// Wrap limit in output pixels.
    pub max_line_width: f32,
    /// Text draws in layer order; blank layers are absent.
    pub texts: Vec<TextDraw>,
}

#[derive(Clone, Debug, PartialEq)]
/// Draw instructions for one non-blank layer.
pub struct TextDraw {
    /// Id of the layer this draw came from.
    pub layer_id: String,
    /// Scaled font size in output pixels.
    pub font_px: f32,
    /// Vertical distance between consecutive line tops.
    pub line_pitch: f32,
    /// Wrapped lines, top-aligned at their `y`.
    pub lines: Vec<TextLine>,
}

#[derive(Clone, Debug, PartialEq)]
/// A single wrapped line and its top-left anchor.
pub struct TextLine {
    /// Line content.
    pub text: String,
    /// Left edge in output pixels.
    pub x: f32,
    /// Top edge in output pixels.
    pub y: f32,
}

/// Output height for a source scaled to `output_width`.
pub fn output_height(source: SourceSize, output_width: u32) -> MemecapResult<u32> {
    if source.width == 0 || source.height == 0 {
        return Err(MemecapError::image_load("source image has zero size"));
    }
    if output_width == 0 {
        return Err(MemecapError::validation("output width must be > 0"));
    }
    let h = (f64::from(source.height) * f64::from(output_width) / f64::from(source.width)).round();
    if h < 1.0 || h > f64::from(u32::MAX) {
        return Err(MemecapError::unsupported(format!(
            "cannot create a {output_width}px-wide surface for a {}x{} source",
            source.width, source.height
        )));
    }
    Ok(h as u32)
}

/// Font size in output pixels: `max(MIN_FONT_PX, round(font_size * scale))`.
pub fn scaled_font_px(font_size: f64, scale: f64) -> f32 {
    ((font_size * scale).round() as f32).max(MIN_FONT_PX)
}

/// Outline width in output pixels: `max(MIN_STROKE_PX, BASE_STROKE_PX * scale)`.
pub fn scaled_stroke_px(scale: f64) -> f32 {
    (BASE_STROKE_PX * scale as f32).max(MIN_STROKE_PX)
}

/// Plan an export of `layers` over a `source`-sized image at `output_width`.
///
/// Pure apart from calls into `measure`, which is only consulted for layers
/// with visible text.
pub fn plan_export<M: TextMeasure + ?Sized>(
    source: SourceSize,
    layers: &[TextLayer],
    output_width: u32,
    measure: &mut M,
) -> MemecapResult<ExportPlan> {
    let height = output_height(source, output_width)?;
    let scale = f64::from(output_width) / f64::from(source.width);
    let max_line_width = output_width as f32 * MAX_LINE_WIDTH_FRACTION;

    let mut texts = Vec::new();
    for layer in layers {
        if layer.is_blank() {
            continue;
        }

        let font_px = scaled_font_px(layer.font_size, scale);
        let line_pitch = (font_px * LINE_PITCH_FACTOR).round();
        let x = (layer.x_pct / 100.0 * f64::from(output_width)) as f32;
        let y = (layer.y_pct / 100.0 * f64::from(height)) as f32;

        let lines = wrap_text(layer.text.trim(), font_px, max_line_width, measure)?
            .into_iter()
            .enumerate()
            .map(|(i, text)| TextLine {
                text,
                x,
                y: y + i as f32 * line_pitch,
            })
            .collect();

        texts.push(TextDraw {
            layer_id: layer.id.clone(),
            font_px,
            line_pitch,
            lines,
        });
    }

    Ok(ExportPlan {
        width: output_width,
        height,
        scale,
        stroke_px: scaled_stroke_px(scale),
        max_line_width,
        texts,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/compose/plan.rs"]
mod tests;
