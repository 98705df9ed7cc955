use std::{collections::HashMap, sync::Arc};

use crate::{
    compose::{
        fonts::FontBook,
        plan::{ExportPlan, TextLine},
        source::PreparedImage,
    },
    foundation::error::{MemecapError, MemecapResult},
};

const OUTLINE_RGBA: [u8; 4] = [0, 0, 0, 255];
const FILL_RGBA: [u8; 4] = [255, 255, 255, 255];

#[derive(Clone, Debug)]
/// Rendered pixels read back from the CPU surface.
pub struct FrameRGBA {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 bytes.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied by alpha.
    pub premultiplied: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Counters from the last [`CpuRasterizer::render`] call.
pub struct RasterStats {
    /// Wrapped lines drawn.
    pub lines: usize,
    /// Glyph runs drawn (each gets one stroke and one fill pass).
    pub glyph_runs: usize,
}

/// Executes an [`ExportPlan`] on a `vello_cpu` surface.
#[derive(Default)]
pub struct CpuRasterizer {
    font_cache: HashMap<(u64, u32), vello_cpu::peniko::FontData>,
    last_stats: RasterStats,
}

impl std::fmt::Debug for CpuRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuRasterizer")
            .field("cached_fonts", &self.font_cache.len())
            .field("last_stats", &self.last_stats)
            .finish()
    }
}

impl CpuRasterizer {
    /// Fresh rasterizer with an empty font cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters from the most recent render.
    pub fn last_stats(&self) -> RasterStats {
        self.last_stats
    }

    /// Draw `base` scaled to the plan's surface, then every planned line as
    /// a black outline followed by a white fill.
    pub fn render(
        &mut self,
        plan: &ExportPlan,
        base: &PreparedImage,
        fonts: &mut FontBook,
    ) -> MemecapResult<FrameRGBA> {
        let width = surface_dim(plan.width, "width")?;
        let height = surface_dim(plan.height, "height")?;
        if !plan.texts.is_empty() && !fonts.has_faces() {
            return Err(MemecapError::unsupported(
                "no font faces loaded; cannot draw caption text",
            ));
        }

        self.last_stats = RasterStats::default();
        let mut ctx = vello_cpu::RenderContext::new(width, height);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        draw_base(&mut ctx, base, plan)?;
        for text in &plan.texts {
            for line in &text.lines {
                self.draw_line(&mut ctx, fonts, line, text.font_px, plan.stroke_px)?;
            }
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: plan.width,
            height: plan.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn draw_line(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        fonts: &mut FontBook,
        line: &TextLine,
        font_px: f32,
        stroke_px: f32,
    ) -> MemecapResult<()> {
        let layout = fonts.layout_line(&line.text, font_px)?;
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            f64::from(line.x),
            f64::from(line.y),
        )));

        for layout_line in layout.lines() {
            for item in layout_line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let font = self.font_for_run(&run);
                let font_size = run.run().font_size();
                let glyphs = positioned_glyphs(&run);

                ctx.set_paint(color(OUTLINE_RGBA));
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(f64::from(stroke_px)));
                ctx.glyph_run(&font)
                    .font_size(font_size)
                    .stroke_glyphs(glyphs.iter().map(to_cpu_glyph));

                ctx.set_paint(color(FILL_RGBA));
                ctx.glyph_run(&font)
                    .font_size(font_size)
                    .fill_glyphs(glyphs.iter().map(to_cpu_glyph));

                self.last_stats.glyph_runs += 1;
            }
        }
        self.last_stats.lines += 1;
        Ok(())
    }

    fn font_for_run(
        &mut self,
        run: &parley::layout::GlyphRun<'_, ()>,
    ) -> vello_cpu::peniko::FontData {
        let font = run.run().font();
        let key = (font.data.id(), font.index);
        self.font_cache
            .entry(key)
            .or_insert_with(|| {
                vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(font.data.data().to_vec()),
                    font.index,
                )
            })
            .clone()
    }
}

fn positioned_glyphs(run: &parley::layout::GlyphRun<'_, ()>) -> Vec<(u32, f32, f32)> {
    let mut x = run.offset();
    let y = run.baseline();
    let mut out = Vec::new();
    for g in run.glyphs() {
        out.push((g.id, x + g.x, y - g.y));
        x += g.advance;
    }
    out
}

fn to_cpu_glyph(&(id, x, y): &(u32, f32, f32)) -> vello_cpu::Glyph {
    vello_cpu::Glyph { id, x, y }
}

fn color([r, g, b, a]: [u8; 4]) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(r, g, b, a)
}

fn surface_dim(v: u32, what: &str) -> MemecapResult<u16> {
    let d: u16 = v
        .try_into()
        .map_err(|_| MemecapError::unsupported(format!("surface {what} {v} exceeds u16")))?;
    if d == 0 {
        return Err(MemecapError::unsupported(format!("surface {what} is zero")));
    }
    Ok(d)
}

fn draw_base(
    ctx: &mut vello_cpu::RenderContext,
    base: &PreparedImage,
    plan: &ExportPlan,
) -> MemecapResult<()> {
    let pixmap =
        image_premul_bytes_to_pixmap(base.rgba8_premul.as_slice(), base.width, base.height)?;
    let paint = vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    };

    let sx = f64::from(plan.width) / f64::from(base.width);
    let sy = f64::from(plan.height) / f64::from(base.height);
    ctx.set_transform(vello_cpu::kurbo::Affine::scale_non_uniform(sx, sy));
    ctx.set_paint(paint);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(base.width),
        f64::from(base.height),
    ));
    Ok(())
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> MemecapResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| MemecapError::unsupported("source image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| MemecapError::unsupported("source image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(MemecapError::image_load(
            "prepared image byte length mismatch",
        ));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/compose/cpu.rs"]
mod tests;
