use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    compose::cpu::FrameRGBA,
    foundation::error::{MemecapError, MemecapResult},
};

#[derive(Clone, PartialEq, Eq)]
/// A flattened export encoded as PNG.
pub struct ExportedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// PNG file bytes.
    pub png: Vec<u8>,
}

impl std::fmt::Debug for ExportedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png_len", &self.png.len())
            .finish()
    }
}

impl ExportedImage {
    /// Encode a rendered frame as PNG (straight alpha).
    pub fn from_frame(frame: &FrameRGBA) -> MemecapResult<Self> {
        let mut rgba = frame.data.clone();
        if frame.premultiplied {
            unpremultiply_rgba8_in_place(&mut rgba);
        }
        let img = image::RgbaImage::from_raw(frame.width, frame.height, rgba).ok_or_else(|| {
            MemecapError::unsupported("frame byte length does not match its dimensions")
        })?;

        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .context("encode png")?;

        Ok(Self {
            width: frame.width,
            height: frame.height,
            png,
        })
    }

    /// Read back the pixel dimensions stored in `png` bytes.
    pub fn decoded_dimensions(png: &[u8]) -> MemecapResult<(u32, u32)> {
        let reader = image::ImageReader::with_format(Cursor::new(png), image::ImageFormat::Png);
        reader
            .into_dimensions()
            .map_err(|e| MemecapError::image_load(format!("read png header: {e}")))
    }

    /// Write the PNG as `dir/filename`, creating `dir` when needed.
    pub fn save(&self, dir: &Path, filename: &str) -> MemecapResult<PathBuf> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename == ".." {
            return Err(MemecapError::validation(format!(
                "invalid export filename '{filename}'"
            )));
        }
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir '{}'", dir.display()))?;
        let path = dir.join(filename);
        std::fs::write(&path, &self.png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), bytes = self.png.len(), "saved export");
        Ok(path)
    }
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/export.rs"]
mod tests;
