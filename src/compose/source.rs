use std::{path::PathBuf, sync::Arc, time::Duration};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::{
    compose::plan::SourceSize,
    foundation::error::{MemecapError, MemecapResult},
};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
/// Decoded source image in premultiplied RGBA8 form.
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Dimensions as used by the planner.
    pub fn size(&self) -> SourceSize {
        SourceSize {
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Where a template image comes from.
pub enum ImageSource {
    /// Local file.
    Path(PathBuf),
    /// Remote `http` or `https` resource.
    Url(String),
    /// Inline `data:<mime>;base64,<payload>` URL.
    DataUrl(String),
    /// Already-loaded encoded bytes.
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Classify an image reference string.
    pub fn parse(reference: &str) -> Self {
        let r = reference.trim();
        if r.starts_with("http://") || r.starts_with("https://") {
            Self::Url(r.to_string())
        } else if r.starts_with("data:") {
            Self::DataUrl(r.to_string())
        } else if let Some(path) = r.strip_prefix("file://") {
            Self::Path(PathBuf::from(path))
        } else {
            Self::Path(PathBuf::from(r))
        }
    }

    /// Read the encoded image bytes.
    ///
    /// Remote sources use a blocking client; do not call this from inside an
    /// async runtime worker.
    pub fn load_bytes(&self) -> MemecapResult<Vec<u8>> {
        match self {
            Self::Path(path) => std::fs::read(path).map_err(|e| {
                MemecapError::image_load(format!("read '{}': {e}", path.display()))
            }),
            Self::Url(url) => fetch_url(url),
            Self::DataUrl(url) => decode_data_url(url),
            Self::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    /// Read and decode the image.
    #[tracing::instrument(level = "debug", skip(self), fields(kind = self.kind()))]
    pub fn load(&self) -> MemecapResult<PreparedImage> {
        let bytes = self.load_bytes()?;
        decode_image(&bytes)
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Path(_) => "path",
            Self::Url(_) => "url",
            Self::DataUrl(_) => "data-url",
            Self::Bytes(_) => "bytes",
        }
    }
}

fn fetch_url(url: &str) -> MemecapResult<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| MemecapError::image_load(format!("build http client: {e}")))?;
    let resp = client
        .get(url)
        .send()
        .map_err(|e| MemecapError::image_load(format!("fetch '{url}': {e}")))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(MemecapError::image_load(format!(
            "fetch '{url}': HTTP {}",
            status.as_u16()
        )));
    }
    resp.bytes()
        .map(|b| b.to_vec())
        .map_err(|e| MemecapError::image_load(format!("read body of '{url}': {e}")))
}

fn decode_data_url(url: &str) -> MemecapResult<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| MemecapError::image_load("not a data URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| MemecapError::image_load("data URL has no payload"))?;
    if !meta.ends_with(";base64") {
        return Err(MemecapError::image_load(
            "only base64 data URLs are supported",
        ));
    }
    BASE64
        .decode(payload.trim().as_bytes())
        .map_err(|e| MemecapError::image_load(format!("data URL base64: {e}")))
}

/// Decode encoded image bytes into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> MemecapResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| MemecapError::image_load(format!("decode image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(MemecapError::image_load("decoded image has zero size"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/source.rs"]
mod tests;
