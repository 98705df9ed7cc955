//! Offline CSV tool: refine every row's three captions through the gateway.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    foundation::error::{MemecapError, MemecapResult},
    gateway::{ops::Gateway, types::RefineCaptionRequest, upstream::Upstream},
    model::template::InlineImage,
};

/// Columns every input file must have.
pub const REQUIRED_COLUMNS: [&str; 5] = ["topic", "template", "caption_1", "caption_2", "caption_3"];

/// Column appended (or overwritten) with the refined caption.
pub const REFINED_COLUMN: &str = "refined_caption";

const ASSET_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

#[derive(Clone, Debug)]
/// Inputs of one batch run.
pub struct BatchOptions {
    /// Input CSV.
    pub csv: PathBuf,
    /// Directory holding template images.
    pub assets: PathBuf,
    /// Output path; the input is rewritten in place when unset.
    pub out: Option<PathBuf>,
    /// Write the output file. Without it nothing on disk changes.
    pub apply: bool,
}

#[derive(Clone, Debug, Default)]
/// Result of a batch run.
pub struct BatchReport {
    /// Data rows read.
    pub rows: usize,
    /// Rows that received a refined caption.
    pub refined: usize,
    /// Rows left with an empty refined caption.
    pub failed: usize,
    /// The augmented CSV document.
    pub output: Vec<u8>,
    /// Where the output was written, if `apply` was set.
    pub written: Option<PathBuf>,
}

/// Find `<assets>/<template>`, trying the known image extensions when the
/// name has none. Absolute paths and `..` never escape `assets`.
pub fn resolve_asset(assets: &Path, template: &str) -> MemecapResult<PathBuf> {
    let template = template.trim();
    if template.is_empty() || template.contains("..") || Path::new(template).is_absolute() {
        return Err(MemecapError::validation(format!(
            "invalid template reference '{template}'"
        )));
    }
    let direct = assets.join(template);
    if direct.is_file() {
        return Ok(direct);
    }
    ASSET_EXTENSIONS
        .iter()
        .map(|ext| assets.join(format!("{template}.{ext}")))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            MemecapError::image_load(format!(
                "no image for template '{template}' in '{}'",
                assets.display()
            ))
        })
}

/// Run the batch. Row failures are logged and counted, never fatal.
#[tracing::instrument(skip_all, fields(csv = %opts.csv.display(), apply = opts.apply))]
pub async fn refine_csv<U: Upstream>(
    gateway: &Gateway<U>,
    opts: &BatchOptions,
) -> MemecapResult<BatchReport> {
    let mut reader = csv::ReaderBuilder::new()
        .from_path(&opts.csv)
        .with_context(|| format!("open '{}'", opts.csv.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("read header of '{}'", opts.csv.display()))?
        .clone();

    let mut columns = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| MemecapError::validation(format!("missing CSV column '{name}'")))?;
    }
    let refined_at = headers.iter().position(|h| h.trim() == REFINED_COLUMN);

    let mut out_headers = headers.clone();
    if refined_at.is_none() {
        out_headers.push_field(REFINED_COLUMN);
    }
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&out_headers).context("write CSV header")?;

    let mut report = BatchReport::default();
    for (i, row) in reader.records().enumerate() {
        let row_no = i + 1;
        let row = row.with_context(|| format!("read CSV row {row_no}"))?;
        report.rows += 1;

        let field = |c: usize| row.get(columns[c]).unwrap_or_default().to_string();
        let refined = match refine_row(
            gateway,
            &opts.assets,
            field(0),
            &field(1),
            [field(2), field(3), field(4)],
        )
        .await
        {
            Ok(caption) => {
                report.refined += 1;
                tracing::info!(row = row_no, "row refined");
                caption
            }
            Err(err) => {
                report.failed += 1;
                tracing::warn!(row = row_no, error = %err, "row failed");
                String::new()
            }
        };

        let mut out: Vec<String> = row.iter().map(str::to_string).collect();
        match refined_at {
            Some(at) if at < out.len() => out[at] = refined,
            Some(at) => {
                out.resize(at, String::new());
                out.push(refined);
            }
            None => out.push(refined),
        }
        writer.write_record(&out).context("write CSV row")?;
    }

    report.output = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flush CSV: {}", e.error()))?;

    if opts.apply {
        let target = opts.out.clone().unwrap_or_else(|| opts.csv.clone());
        std::fs::write(&target, &report.output)
            .with_context(|| format!("write '{}'", target.display()))?;
        report.written = Some(target);
    }
    tracing::info!(
        rows = report.rows,
        refined = report.refined,
        failed = report.failed,
        written = report.written.is_some(),
        "batch finished"
    );
    Ok(report)
}

async fn refine_row<U: Upstream>(
    gateway: &Gateway<U>,
    assets: &Path,
    topic: String,
    template: &str,
    captions: [String; 3],
) -> MemecapResult<String> {
    let path = resolve_asset(assets, template)?;
    let req = RefineCaptionRequest {
        topic,
        template_image: InlineImage::from_path(&path)?,
        template_description: None,
        human_captions: captions.into(),
    };
    Ok(gateway.refine_caption(&req).await?.final_caption)
}

#[cfg(test)]
#[path = "../tests/unit/batch.rs"]
mod tests;
