//! Upload-then-insert persistence of exported memes.

use std::{
    fs::OpenOptions,
    io::Write as _,
    path::{Component, Path, PathBuf},
};

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::{
    compose::export::ExportedImage,
    foundation::error::{MemecapError, MemecapResult},
    model::layer::TextLayer,
};

/// Object storage for exported images.
pub trait ArtifactStore {
    /// Store `bytes` under `key`, returning the stored location.
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> MemecapResult<String>;
    /// Delete the object at `key`.
    fn remove(&self, key: &str) -> MemecapResult<()>;
}

/// Destination for submission metadata rows.
pub trait RecordSink {
    /// Insert one row.
    fn insert(&self, record: &SubmissionRecord) -> MemecapResult<()>;
}

#[derive(Clone, Debug, PartialEq)]
/// Everything known about a submission before its image is stored.
pub struct SubmissionDraft {
    /// Participant identifier.
    pub participant_id: String,
    /// Session identifier.
    pub session_id: String,
    /// Study topic.
    pub topic: String,
    /// Position of the topic in the study plan.
    pub topic_index: usize,
    /// Template id.
    pub template_id: String,
    /// Position of the template in the session.
    pub template_index: usize,
    /// Idea number, starting at 1.
    pub idea_number: usize,
    /// Caption text of the idea.
    pub caption: String,
    /// Layers the image was rendered from.
    pub layers: Vec<TextLayer>,
    /// Submission time, also used in the storage key.
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Metadata row referencing a stored image.
pub struct SubmissionRecord {
    /// Participant identifier.
    pub participant_id: String,
    /// Session identifier.
    pub session_id: String,
    /// Study topic.
    pub topic: String,
    /// Position of the topic in the study plan.
    pub topic_index: usize,
    /// Template id.
    pub template_id: String,
    /// Position of the template in the session.
    pub template_index: usize,
    /// Idea number, starting at 1.
    pub idea_number: usize,
    /// Caption text.
    pub caption: String,
    /// Layers the image was rendered from.
    pub layers: Vec<TextLayer>,
    /// Storage key of the image.
    pub storage_path: String,
    /// Location reported by the store.
    pub storage_url: String,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// `{participant}/{topic}__{template}__idea{n}__{millis}.png` with each
/// segment reduced to `[A-Za-z0-9_-]`.
pub fn storage_key(
    participant_id: &str,
    topic: &str,
    template_id: &str,
    idea_number: usize,
    timestamp: DateTime<Utc>,
) -> String {
    format!(
        "{}/{}__{}__idea{}__{}.png",
        sanitize_segment(participant_id),
        sanitize_segment(topic),
        sanitize_segment(template_id),
        idea_number,
        timestamp.timestamp_millis()
    )
}

fn sanitize_segment(s: &str) -> String {
    let out: String = s
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() {
        "unknown".to_string()
    } else {
        out
    }
}

/// Store the image, then insert its record. When the insert fails the stored
/// image is removed again and the insert error is returned.
#[tracing::instrument(skip_all, fields(participant = %draft.participant_id, idea = draft.idea_number))]
pub fn persist_submission<S, R>(
    store: &S,
    sink: &R,
    draft: SubmissionDraft,
    image: &ExportedImage,
) -> MemecapResult<SubmissionRecord>
where
    S: ArtifactStore + ?Sized,
    R: RecordSink + ?Sized,
{
    if draft.idea_number == 0 {
        return Err(MemecapError::validation("idea number starts at 1"));
    }
    let key = storage_key(
        &draft.participant_id,
        &draft.topic,
        &draft.template_id,
        draft.idea_number,
        draft.created_at,
    );
    let storage_url = store.put(&key, &image.png, "image/png")?;

    let record = SubmissionRecord {
        participant_id: draft.participant_id,
        session_id: draft.session_id,
        topic: draft.topic,
        topic_index: draft.topic_index,
        template_id: draft.template_id,
        template_index: draft.template_index,
        idea_number: draft.idea_number,
        caption: draft.caption,
        layers: draft.layers,
        storage_path: key,
        storage_url,
        created_at: draft.created_at,
    };

    if let Err(err) = sink.insert(&record) {
        tracing::warn!(key = %record.storage_path, error = %err, "record insert failed; removing stored image");
        if let Err(cleanup) = store.remove(&record.storage_path) {
            tracing::warn!(key = %record.storage_path, error = %cleanup, "compensating delete failed");
        }
        return Err(err);
    }
    Ok(record)
}

#[derive(Clone, Debug)]
/// [`ArtifactStore`] writing objects under a local directory.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Store objects below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> MemecapResult<PathBuf> {
        let rel = Path::new(key);
        let plain = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(MemecapError::validation(format!(
                "storage key '{key}' must be a relative path without '..'"
            )));
        }
        Ok(self.root.join(rel))
    }
}

impl ArtifactStore for DirStore {
    fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> MemecapResult<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create '{}'", parent.display()))?;
        }
        std::fs::write(&path, bytes).with_context(|| format!("write '{}'", path.display()))?;
        Ok(path.display().to_string())
    }

    fn remove(&self, key: &str) -> MemecapResult<()> {
        let path = self.resolve(key)?;
        std::fs::remove_file(&path).with_context(|| format!("remove '{}'", path.display()))?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
/// [`RecordSink`] appending one JSON object per line.
pub struct JsonlRecords {
    path: PathBuf,
}

impl JsonlRecords {
    /// Append to `path`, creating it on first insert.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read every record back.
    pub fn read_all(&self) -> MemecapResult<Vec<SubmissionRecord>> {
        let src = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read '{}'", self.path.display()))
                    .into());
            }
        };
        src.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                serde_json::from_str(l)
                    .map_err(|e| MemecapError::serde(format!("record line: {e}")))
            })
            .collect()
    }
}

impl RecordSink for JsonlRecords {
    fn insert(&self, record: &SubmissionRecord) -> MemecapResult<()> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| MemecapError::serde(format!("encode record: {e}")))?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open '{}'", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append '{}'", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/submit.rs"]
mod tests;
