use std::cell::RefCell;

use chrono::TimeZone;

use super::*;

fn png() -> ExportedImage {
    ExportedImage {
        width: 1,
        height: 1,
        png: vec![0x89, b'P', b'N', b'G'],
    }
}

fn draft() -> SubmissionDraft {
    SubmissionDraft {
        participant_id: "p-17".into(),
        session_id: "s-1".into(),
        topic: "final exams".into(),
        topic_index: 0,
        template_id: "drake".into(),
        template_index: 2,
        idea_number: 3,
        caption: "open book".into(),
        layers: vec![TextLayer::new("caption", "open book", 5.0, 5.0, 32.0)],
        created_at: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
    }
}

struct FailingSink;

impl RecordSink for FailingSink {
    fn insert(&self, _record: &SubmissionRecord) -> MemecapResult<()> {
        Err(MemecapError::upstream(Some(500), "insert rejected"))
    }
}

#[derive(Default)]
struct RecordingStore {
    removed: RefCell<Vec<String>>,
}

impl ArtifactStore for RecordingStore {
    fn put(&self, key: &str, _bytes: &[u8], content_type: &str) -> MemecapResult<String> {
        assert_eq!(content_type, "image/png");
        Ok(format!("mem://{key}"))
    }

    fn remove(&self, key: &str) -> MemecapResult<()> {
        self.removed.borrow_mut().push(key.to_string());
        Ok(())
    }
}

#[test]
fn key_layout_and_sanitizing() {
    let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
    assert_eq!(
        storage_key("p-17", "final exams", "drake", 3, ts),
        "p-17/final_exams__drake__idea3__1700000000123.png"
    );
    assert_eq!(
        storage_key("../x", "a/b", "", 1, ts),
        "___x/a_b__unknown__idea1__1700000000123.png"
    );
}

#[test]
fn stores_then_records_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirStore::new(dir.path().join("bucket"));
    let sink = JsonlRecords::new(dir.path().join("records.jsonl"));

    let record = persist_submission(&store, &sink, draft(), &png()).unwrap();
    assert_eq!(
        record.storage_path,
        "p-17/final_exams__drake__idea3__1700000000123.png"
    );
    let stored = dir.path().join("bucket").join(&record.storage_path);
    assert_eq!(std::fs::read(stored).unwrap(), png().png);

    let rows = sink.read_all().unwrap();
    assert_eq!(rows, vec![record]);
}

#[test]
fn failed_insert_removes_stored_image() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirStore::new(dir.path());
    let err = persist_submission(&store, &FailingSink, draft(), &png()).unwrap_err();
    assert!(matches!(err, MemecapError::Upstream { .. }));
    let participant_dir = dir.path().join("p-17");
    let leftovers = std::fs::read_dir(&participant_dir).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[test]
fn compensating_delete_targets_same_key() {
    let store = RecordingStore::default();
    persist_submission(&store, &FailingSink, draft(), &png()).unwrap_err();
    assert_eq!(
        store.removed.borrow().as_slice(),
        ["p-17/final_exams__drake__idea3__1700000000123.png"]
    );
}

#[test]
fn idea_number_zero_is_rejected_before_upload() {
    let store = RecordingStore::default();
    let mut d = draft();
    d.idea_number = 0;
    let sink = JsonlRecords::new("/nonexistent/records.jsonl");
    assert!(matches!(
        persist_submission(&store, &sink, d, &png()),
        Err(MemecapError::Validation(_))
    ));
}

#[test]
fn dir_store_rejects_escaping_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirStore::new(dir.path());
    assert!(store.put("../evil.png", b"x", "image/png").is_err());
    assert!(store.put("/abs.png", b"x", "image/png").is_err());
    assert!(store.put("", b"x", "image/png").is_err());
}

#[test]
fn missing_record_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonlRecords::new(dir.path().join("none.jsonl"));
    assert!(sink.read_all().unwrap().is_empty());
}
