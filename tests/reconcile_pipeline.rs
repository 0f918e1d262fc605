//! End-to-end pipeline tests over in-memory collaborators.
//!
//! Wires scan → parse → reconcile → persist together with fake storage and
//! stream implementations, exercising the run the way `main` drives it.

use async_trait::async_trait;
use lesson_sync_rs::ledger::{self, LessonRecord};
use lesson_sync_rs::parser;
use lesson_sync_rs::reconcile::{Candidate, Reconciler};
use lesson_sync_rs::storage::{AudioStore, StorageError};
use lesson_sync_rs::stream::{MessageStream, RawMessage, StreamError};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

/// In-memory audio store counting uploads
#[derive(Default)]
struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    uploads: Mutex<usize>,
}

impl MemoryStore {
    fn upload_count(&self) -> usize {
        *self.uploads.lock().expect("uploads lock")
    }

    fn seed(&self, name: &str) {
        self.objects
            .lock()
            .expect("objects lock")
            .insert(name.to_string(), vec![0xFF]);
    }
}

#[async_trait]
impl AudioStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .objects
            .lock()
            .expect("objects lock")
            .contains_key(name)
            .then(|| format!("media/{name}")))
    }

    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        *self.uploads.lock().expect("uploads lock") += 1;
        self.objects
            .lock()
            .expect("objects lock")
            .insert(name.to_string(), bytes);
        Ok(format!("media/{name}"))
    }

    fn public_url(&self, identifier: &str) -> String {
        format!("https://cdn.example.com/{identifier}")
    }
}

/// Stream serving a fixed newest-first window
struct FixedStream {
    window: Vec<RawMessage>,
}

#[async_trait]
impl MessageStream for FixedStream {
    async fn scan(&self, max_messages: usize) -> Result<Vec<RawMessage>, StreamError> {
        Ok(self.window.iter().take(max_messages).cloned().collect())
    }

    async fn fetch_payload(&self, message: &RawMessage) -> Result<Vec<u8>, StreamError> {
        Ok(message.caption.clone().into_bytes())
    }
}

fn post(message_id: i32, caption: &str) -> RawMessage {
    RawMessage {
        message_id,
        caption: caption.to_string(),
        file_id: format!("file-{message_id}"),
    }
}

/// One full reconciliation run against a ledger file, the way `main` does it
async fn run_once(
    store: &MemoryStore,
    stream: &FixedStream,
    ledger_path: &Path,
) -> (Vec<LessonRecord>, usize) {
    let known = ledger::load(ledger_path).expect("load ledger");
    let window = stream.scan(100).await.expect("scan");
    let candidates: Vec<Candidate> = window
        .into_iter()
        .map(|message| Candidate {
            caption: parser::parse(&message.caption),
            message,
        })
        .collect();

    let reconciler = Reconciler::new(store, stream);
    let outcome = reconciler
        .reconcile(known, candidates)
        .await
        .expect("reconcile");
    ledger::save(ledger_path, &outcome.ledger).expect("save ledger");
    (outcome.ledger, outcome.added)
}

#[tokio::test]
async fn full_run_merges_sorts_and_persists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lessons.json");
    let store = MemoryStore::default();
    // Newest first: lesson 9 posted after 7 and 5; an unnumbered notice mixed in
    let stream = FixedStream {
        window: vec![
            post(31, "الدرس 9\nباب التوكل\n1446/02/11"),
            post(30, "تنبيه للمستمعين"),
            post(29, "الدرس 7\nباب الخوف\n1446/02/04"),
            post(28, "الدرس 5\nباب الإخلاص\n1446/01/27"),
        ],
    };

    let (records, added) = run_once(&store, &stream, &path).await;

    assert_eq!(added, 3);
    assert_eq!(store.upload_count(), 3);
    let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![5, 7, 9]);
    assert_eq!(records[0].title, "Lesson 5");
    assert_eq!(records[0].file, "Lesson_5.mp3");
    assert_eq!(
        records[0].url,
        "https://cdn.example.com/media/Lesson_5.mp3"
    );
    assert_eq!(records[0].date, "1446/01/27");
}

#[tokio::test]
async fn repeated_runs_over_the_same_window_are_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lessons.json");
    let store = MemoryStore::default();
    let stream = FixedStream {
        window: vec![post(31, "الدرس 9"), post(28, "الدرس 5")],
    };

    let (_, first_added) = run_once(&store, &stream, &path).await;
    let first_bytes = std::fs::read(&path).expect("read ledger");

    let (_, second_added) = run_once(&store, &stream, &path).await;
    let second_bytes = std::fs::read(&path).expect("read ledger");

    assert_eq!(first_added, 2);
    assert_eq!(second_added, 0);
    assert_eq!(store.upload_count(), 2);
    assert_eq!(first_bytes, second_bytes);
}

#[tokio::test]
async fn orphaned_storage_object_is_adopted_without_upload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lessons.json");
    let store = MemoryStore::default();
    // A previous run uploaded lesson 5 but crashed before persisting
    store.seed("Lesson_5.mp3");
    let stream = FixedStream {
        window: vec![post(28, "الدرس 5")],
    };

    let (records, added) = run_once(&store, &stream, &path).await;

    assert_eq!(added, 1);
    assert_eq!(store.upload_count(), 0);
    assert_eq!(records[0].url, "https://cdn.example.com/media/Lesson_5.mp3");
}

#[tokio::test]
async fn overlapping_window_only_adds_the_gap() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lessons.json");
    let store = MemoryStore::default();

    let first = FixedStream {
        window: vec![post(29, "الدرس 7"), post(28, "الدرس 5")],
    };
    run_once(&store, &first, &path).await;

    // Next run sees a window overlapping the previous one plus one new lesson
    let second = FixedStream {
        window: vec![post(31, "الدرس 9"), post(29, "الدرس 7"), post(28, "الدرس 5")],
    };
    let (records, added) = run_once(&store, &second, &path).await;

    assert_eq!(added, 1);
    assert_eq!(store.upload_count(), 3);
    let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![5, 7, 9]);
}

#[tokio::test]
async fn scan_window_bound_limits_examined_messages() {
    let store = MemoryStore::default();
    let stream = FixedStream {
        window: vec![post(31, "الدرس 9"), post(29, "الدرس 7"), post(28, "الدرس 5")],
    };

    let window = stream.scan(2).await.expect("scan");
    assert_eq!(window.len(), 2);

    let candidates: Vec<Candidate> = window
        .into_iter()
        .map(|message| Candidate {
            caption: parser::parse(&message.caption),
            message,
        })
        .collect();
    let reconciler = Reconciler::new(&store, &stream);
    let outcome = reconciler
        .reconcile(Vec::new(), candidates)
        .await
        .expect("reconcile");

    // Lesson 5 is beyond the window and stays invisible to this run
    let ids: Vec<u32> = outcome.ledger.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![7, 9]);
}
