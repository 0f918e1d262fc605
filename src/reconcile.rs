//! Lesson reconciliation
//!
//! Decides which scanned lessons are missing from the ledger, uploads
//! payloads that are absent from storage, and merges new records into a
//! sorted ledger. This is the only component that mutates the ledger or
//! storage; collaborators are passed in per run, never held globally.

use crate::ledger::{sort_records, LessonRecord};
use crate::parser::ParsedCaption;
use crate::storage::{object_name, AudioStore, StorageError};
use crate::stream::{MessageStream, RawMessage, StreamError};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from a reconciliation pass
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Message stream failure
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
    /// Object storage failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A scanned message paired with its parsed caption
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Parse result for the caption text
    pub caption: ParsedCaption,
    /// The originating message, kept for payload download
    pub message: RawMessage,
}

/// Result of a reconciliation pass
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// The merged ledger, sorted ascending by lesson number
    pub ledger: Vec<LessonRecord>,
    /// Number of records added in this pass
    pub added: usize,
}

/// Reconciliation engine over the storage and stream collaborators
pub struct Reconciler<'a> {
    store: &'a dyn AudioStore,
    stream: &'a dyn MessageStream,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler borrowing the per-run collaborator handles
    #[must_use]
    pub const fn new(store: &'a dyn AudioStore, stream: &'a dyn MessageStream) -> Self {
        Self { store, stream }
    }

    /// Merge `candidates` into `ledger`, uploading payloads absent from
    /// storage. Candidates without a lesson number and candidates whose
    /// number is already in the ledger are skipped, which makes repeated
    /// runs over overlapping scan windows idempotent. An object already
    /// present under the deterministic name is adopted without re-upload,
    /// so orphans from a crashed run heal on the next one.
    ///
    /// # Errors
    ///
    /// Returns an error when a storage query, payload download, or upload
    /// fails; no partial ledger is returned.
    pub async fn reconcile(
        &self,
        mut ledger: Vec<LessonRecord>,
        candidates: Vec<Candidate>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let mut known: HashSet<u32> = ledger.iter().map(LessonRecord::sort_id).collect();
        let mut added = 0_usize;

        for candidate in candidates {
            let Some(id) = candidate.caption.id else {
                debug!(
                    message_id = candidate.message.message_id,
                    "No lesson number in caption, skipping"
                );
                continue;
            };
            if known.contains(&id) {
                info!(id, "Lesson already in ledger, skipping");
                continue;
            }

            let name = object_name(id);
            let identifier = match self.store.find_by_name(&name).await? {
                Some(existing) => {
                    info!(id, %name, "Reusing existing storage object");
                    existing
                }
                None => {
                    info!(id, %name, "Uploading lesson audio");
                    let bytes = self.stream.fetch_payload(&candidate.message).await?;
                    self.store.upload(&name, bytes).await?
                }
            };

            let url = self.store.public_url(&identifier);
            ledger.push(LessonRecord {
                id,
                title: candidate.caption.title,
                description: candidate.caption.description,
                date: candidate.caption.date,
                file: name,
                url,
            });
            known.insert(id);
            added += 1;
        }

        sort_records(&mut ledger);
        Ok(ReconcileOutcome { ledger, added })
    }
}
