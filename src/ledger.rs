//! Lesson ledger persistence
//!
//! The ledger is a pretty-printed JSON array of [`LessonRecord`] consumed by
//! the web player. It is read once at the start of a run and rewritten
//! atomically at the end, so a crash mid-write never leaves a truncated file.

use lazy_regex::lazy_regex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading or persisting the ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Failed to atomically replace the ledger file
    #[error("persist error: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Match the first run of digits embedded in a title
static RE_TITLE_DIGITS: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\d+");

/// One known lesson. Field order here is the on-disk key order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LessonRecord {
    /// Canonical lesson number; zero only on legacy records missing the field
    #[serde(default)]
    pub id: u32,
    /// Display title
    pub title: String,
    /// Caption lines joined for display
    #[serde(default)]
    pub description: String,
    /// Raw date line from the caption, possibly empty
    #[serde(default)]
    pub date: String,
    /// Deterministic object name in storage
    #[serde(default)]
    pub file: String,
    /// Retrieval link for the audio payload
    pub url: String,
}

impl LessonRecord {
    /// Ordering key: the typed `id`, falling back to digits embedded in the
    /// title for legacy records that predate the typed field.
    #[must_use]
    pub fn sort_id(&self) -> u32 {
        if self.id > 0 {
            return self.id;
        }
        RE_TITLE_DIGITS
            .find(&self.title)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    }
}

/// Load the ledger, returning an empty list when the file does not exist.
///
/// # Errors
///
/// Returns an error when the file cannot be read or is not valid JSON.
pub fn load(path: &Path) -> Result<Vec<LessonRecord>, LedgerError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(LedgerError::Io(e)),
    }
}

/// Persist the ledger: write to a temporary file in the target directory,
/// then rename over the destination. Non-ASCII text is written verbatim.
///
/// # Errors
///
/// Returns an error when serialization, the temporary write, or the final
/// rename fails.
pub fn save(path: &Path, records: &[LessonRecord]) -> Result<(), LedgerError> {
    let body = serde_json::to_string_pretty(records)?;
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(body.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// Sort records ascending by [`LessonRecord::sort_id`].
pub fn sort_records(records: &mut [LessonRecord]) {
    records.sort_by_key(LessonRecord::sort_id);
}
