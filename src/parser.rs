//! Caption parsing for lesson announcements
//!
//! Turns the raw caption text of a channel post into a structured candidate
//! record. Pure string processing, no I/O.
//!
//! This module uses the `lazy-regex` crate so the marker pattern is validated
//! at compile time and initialized on first use.

use lazy_regex::lazy_regex;

/// Separator used when joining caption lines into the display description
pub const DESCRIPTION_SEPARATOR: &str = " <br> ";

/// Substrings marking a caption line as a Hijri calendar date
const DATE_MARKERS: [&str; 2] = ["144", "143"];

/// Match the lesson marker token followed by the lesson number
static RE_LESSON_ID: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"الدرس\s+(\d+)");

/// A candidate lesson extracted from a single caption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCaption {
    /// Lesson number; `None` when the caption carries no marker
    pub id: Option<u32>,
    /// Display title
    pub title: String,
    /// Caption lines joined with [`DESCRIPTION_SEPARATOR`]
    pub description: String,
    /// First line that looks like a Hijri date, empty if none matches
    pub date: String,
}

/// Parse a caption into a [`ParsedCaption`].
///
/// The lesson number is taken from the first occurrence of the marker token.
/// A caption without the marker (or with a number of zero) yields `id = None`
/// and is later dropped by the reconciler.
#[must_use]
pub fn parse(caption: &str) -> ParsedCaption {
    let id = RE_LESSON_ID
        .captures(caption)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|id| *id > 0);

    let lines: Vec<&str> = caption
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let title = id.map_or_else(
        || lines.first().copied().unwrap_or_default().to_string(),
        |id| format!("Lesson {id}"),
    );

    let description = lines.join(DESCRIPTION_SEPARATOR);

    let date = lines
        .iter()
        .find(|line| DATE_MARKERS.iter().any(|marker| line.contains(marker)))
        .copied()
        .unwrap_or_default()
        .to_string();

    ParsedCaption {
        id,
        title,
        description,
        date,
    }
}
