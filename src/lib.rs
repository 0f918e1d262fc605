#![deny(missing_docs)]
//! Telegram lesson archive sync.
//!
//! Pulls numbered audio lessons from a Telegram channel, stores the payloads
//! in S3-compatible object storage, and maintains the `lessons.json` ledger
//! consumed by the web player.

/// Configuration management
pub mod config;
/// Ledger persistence and the lesson record model
pub mod ledger;
/// Caption parsing
pub mod parser;
/// Reconciliation engine
pub mod reconcile;
/// Object storage layer (R2/S3)
pub mod storage;
/// Telegram channel scanning
pub mod stream;
