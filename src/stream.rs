//! Telegram channel scanning
//!
//! Pulls a bounded window of recent channel posts over the Bot API and
//! downloads audio payloads. Session handling, rate limiting and transport
//! errors are teloxide's concern; failures propagate to the caller as-is.

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::payloads::GetUpdatesSetters;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, FileId, Message, UpdateKind};
use thiserror::Error;
use tracing::{debug, info};

/// Updates fetched per `getUpdates` batch (Bot API maximum)
const BATCH_SIZE: u8 = 100;

/// Errors from the Telegram transport
#[derive(Error, Debug)]
pub enum StreamError {
    /// Bot API request failed
    #[error("Telegram request error: {0}")]
    Request(#[from] teloxide::RequestError),
    /// File download failed
    #[error("Telegram download error: {0}")]
    Download(#[from] teloxide::DownloadError),
}

/// A channel post carrying an audio payload and caption text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Telegram message id within the channel
    pub message_id: i32,
    /// Caption text attached to the audio
    pub caption: String,
    /// Telegram file id of the audio payload
    pub file_id: String,
}

/// Interface for the message stream collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStream: Send + Sync {
    /// Scan the most recent window of channel posts, newest first, keeping
    /// only posts that carry both an audio payload and a non-empty caption.
    /// `max_messages` bounds how many updates are examined, not correctness.
    async fn scan(&self, max_messages: usize) -> Result<Vec<RawMessage>, StreamError>;
    /// Download the audio payload of a scanned message
    async fn fetch_payload(&self, message: &RawMessage) -> Result<Vec<u8>, StreamError>;
}

/// Bot API backed stream for a single channel
pub struct TelegramStream {
    bot: Bot,
    channel: String,
}

impl TelegramStream {
    /// Create a stream over the given bot token, scoped to one channel
    /// handle (`@username` or numeric chat id)
    #[must_use]
    pub fn new(token: &str, channel: &str) -> Self {
        Self {
            bot: Bot::new(token),
            channel: channel.to_string(),
        }
    }

    /// Convert a channel post into a [`RawMessage`], filtering out posts
    /// from other chats and posts without audio or caption text
    fn to_raw(&self, msg: &Message) -> Option<RawMessage> {
        if !channel_matches(&self.channel, msg.chat.username(), msg.chat.id.0) {
            return None;
        }
        let audio = msg.audio()?;
        let caption = msg.caption()?.trim();
        if caption.is_empty() {
            return None;
        }
        Some(RawMessage {
            message_id: msg.id.0,
            caption: caption.to_string(),
            file_id: audio.file.id.0.clone(),
        })
    }
}

/// True when a chat belongs to the configured channel handle
fn channel_matches(channel: &str, username: Option<&str>, chat_id: i64) -> bool {
    username == Some(channel.trim_start_matches('@')) || chat_id.to_string() == channel
}

#[async_trait]
impl MessageStream for TelegramStream {
    async fn scan(&self, max_messages: usize) -> Result<Vec<RawMessage>, StreamError> {
        let mut collected = Vec::new();
        let mut offset: Option<i32> = None;
        let mut examined = 0_usize;

        loop {
            let mut request = self
                .bot
                .get_updates()
                .limit(BATCH_SIZE)
                .allowed_updates([AllowedUpdate::ChannelPost]);
            if let Some(off) = offset {
                request = request.offset(off);
            }

            let batch = request.await?;
            if batch.is_empty() {
                break;
            }
            offset = batch
                .last()
                .map(|u| i32::try_from(u.id.0).unwrap_or(i32::MAX).saturating_add(1));

            for update in batch {
                examined += 1;
                if let UpdateKind::ChannelPost(msg) = update.kind {
                    if let Some(raw) = self.to_raw(&msg) {
                        collected.push(raw);
                    }
                }
            }

            if examined >= max_messages {
                break;
            }
        }

        // getUpdates yields oldest first; reconciliation expects newest first
        collected.reverse();
        info!(
            scanned = examined,
            matched = collected.len(),
            "Scanned channel window"
        );
        Ok(collected)
    }

    async fn fetch_payload(&self, message: &RawMessage) -> Result<Vec<u8>, StreamError> {
        let file = self.bot.get_file(FileId(message.file_id.clone())).await?;
        let mut buf = Vec::new();
        self.bot.download_file(&file.path, &mut buf).await?;
        debug!(
            message_id = message.message_id,
            size = buf.len(),
            "Downloaded audio payload"
        );
        Ok(buf)
    }
}
