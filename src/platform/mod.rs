pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// How the text of an outgoing reply should be interpreted by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Html,
    Plain,
}

/// A reply to the triggering message
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingReply {
    pub text: String,
    pub format: TextFormat,
    /// Image URL sent along with the text (as a caption)
    pub attachment: Option<String>,
}

impl OutgoingReply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Plain,
            attachment: None,
        }
    }
}

/// Platform-specific ID of a message this bot sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage(pub i32);

/// The incoming command message, as seen by a command handler.
/// Platforms implement this; the handler never touches the platform directly.
#[async_trait]
pub trait CommandEvent: Send + Sync {
    /// Send a reply to the triggering message
    async fn reply(&self, reply: OutgoingReply) -> Result<SentMessage>;

    /// Delete a message previously sent through `reply`
    async fn delete(&self, message: SentMessage) -> Result<()>;
}
