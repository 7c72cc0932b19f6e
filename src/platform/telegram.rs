use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode, ReplyParameters};
use tracing::{info, warn};

use crate::command::{self, SpeedtestCommand};
use crate::platform::{CommandEvent, OutgoingReply, SentMessage, TextFormat};

const HELP_TEXT: &str = "Hello! I measure this server's network speed.\n\n\
                         Commands:\n\
                         /speedtest - Run a speed test (takes 30-60 seconds)";

/// A command message received in a Telegram chat
pub struct TelegramEvent {
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
}

impl TelegramEvent {
    pub fn new(bot: Bot, msg: &Message) -> Self {
        Self {
            bot,
            chat_id: msg.chat.id,
            message_id: msg.id,
        }
    }
}

#[async_trait]
impl CommandEvent for TelegramEvent {
    async fn reply(&self, reply: OutgoingReply) -> Result<SentMessage> {
        let reply_to = ReplyParameters::new(self.message_id);

        let sent = match reply.attachment {
            Some(url) => {
                let url = reqwest::Url::parse(&url)
                    .with_context(|| format!("Invalid attachment URL: {}", url))?;
                let mut request = self
                    .bot
                    .send_photo(self.chat_id, InputFile::url(url))
                    .caption(reply.text)
                    .reply_parameters(reply_to);
                if reply.format == TextFormat::Html {
                    request = request.parse_mode(ParseMode::Html);
                }
                request.await.context("Failed to send photo")?
            }
            None => {
                let mut request = self
                    .bot
                    .send_message(self.chat_id, reply.text)
                    .reply_parameters(reply_to);
                if reply.format == TextFormat::Html {
                    request = request.parse_mode(ParseMode::Html);
                }
                request.await.context("Failed to send message")?
            }
        };

        Ok(SentMessage(sent.id.0))
    }

    async fn delete(&self, message: SentMessage) -> Result<()> {
        self.bot
            .delete_message(self.chat_id, MessageId(message.0))
            .await
            .context("Failed to delete message")?;
        Ok(())
    }
}

/// Run the Telegram bot platform.
/// An empty `allowed_user_ids` admits every user.
pub async fn run(
    command: Arc<SpeedtestCommand>,
    allowed_user_ids: Vec<u64>,
    bot: Bot,
) -> Result<()> {
    info!("Starting Telegram platform...");

    let handler = Update::filter_message()
        .filter_map(move |msg: Message| {
            let user = msg.from.as_ref()?;
            if allowed_user_ids.is_empty() || allowed_user_ids.contains(&user.id.0) {
                Some(msg)
            } else {
                None
            }
        })
        .endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![command])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    command: Arc<SpeedtestCommand>,
) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t,
        None => return Ok(()),
    };

    if text == "/start" {
        bot.send_message(msg.chat.id, HELP_TEXT).await?;
        return Ok(());
    }

    if !command::is_trigger(text) {
        return Ok(());
    }

    let user_id = msg.from.as_ref().map(|u| u.id.0).unwrap_or_default();
    info!("Speedtest requested by user {} in chat {}", user_id, msg.chat.id);

    // Run detached so a long measurement never holds up this chat's update queue.
    let event = TelegramEvent::new(bot, &msg);
    tokio::spawn(async move {
        let outcome = command.handle(&event).await;
        info!("Speedtest in chat {} ended: {:?}", event.chat_id, outcome);
    });

    Ok(())
}
