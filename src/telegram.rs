//! Telegram side of the pipeline using teloxide.

use async_trait::async_trait;
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, LinkPreviewOptions, ParseMode};
use tracing::{debug, info};

use crate::pipeline::{Messenger, Presence, SendError, SendResult};

/// Sends into one chat. Cheap to build per command.
pub struct TelegramMessenger {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramMessenger {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

fn send_error(what: &str, e: impl std::fmt::Display) -> SendError {
    SendError(format!("{what}: {e}"))
}

fn disabled_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_presence(&self, presence: Presence) -> SendResult {
        let action = match presence {
            Presence::UploadVideo => ChatAction::UploadVideo,
            Presence::Typing => ChatAction::Typing,
        };
        self.bot
            .send_chat_action(self.chat_id, action)
            .await
            .map(|_| ())
            .map_err(|e| send_error("chat action", e))
    }

    async fn send_video(&self, url: &str, caption: &str) -> SendResult {
        let url = Url::parse(url).map_err(|e| send_error("bad video url", e))?;
        info!("🎬 Sending video to chat {}: {}", self.chat_id, url);

        // Telegram downloads the file itself; the client timeout set in
        // `App::init` bounds how long we wait for it.
        self.bot
            .send_video(self.chat_id, InputFile::url(url))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .supports_streaming(true)
            .await
            .map(|msg| debug!("Video sent as message {}", msg.id.0))
            .map_err(|e| send_error("send video", e))
    }

    async fn send_text(&self, body: &str, link_preview: bool) -> SendResult {
        let mut request = self
            .bot
            .send_message(self.chat_id, body)
            .parse_mode(ParseMode::Html);

        if !link_preview {
            request = request.link_preview_options(disabled_preview());
        }

        request
            .await
            .map(|msg| debug!("Text sent as message {}", msg.id.0))
            .map_err(|e| send_error("send message", e))
    }
}
