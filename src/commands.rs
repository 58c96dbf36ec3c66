//! Chat commands and their handlers.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use tracing::info;

use crate::app::App;
use crate::format::{help_message, start_message};
use crate::pipeline;
use crate::telegram::TelegramMessenger;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,

    #[command(description = "Get a random short video + creator info")]
    Shoti,

    #[command(description = "Show this help message")]
    Help,
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    app: Arc<App>,
) -> ResponseResult<()> {
    let user = msg
        .from
        .as_ref()
        .map(|u| u.username.clone().unwrap_or_else(|| u.first_name.clone()))
        .unwrap_or_else(|| "unknown".to_string());
    info!("📨 {:?} from {} in chat {}", cmd, user, msg.chat.id);

    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, start_message()).await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, help_message())
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Command::Shoti => {
            let messenger = TelegramMessenger::new(bot, msg.chat.id);
            pipeline::run(app.fetcher.as_ref(), &messenger).await;
        }
    }

    Ok(())
}
