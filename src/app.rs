//! Process-wide context: logging, the Telegram client and the fetcher.
//!
//! Built once by [`App::init`], shared with handlers through teloxide's
//! dependency injection, torn down when [`App::run`] returns.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

use crate::api::{ApiClient, Fetcher};
use crate::commands::{handle_command, Command};
use crate::config::Config;
use crate::telegram_log::TelegramLogLayer;

const LOG_FILE: &str = "shoti-bot.log";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to open log file: {0}")]
    LogFile(#[from] std::io::Error),

    #[error("failed to install logger: {0}")]
    Logger(#[from] TryInitError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub struct App {
    pub config: Config,
    pub bot: Bot,
    pub fetcher: Arc<dyn Fetcher>,
    _log_guard: WorkerGuard,
}

impl App {
    pub async fn init(config: Config) -> Result<Arc<Self>, AppError> {
        // One client for every Bot API call; the upload timeout has to cover
        // Telegram pulling the video from its URL.
        let client = teloxide::net::default_reqwest_settings()
            .connect_timeout(config.upload_timeout)
            .timeout(config.upload_timeout)
            .build()?;
        let bot = Bot::with_client(&config.telegram_bot_token, client);

        let log_guard = init_logging(&config, &bot)?;

        info!("🚀 Starting shoti-bot...");
        match &config.config_path {
            Some(path) => info!("Loaded config from {}", path.display()),
            None => info!("No config file, using defaults and environment"),
        }
        info!(
            video = %config.video_api_url,
            profile = %config.profile_api_url,
            "Fetch timeout {:?}, upload timeout {:?}",
            config.fetch_timeout,
            config.upload_timeout
        );

        let fetcher = ApiClient::new(
            config.video_api_url.clone(),
            config.profile_api_url.clone(),
            config.fetch_timeout,
        )?;

        Ok(Arc::new(Self {
            config,
            bot,
            fetcher: Arc::new(fetcher),
            _log_guard: log_guard,
        }))
    }

    /// Poll for updates until Ctrl-C.
    pub async fn run(self: Arc<Self>) {
        match self.bot.get_me().await {
            Ok(me) => info!("Bot user ID: {}, username: @{}", me.id, me.username()),
            Err(e) => warn!("Failed to get bot info: {e}"),
        }

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!("Failed to register command list: {e}");
        }

        let handler = Update::filter_message()
            .filter_command::<Command>()
            .endpoint(handle_command);

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![Arc::clone(&self)])
            .default_handler(|update: Arc<Update>| async move {
                debug!("Ignoring update {}", update.id.0);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "Error in command handler",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("👋 Dispatcher stopped, shutting down");
    }
}

fn init_logging(config: &Config, bot: &Bot) -> Result<WorkerGuard, AppError> {
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

    let telegram_layer = config
        .log_chat_id
        .map(|chat_id| TelegramLogLayer::new(bot.clone(), chat_id));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(telegram_layer)
        .try_init()?;

    Ok(guard)
}
