//! Telegram bot that posts a random short video with its creator's profile.

pub mod api;
pub mod app;
pub mod commands;
pub mod config;
pub mod format;
pub mod pipeline;
pub mod telegram;
pub mod telegram_log;

pub use api::{ApiClient, Fetcher, FetchError, FetchResult, ProfilePayload, VideoPayload};
pub use pipeline::{Messenger, Outcome, Presence, SendError, SendResult};
