//! Optional `tracing` layer that mirrors this crate's logs into a Telegram
//! chat.
//!
//! WARN/ERROR go out immediately. INFO is batched and flushed every
//! `FLUSH_INTERVAL` or once `MAX_BATCH` lines pile up.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const MAX_BATCH: usize = 50;
/// Telegram rejects messages over 4096 chars.
const MAX_MESSAGE_CHARS: usize = 4000;
/// Only events from this crate are forwarded; teloxide's own request logs
/// would otherwise feed back into the chat.
const FORWARDED_TARGET: &str = "shoti_bot";

enum LogLine {
    Urgent(String),
    Info(String),
}

pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<LogLine>,
}

impl TelegramLogLayer {
    /// Spawns the forwarding task; must be called inside a tokio runtime.
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogLine>();

        tokio::spawn(async move {
            let mut batch: Vec<String> = Vec::new();
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);

            loop {
                tokio::select! {
                    line = rx.recv() => match line {
                        Some(LogLine::Urgent(text)) => send_log(&bot, chat_id, &text).await,
                        Some(LogLine::Info(text)) => {
                            batch.push(text);
                            if batch.len() >= MAX_BATCH {
                                flush(&bot, chat_id, &mut batch).await;
                            }
                        }
                        None => {
                            flush(&bot, chat_id, &mut batch).await;
                            break;
                        }
                    },
                    _ = interval.tick() => flush(&bot, chat_id, &mut batch).await,
                }
            }
        });

        Self { tx }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_MESSAGE_CHARS {
        let truncated: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

async fn send_log(bot: &Bot, chat_id: ChatId, text: &str) {
    // No tracing here: the event would loop back into this layer.
    if let Err(e) = bot.send_message(chat_id, truncate(text)).await {
        eprintln!("Failed to send log to Telegram: {e}");
    }
}

async fn flush(bot: &Bot, chat_id: ChatId, batch: &mut Vec<String>) {
    if batch.is_empty() {
        return;
    }
    let combined = batch.join("\n");
    batch.clear();
    send_log(bot, chat_id, &combined).await;
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let fields = std::mem::take(&mut self.message);
            self.message = format!("{:?}", value);
            if !fields.is_empty() {
                self.message.push_str(&format!(" ({fields})"));
            }
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message
                .push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

fn line_for(level: Level, message: String) -> LogLine {
    match level {
        Level::ERROR => LogLine::Urgent(format!("❌ {message}")),
        Level::WARN => LogLine::Urgent(format!("⚠️ {message}")),
        _ => LogLine::Info(message),
    }
}

impl<S: Subscriber> Layer<S> for TelegramLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > Level::INFO || !metadata.target().starts_with(FORWARDED_TARGET) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if self.tx.send(line_for(*metadata.level(), visitor.message)).is_err() {
            eprintln!("Log channel closed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_text() {
        let long = "é".repeat(MAX_MESSAGE_CHARS + 10);
        let out = truncate(&long);
        assert_eq!(out.chars().count(), MAX_MESSAGE_CHARS + 3);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate("hello"), "hello");
    }

    #[test]
    fn test_levels() {
        assert!(matches!(line_for(Level::ERROR, "boom".into()), LogLine::Urgent(s) if s == "❌ boom"));
        assert!(matches!(line_for(Level::WARN, "hm".into()), LogLine::Urgent(s) if s == "⚠️ hm"));
        assert!(matches!(line_for(Level::INFO, "ok".into()), LogLine::Info(s) if s == "ok"));
    }
}
