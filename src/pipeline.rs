//! The `/shoti` pipeline: fetch video, send it, enrich with the creator's
//! profile.
//!
//! Every path ends in exactly one [`Outcome`]. The user sees either the video
//! (plus profile or a short notice) or the generic error notice, never raw
//! upstream data.

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::Fetcher;
use crate::format::{format_profile, format_profile_unavailable, format_video, GENERIC_ERROR};

/// Transient chat status shown while work is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    UploadVideo,
    Typing,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("send failed: {0}")]
pub struct SendError(pub String);

pub type SendResult = Result<(), SendError>;

/// Outbound side of one chat. All text is Telegram HTML.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_presence(&self, presence: Presence) -> SendResult;

    /// Send a video by URL with an HTML caption.
    async fn send_video(&self, url: &str, caption: &str) -> SendResult;

    async fn send_text(&self, body: &str, link_preview: bool) -> SendResult;
}

/// How a `/shoti` invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Video and profile both sent.
    Delivered,
    /// Video sent, profile lookup failed and the narrower notice went out.
    SecondaryDegraded,
    /// Video fetch failed.
    PrimaryFailed,
    /// Video fetched but sending it failed.
    SendFailed,
    /// Sending after the video failed, or the pipeline panicked.
    Aborted,
}

impl Outcome {
    /// The video reached the user.
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Delivered | Outcome::SecondaryDegraded)
    }
}

/// Run the pipeline once.
pub async fn run<F, M>(fetcher: &F, messenger: &M) -> Outcome
where
    F: Fetcher + ?Sized,
    M: Messenger + ?Sized,
{
    let outcome = match AssertUnwindSafe(run_steps(fetcher, messenger))
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("shoti pipeline panicked: {reason}");
            notify_generic_error(messenger).await;
            Outcome::Aborted
        }
    };
    info!("shoti finished: {:?}", outcome);
    outcome
}

async fn run_steps<F, M>(fetcher: &F, messenger: &M) -> Outcome
where
    F: Fetcher + ?Sized,
    M: Messenger + ?Sized,
{
    presence(messenger, Presence::UploadVideo).await;

    let video = match fetcher.fetch_video().await {
        Ok(video) => video,
        Err(e) => {
            warn!("Video unavailable: {e}");
            notify_generic_error(messenger).await;
            return Outcome::PrimaryFailed;
        }
    };

    let caption = format_video(&video);
    if let Err(e) = messenger.send_video(&video.video_url, &caption).await {
        warn!(url = %video.video_url, "Failed to send video: {e}");
        notify_generic_error(messenger).await;
        return Outcome::SendFailed;
    }

    presence(messenger, Presence::Typing).await;

    let subject = video.username;
    let (body, link_preview, degraded) = match fetcher.fetch_profile(&subject).await {
        Ok(profile) => (format_profile(&profile), false, false),
        Err(e) => {
            info!("No profile for @{subject}: {e}");
            (format_profile_unavailable(&subject), true, true)
        }
    };

    if let Err(e) = messenger.send_text(&body, link_preview).await {
        warn!("Failed to send profile for @{subject}: {e}");
        notify_generic_error(messenger).await;
        return Outcome::Aborted;
    }

    if degraded {
        Outcome::SecondaryDegraded
    } else {
        Outcome::Delivered
    }
}

async fn presence<M: Messenger + ?Sized>(messenger: &M, presence: Presence) {
    if let Err(e) = messenger.send_presence(presence).await {
        warn!("Failed to send {:?} indicator: {e}", presence);
    }
}

async fn notify_generic_error<M: Messenger + ?Sized>(messenger: &M) {
    if let Err(e) = messenger.send_text(GENERIC_ERROR, true).await {
        warn!("Failed to send error notice: {e}");
    }
}
