//! Single-shot GET + JSON decode + success/failure classification.
//!
//! Every outcome is a `FetchResult`; nothing here panics or propagates a raw
//! transport error to the caller.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::payload::{ProfilePayload, VideoPayload};

/// Value of the video envelope's `status` field on success.
///
/// Source of truth is the live `/api/shoti` response; any other value,
/// including a missing field, is a failure.
pub const VIDEO_SUCCESS_STATUS: &str = "success";

/// Key of the nested payload inside the video envelope.
const VIDEO_PAYLOAD_KEY: &str = "shoti";

/// Which upstream API a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Video,
    Profile,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Video => write!(f, "video"),
            Endpoint::Profile => write!(f, "profile"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection error, timeout, non-2xx status or unreadable body.
    #[error("{endpoint} request failed: {detail}")]
    Transport { endpoint: Endpoint, detail: String },

    /// The body decoded but carries an explicit failure marker.
    #[error("{endpoint} API reported failure: {marker}")]
    Upstream { endpoint: Endpoint, marker: String },

    /// The body is not JSON, or lacks a required payload field.
    #[error("{endpoint} API returned a malformed body: {detail}")]
    Malformed { endpoint: Endpoint, detail: String },
}

impl FetchError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            FetchError::Transport { endpoint, .. }
            | FetchError::Upstream { endpoint, .. }
            | FetchError::Malformed { endpoint, .. } => *endpoint,
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Source of video and profile payloads.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch one random video.
    async fn fetch_video(&self) -> FetchResult<VideoPayload>;

    /// Look up a creator profile. A leading `@` on `handle` is ignored.
    async fn fetch_profile(&self, handle: &str) -> FetchResult<ProfilePayload>;
}

/// HTTP implementation of [`Fetcher`].
pub struct ApiClient {
    video_url: String,
    profile_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(
        video_url: impl Into<String>,
        profile_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            video_url: video_url.into(),
            profile_url: profile_url.into(),
            http,
        })
    }

    fn url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Video => &self.video_url,
            Endpoint::Profile => &self.profile_url,
        }
    }

    /// Issue the GET and return the raw body of a 2xx response.
    async fn get(&self, endpoint: Endpoint, query: &[(&str, &str)]) -> FetchResult<Vec<u8>> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            endpoint,
            detail: e.to_string(),
        };

        let response = self
            .http
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport)?;

        let body = response.bytes().await.map_err(transport)?;
        debug!("{endpoint} API returned {} bytes", body.len());
        Ok(body.to_vec())
    }
}

#[async_trait]
impl Fetcher for ApiClient {
    async fn fetch_video(&self) -> FetchResult<VideoPayload> {
        let result = match self.get(Endpoint::Video, &[]).await {
            Ok(body) => classify_video(&body),
            Err(e) => Err(e),
        };
        if let Err(ref e) = result {
            warn!(url = %self.video_url, "Video fetch failed: {e}");
        }
        result
    }

    async fn fetch_profile(&self, handle: &str) -> FetchResult<ProfilePayload> {
        let username = handle.trim_start_matches('@');
        let result = match self.get(Endpoint::Profile, &[("username", username)]).await {
            Ok(body) => classify_profile(&body),
            Err(e) => Err(e),
        };
        if let Err(ref e) = result {
            warn!(url = %self.profile_url, username, "Profile fetch failed: {e}");
        }
        result
    }
}

/// Classify a 2xx body from the video API.
///
/// Expected envelope: `{"status": "success", "shoti": {...}}`.
pub fn classify_video(body: &[u8]) -> FetchResult<VideoPayload> {
    let endpoint = Endpoint::Video;
    let envelope = decode_object(endpoint, body)?;

    match envelope.get("status") {
        Some(Value::String(s)) if s == VIDEO_SUCCESS_STATUS => {}
        Some(other) => {
            return Err(FetchError::Upstream {
                endpoint,
                marker: format!("status = {other}"),
            });
        }
        None => {
            return Err(FetchError::Upstream {
                endpoint,
                marker: "status missing".into(),
            });
        }
    }

    let payload = envelope
        .get(VIDEO_PAYLOAD_KEY)
        .cloned()
        .ok_or_else(|| FetchError::Malformed {
            endpoint,
            detail: format!("missing `{VIDEO_PAYLOAD_KEY}` object"),
        })?;
    shape(endpoint, payload)
}

/// Classify a 2xx body from the profile API.
///
/// The payload is the body itself; a truthy top-level `error` marks failure.
pub fn classify_profile(body: &[u8]) -> FetchResult<ProfilePayload> {
    let endpoint = Endpoint::Profile;
    let body = decode_object(endpoint, body)?;

    if let Some(error) = body.get("error").filter(|e| is_truthy(e)) {
        return Err(FetchError::Upstream {
            endpoint,
            marker: format!("error = {error}"),
        });
    }

    shape(endpoint, body)
}

fn decode_object(endpoint: Endpoint, body: &[u8]) -> FetchResult<Value> {
    let value: Value = serde_json::from_slice(body).map_err(|e| FetchError::Malformed {
        endpoint,
        detail: e.to_string(),
    })?;
    if !value.is_object() {
        return Err(FetchError::Malformed {
            endpoint,
            detail: "top-level JSON is not an object".into(),
        });
    }
    Ok(value)
}

fn shape<T: DeserializeOwned>(endpoint: Endpoint, value: Value) -> FetchResult<T> {
    serde_json::from_value(value).map_err(|e| FetchError::Malformed {
        endpoint,
        detail: e.to_string(),
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
