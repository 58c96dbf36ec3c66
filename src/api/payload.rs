//! Payload shapes decoded from successful upstream responses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A random short video, as found in the `shoti` object of the video envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPayload {
    pub title: String,
    pub username: String,
    pub nickname: String,
    /// Length in whole seconds.
    #[serde(deserialize_with = "seconds")]
    pub duration: u64,
    pub region: String,
    pub video_url: String,
}

/// Profile of the video's creator.
///
/// Only `username` is required. Optional fields that are absent, null or of
/// the wrong JSON type decode as `None` instead of rejecting the payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    pub username: String,
    #[serde(default, deserialize_with = "lenient")]
    pub nickname: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub signature: Option<String>,
    #[serde(default, deserialize_with = "count")]
    pub follower_count: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    pub following_count: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    pub heart_count: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    pub video_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub private_account: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub verified: Option<bool>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Counters arrive as integers, integral floats or digit strings depending on
/// the upstream mood.
fn count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_count))
}

fn value_to_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.round() as u64)
            })
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration {n}"))),
        other => Err(serde::de::Error::custom(format!(
            "duration must be a number, got {other}"
        ))),
    }
}
