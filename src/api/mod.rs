//! Upstream HTTP APIs: the random video source and the profile lookup.

pub mod fetch;
pub mod payload;

pub use fetch::{
    classify_profile, classify_video, ApiClient, Endpoint, FetchError, FetchResult, Fetcher,
    VIDEO_SUCCESS_STATUS,
};
pub use payload::{ProfilePayload, VideoPayload};
