//! Telegram HTML rendering of payloads and static command replies.

use crate::api::{ProfilePayload, VideoPayload};

/// Placeholder for any field the upstream left out.
pub const MISSING: &str = "N/A";

pub const GENERIC_ERROR: &str =
    "⚠️ An error occurred while processing your request. Please try again later.";

/// Escape text for Telegram's HTML parse mode.
fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            _ => result.push(c),
        }
    }
    result
}

/// `1234567` -> `1,234,567`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn text_or_missing(value: Option<&str>) -> String {
    value.map(html_escape).unwrap_or_else(|| MISSING.to_string())
}

fn count_or_missing(value: Option<u64>) -> String {
    value.map(group_thousands).unwrap_or_else(|| MISSING.to_string())
}

fn flag_or_missing(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "Yes",
        Some(false) => "No",
        None => MISSING,
    }
}

/// Caption attached to the video message.
pub fn format_video(video: &VideoPayload) -> String {
    format!(
        "🎬 <b>{}</b>\n\
         📛 Username: @{}\n\
         🏷 Nickname: {}\n\
         ⏱ Duration: {} seconds\n\
         🌍 Region: {}\n\n",
        html_escape(&video.title),
        html_escape(&video.username),
        html_escape(&video.nickname),
        video.duration,
        html_escape(&video.region),
    )
}

/// Creator profile block sent after the video.
pub fn format_profile(profile: &ProfilePayload) -> String {
    format!(
        "📊 <b>TikTok User Info</b>\n\n\
         👤 <b>Username:</b> @{}\n\
         📛 <b>Nickname:</b> {}\n\
         📝 <b>Bio:</b> {}\n\
         ❤️ <b>Followers:</b> {}\n\
         👀 <b>Following:</b> {}\n\
         👍 <b>Likes:</b> {}\n\
         🎥 <b>Videos:</b> {}\n\
         🔒 <b>Private:</b> {}\n\
         ✔️ <b>Verified:</b> {}\n\n",
        html_escape(&profile.username),
        text_or_missing(profile.nickname.as_deref()),
        text_or_missing(profile.signature.as_deref()),
        count_or_missing(profile.follower_count),
        count_or_missing(profile.following_count),
        count_or_missing(profile.heart_count),
        count_or_missing(profile.video_count),
        flag_or_missing(profile.private_account),
        flag_or_missing(profile.verified),
    )
}

/// Notice sent when the profile lookup fails after the video went out.
pub fn format_profile_unavailable(username: &str) -> String {
    format!(
        "ℹ️ Couldn't fetch additional info for @{}",
        html_escape(username.trim_start_matches('@'))
    )
}

/// Reply to `/start`. Plain text.
pub fn start_message() -> &'static str {
    "👋 Welcome to Shoti Video Bot!\n\n\
     Use /shoti to get:\n\
     - A random short video\n\
     - Creator information\n\
     - TikTok profile stats\n\n\
     Enjoy! 😊"
}

/// Reply to `/help`. HTML.
pub fn help_message() -> &'static str {
    "🆘 <b>Shoti Video Bot Help</b>\n\n\
     <b>Commands:</b>\n\
     /start - Start the bot\n\
     /shoti - Get a random short video + creator info\n\
     /help - Show this help message\n\n\
     ⚠️ Note: All data is fetched from public APIs."
}
