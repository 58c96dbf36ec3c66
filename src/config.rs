use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::ChatId;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "shoti.json";
pub const TOKEN_ENV_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const DEFAULT_VIDEO_API_URL: &str = "https://kaiz-apis.gleeze.com/api/shoti";
pub const DEFAULT_PROFILE_API_URL: &str = "https://kaiz-apis.gleeze.com/api/tikstalk";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[error("failed to parse config file '{}': {source}", path.display())]
    ParseJson { path: PathBuf, source: serde_json::Error },

    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Overridden by `TELEGRAM_BOT_TOKEN` when that is set.
    #[serde(default)]
    telegram_bot_token: String,
    #[serde(default = "default_video_api_url")]
    video_api_url: String,
    #[serde(default = "default_profile_api_url")]
    profile_api_url: String,
    #[serde(default = "default_fetch_timeout_secs")]
    fetch_timeout_secs: u64,
    /// Bounds the Telegram client, including video uploads.
    #[serde(default = "default_upload_timeout_secs")]
    upload_timeout_secs: u64,
    /// Chat that receives a copy of the logs.
    log_chat_id: Option<i64>,
    /// Directory for log files. Defaults to current directory.
    data_dir: Option<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            telegram_bot_token: String::new(),
            video_api_url: default_video_api_url(),
            profile_api_url: default_profile_api_url(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            upload_timeout_secs: default_upload_timeout_secs(),
            log_chat_id: None,
            data_dir: None,
        }
    }
}

fn default_video_api_url() -> String {
    DEFAULT_VIDEO_API_URL.to_string()
}

fn default_profile_api_url() -> String {
    DEFAULT_PROFILE_API_URL.to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_upload_timeout_secs() -> u64 {
    60
}

#[derive(Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub video_api_url: String,
    pub profile_api_url: String,
    pub fetch_timeout: Duration,
    pub upload_timeout: Duration,
    pub log_chat_id: Option<ChatId>,
    pub data_dir: PathBuf,
    /// File the config was read from, if any.
    pub config_path: Option<PathBuf>,
}

impl Config {
    /// Load from `path`, or from `shoti.json` if it exists, or from defaults
    /// and the environment alone.
    pub fn discover(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        });
        match path {
            Some(path) => Self::load(path),
            None => Self::resolve(ConfigFile::default(), None, env_token()),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;
        Self::resolve(file, Some(config_path), env_token())
    }

    fn resolve(
        file: ConfigFile,
        config_path: Option<PathBuf>,
        env_token: Option<String>,
    ) -> Result<Self, ConfigError> {
        let telegram_bot_token = env_token.unwrap_or(file.telegram_bot_token);
        if telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation(format!(
                "telegram_bot_token is required (config file or {TOKEN_ENV_VAR})"
            )));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }

        check_url("video_api_url", &file.video_api_url)?;
        check_url("profile_api_url", &file.profile_api_url)?;

        if file.fetch_timeout_secs == 0 {
            return Err(ConfigError::Validation("fetch_timeout_secs must be positive".into()));
        }
        if file.upload_timeout_secs == 0 {
            return Err(ConfigError::Validation("upload_timeout_secs must be positive".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token,
            video_api_url: file.video_api_url,
            profile_api_url: file.profile_api_url,
            fetch_timeout: Duration::from_secs(file.fetch_timeout_secs),
            upload_timeout: Duration::from_secs(file.upload_timeout_secs),
            log_chat_id: file.log_chat_id.map(ChatId),
            data_dir,
            config_path,
        })
    }
}

fn env_token() -> Option<String> {
    std::env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty())
}

fn check_url(key: &'static str, url: &str) -> Result<(), ConfigError> {
    reqwest::Url::parse(url)
        .map(|_| ())
        .map_err(|e| ConfigError::Validation(format!("{key} '{url}' is not a valid url: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TOKEN: &str = "123456789:ABCdefGHIjklMNOpqrsTUVwxyz";

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn parse(content: &str, env_token: Option<&str>) -> Result<Config, ConfigError> {
        let file: ConfigFile = serde_json::from_str(content).unwrap();
        Config::resolve(file, None, env_token.map(String::from))
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_defaults() {
        let config = parse(&format!(r#"{{"telegram_bot_token": "{TOKEN}"}}"#), None).unwrap();
        assert_eq!(config.video_api_url, DEFAULT_VIDEO_API_URL);
        assert_eq!(config.profile_api_url, DEFAULT_PROFILE_API_URL);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.upload_timeout, Duration::from_secs(60));
        assert_eq!(config.log_chat_id, None);
        assert_eq!(config.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_env_token_overrides_file() {
        let config = parse(r#"{"telegram_bot_token": "1:file"}"#, Some("2:env")).unwrap();
        assert_eq!(config.telegram_bot_token, "2:env");
    }

    #[test]
    fn test_env_token_alone() {
        let config = parse("{}", Some(TOKEN)).unwrap();
        assert_eq!(config.telegram_bot_token, TOKEN);
    }

    #[test]
    fn test_missing_token() {
        let err = assert_err(parse("{}", None));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let err = assert_err(parse(r#"{"telegram_bot_token": "invalid_token_no_colon"}"#, None));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_non_numeric_id() {
        let err = assert_err(parse(r#"{"telegram_bot_token": "notanumber:ABCdef"}"#, None));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_token_format_empty_secret() {
        let err = assert_err(parse(r#"{"telegram_bot_token": "123456789:"}"#, None));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_url() {
        let err = assert_err(parse(r#"{"video_api_url": "not a url"}"#, Some(TOKEN)));
        assert!(err.to_string().contains("video_api_url"));
    }

    #[test]
    fn test_zero_timeout() {
        let err = assert_err(parse(r#"{"fetch_timeout_secs": 0}"#, Some(TOKEN)));
        assert!(err.to_string().contains("fetch_timeout_secs"));
    }

    #[test]
    fn test_overrides() {
        let config = parse(
            r#"{
                "video_api_url": "http://localhost:8080/shoti",
                "fetch_timeout_secs": 3,
                "upload_timeout_secs": 120,
                "log_chat_id": -100123,
                "data_dir": "/var/lib/shoti"
            }"#,
            Some(TOKEN),
        )
        .unwrap();
        assert_eq!(config.video_api_url, "http://localhost:8080/shoti");
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.upload_timeout, Duration::from_secs(120));
        assert_eq!(config.log_chat_id, Some(ChatId(-100123)));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/shoti"));
    }

    #[test]
    fn test_load_file() {
        let file = write_config(&format!(r#"{{"telegram_bot_token": "{TOKEN}"}}"#));
        let config = Config::load(file.path());
        // TELEGRAM_BOT_TOKEN may be set in the environment running the tests.
        if std::env::var(TOKEN_ENV_VAR).is_err() {
            let config = config.expect("should load valid config");
            assert_eq!(config.telegram_bot_token, TOKEN);
            assert_eq!(config.config_path.as_deref(), Some(file.path()));
        }
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
