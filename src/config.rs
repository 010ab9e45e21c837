//! Configuration management

use anyhow::Result;
use std::path::PathBuf;

/// Default rule file, relative to the working directory
pub const DEFAULT_DATA_PATH: &str = "auto_replies.json";

/// Default exchange-rate API host
pub const DEFAULT_EXCHANGE_BASE_URL: &str = "https://v6.exchangerate-api.com";

/// Default RSS host for `/analisis` topics
pub const DEFAULT_NEWS_BASE_URL: &str = "https://id.investing.com";

/// Bot configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token (required)
    pub discord_token: String,

    /// Auto-reply rule file
    pub data_path: PathBuf,

    /// exchangerate-api.com key (optional - `/convert` fails without it)
    pub exchange_api_key: Option<String>,

    /// Exchange-rate API base URL
    pub exchange_base_url: String,

    /// RSS host for news topics
    pub news_base_url: String,

    /// Only serve `/analisis` in this guild (unset = any guild)
    pub analisis_guild_id: Option<String>,

    /// Only serve `/analisis` in this channel (unset = any channel)
    pub analisis_channel_id: Option<String>,

    /// Timeout for outbound HTTP requests in seconds
    pub http_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let discord_token = std::env::var("DISCORD_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DISCORD_BOT_TOKEN not set"))?;

        let data_path = std::env::var("AUTOREPLY_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH));

        let exchange_api_key = non_empty_var("EXCHANGERATE_API_KEY");

        let exchange_base_url = std::env::var("EXCHANGERATE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_EXCHANGE_BASE_URL.to_string());

        let news_base_url = std::env::var("NEWS_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_NEWS_BASE_URL.to_string());

        let http_timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            discord_token,
            data_path,
            exchange_api_key,
            exchange_base_url,
            news_base_url,
            analisis_guild_id: non_empty_var("ANALISIS_GUILD_ID"),
            analisis_channel_id: non_empty_var("ANALISIS_CHANNEL_ID"),
            http_timeout_secs,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_is_error() {
        temp_env::with_var_unset("DISCORD_BOT_TOKEN", || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("DISCORD_BOT_TOKEN", Some("token")),
                ("AUTOREPLY_DATA_PATH", None),
                ("EXCHANGERATE_API_KEY", None),
                ("EXCHANGERATE_BASE_URL", None),
                ("NEWS_BASE_URL", None),
                ("ANALISIS_GUILD_ID", None),
                ("ANALISIS_CHANNEL_ID", None),
                ("HTTP_TIMEOUT_SECS", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.discord_token, "token");
                assert_eq!(config.data_path, PathBuf::from(DEFAULT_DATA_PATH));
                assert!(config.exchange_api_key.is_none());
                assert_eq!(config.exchange_base_url, DEFAULT_EXCHANGE_BASE_URL);
                assert_eq!(config.news_base_url, DEFAULT_NEWS_BASE_URL);
                assert!(config.analisis_guild_id.is_none());
                assert_eq!(config.http_timeout_secs, 10);
            },
        );
    }

    #[test]
    fn test_overrides() {
        temp_env::with_vars(
            [
                ("DISCORD_BOT_TOKEN", Some("token")),
                ("AUTOREPLY_DATA_PATH", Some("/tmp/rules.json")),
                ("EXCHANGERATE_API_KEY", Some("key")),
                ("ANALISIS_GUILD_ID", Some("910866740567748628")),
                ("ANALISIS_CHANNEL_ID", Some("  ")),
                ("HTTP_TIMEOUT_SECS", Some("3")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.data_path, PathBuf::from("/tmp/rules.json"));
                assert_eq!(config.exchange_api_key.as_deref(), Some("key"));
                assert_eq!(config.analisis_guild_id.as_deref(), Some("910866740567748628"));
                assert!(config.analisis_channel_id.is_none());
                assert_eq!(config.http_timeout_secs, 3);
            },
        );
    }
}
