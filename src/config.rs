use crate::util::{env_flag, is_local_backend_url};
use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_REFRESH_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Neutral Chat backend, no trailing slash.
    pub api_url: String,
    /// Sent verbatim in every chat-stream request body.
    pub use_web_search: bool,
    /// Period of the dashboard watch refresh.
    pub refresh_interval: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url = std::env::var("NEUTRAL_API_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let use_web_search = env_flag("NEUTRAL_USE_WEB_SEARCH").unwrap_or(true);

        let refresh_secs = std::env::var("NEUTRAL_REFRESH_SECONDS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_REFRESH_SECS)
            .clamp(5, 3600);

        Ok(Self {
            api_url,
            use_web_search,
            refresh_interval: Duration::from_secs(refresh_secs),
        })
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = Url::parse(&self.api_url)
            .with_context(|| format!("NEUTRAL_API_URL '{}' is not a valid URL", self.api_url))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => anyhow::bail!(
                "NEUTRAL_API_URL '{}' uses unsupported scheme '{other}'",
                self.api_url
            ),
        }

        if parsed.scheme() == "http" && !is_local_backend_url(&self.api_url) {
            eprintln!(
                "warning: backend '{}' is remote but not https; credentials travel in the clear",
                self.api_url
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults_without_env() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::remove_var("NEUTRAL_API_URL");
        std::env::remove_var("NEUTRAL_USE_WEB_SEARCH");
        std::env::remove_var("NEUTRAL_REFRESH_SECONDS");

        let config = Config::load().expect("load should succeed");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.use_web_search);
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_load_strips_trailing_slash_and_reads_flags() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var("NEUTRAL_API_URL", "https://theneutralai.com/");
        std::env::set_var("NEUTRAL_USE_WEB_SEARCH", "off");
        std::env::set_var("NEUTRAL_REFRESH_SECONDS", "2");

        let config = Config::load().expect("load should succeed");
        assert_eq!(config.api_url, "https://theneutralai.com");
        assert!(!config.use_web_search);
        // Below the floor, clamped up.
        assert_eq!(config.refresh_interval, Duration::from_secs(5));

        std::env::remove_var("NEUTRAL_API_URL");
        std::env::remove_var("NEUTRAL_USE_WEB_SEARCH");
        std::env::remove_var("NEUTRAL_REFRESH_SECONDS");
    }

    #[test]
    fn test_validate_rejects_garbage_url() {
        let config = Config {
            api_url: "not a url".to_string(),
            use_web_search: true,
            refresh_interval: Duration::from_secs(30),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let config = Config {
            api_url: "ftp://localhost:8000".to_string(),
            use_web_search: true,
            refresh_interval: Duration::from_secs(30),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_local_http() {
        let config = Config {
            api_url: "http://localhost:8000".to_string(),
            use_web_search: true,
            refresh_interval: Duration::from_secs(30),
        };
        assert!(config.validate().is_ok());
    }
}
