use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::webhook_api::DEFAULT_API_URL;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    /// Token of this bot. `BOT_TOKEN` in the environment takes precedence.
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Route Telegram posts updates to.
    #[serde(default = "default_path")]
    pub path: String,
    /// Public base URL of this server. When set, updates arrive through a
    /// webhook at `<public_url><path>`; otherwise the bot long-polls.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` header value.
    #[serde(default)]
    pub secret_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BehaviorConfig {
    #[serde(default = "default_notice_delete_after_ms")]
    pub notice_delete_after_ms: u64,
    /// Timeout for outbound webhook calls; unbounded when absent.
    #[serde(default)]
    pub api_timeout_secs: Option<u64>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_path() -> String {
    "/api/bot".to_string()
}

fn default_notice_delete_after_ms() -> u64 {
    5000
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_url: default_api_url(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            path: default_path(),
            public_url: None,
            secret_token: None,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            notice_delete_after_ms: default_notice_delete_after_ms(),
            api_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load `path` if it exists, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)?
        } else {
            info!(
                "No config file at {}, using defaults and environment",
                path.display()
            );
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Override file values with `BOT_TOKEN`, `PORT` and `WEBHOOK_SECRET`.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = var("BOT_TOKEN").filter(|t| !t.is_empty()) {
            self.telegram.bot_token = token;
        }
        if let Some(port) = var("PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {}", port))?;
            self.server.listen_addr.set_port(port);
        }
        if let Some(secret) = var("WEBHOOK_SECRET").filter(|s| !s.is_empty()) {
            self.server.secret_token = Some(secret);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            anyhow::bail!("BOT_TOKEN is not set (environment or [telegram] bot_token)");
        }
        if !self.server.path.starts_with('/') {
            anyhow::bail!("[server] path must start with '/': {}", self.server.path);
        }
        if let Some(secret) = &self.server.secret_token {
            if !is_valid_secret(secret) {
                anyhow::bail!(
                    "[server] secret_token must be 1-256 characters of A-Z, a-z, 0-9, '_' or '-'"
                );
            }
        }
        Ok(())
    }

    pub fn notice_delete_after(&self) -> Duration {
        Duration::from_millis(self.behavior.notice_delete_after_ms)
    }

    pub fn api_timeout(&self) -> Option<Duration> {
        self.behavior.api_timeout_secs.map(Duration::from_secs)
    }

    /// Full URL Telegram should deliver updates to, if one is configured.
    pub fn webhook_url(&self) -> Option<String> {
        self.server
            .public_url
            .as_ref()
            .map(|base| format!("{}{}", base.trim_end_matches('/'), self.server.path))
    }
}

/// Telegram only accepts these characters in `X-Telegram-Bot-Api-Secret-Token`.
fn is_valid_secret(secret: &str) -> bool {
    (1..=256).contains(&secret.len())
        && secret
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert_eq!(config.server.path, "/api/bot");
        assert_eq!(config.notice_delete_after(), Duration::from_millis(5000));
        assert_eq!(config.api_timeout(), None);
        assert_eq!(config.webhook_url(), None);
    }

    #[test]
    fn test_file_values() {
        let config = Config::from_toml(
            r#"
            [telegram]
            bot_token = "file-token"

            [server]
            listen_addr = "127.0.0.1:9000"
            path = "/hook"
            public_url = "https://bot.example.com/"

            [behavior]
            notice_delete_after_ms = 1000
            api_timeout_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.telegram.bot_token, "file-token");
        assert_eq!(config.server.listen_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(
            config.webhook_url().as_deref(),
            Some("https://bot.example.com/hook")
        );
        assert_eq!(config.notice_delete_after(), Duration::from_millis(1000));
        assert_eq!(config.api_timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_toml("[telegram]\nbot_token = \"file-token\"").unwrap();
        config
            .apply_env(env(&[
                ("BOT_TOKEN", "env-token"),
                ("PORT", "3000"),
                ("WEBHOOK_SECRET", "s3cret"),
            ]))
            .unwrap();
        assert_eq!(config.telegram.bot_token, "env-token");
        assert_eq!(config.server.listen_addr.port(), 3000);
        assert_eq!(config.server.secret_token.as_deref(), Some("s3cret"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = Config::default();
        assert!(config.apply_env(env(&[("PORT", "eighty")])).is_err());
    }

    #[test]
    fn test_missing_token_fails_validation() {
        let mut config = Config::default();
        config.apply_env(env(&[])).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn test_secret_token_charset_is_checked() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("BOT_TOKEN", "t"), ("WEBHOOK_SECRET", "has space")]))
            .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("secret_token"));

        config.server.secret_token = Some("ok_Secret-123".to_string());
        assert!(config.validate().is_ok());
    }
}
