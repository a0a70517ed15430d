//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.proactive/config.json`) and environment.
//! Every field has a default, so an empty `{}` file is a valid config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Bot identity.
    #[serde(default)]
    pub bot: BotConfig,

    /// Proactive notify settings.
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 3978).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Externally reachable base url, used in the notify hint sent to users. When unset the
    /// request's Host header is used.
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_gateway_port() -> u16 {
    3978
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            public_url: None,
        }
    }
}

/// Bot identity used when resuming conversations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// App id of this bot. Overridden by MICROSOFT_APP_ID env when set.
    pub app_id: Option<String>,
}

/// Notify trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyConfig {
    /// Upper bound for one proactive delivery before it is cancelled (default 30).
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_notify_timeout_secs() -> u64 {
    30
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

/// Resolve the bot app id: env MICROSOFT_APP_ID overrides config. Empty when neither is set.
pub fn resolve_app_id(config: &Config) -> String {
    std::env::var("MICROSOFT_APP_ID")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .bot
                .app_id
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_default()
}

/// Public base url from config, normalized to end with `/`. None when unset or blank.
pub fn resolve_public_url(config: &Config) -> Option<String> {
    config
        .gateway
        .public_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.ends_with('/') {
                s.to_string()
            } else {
                format!("{}/", s)
            }
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("PROACTIVE_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".proactive").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or PROACTIVE_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
