//! Runtime configuration parsed from environment variables.
//!
//! Every knob has a typed default so a bare environment yields a working
//! development setup against `http://localhost:5000`. Unparseable numeric
//! values fall back to their defaults; only the base URL is validated hard,
//! since every other layer depends on it.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_STATE_DIR: &str = ".folio-admin";
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1000;
pub const DEFAULT_TICK_SECS: u64 = 60;
pub const DEFAULT_ACTIVITY_LIMIT: usize = 10;
pub const DEFAULT_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid VITE_API_BASE_URL '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },
}

/// Deployment mode. Anything other than development counts as a deployed
/// build for the connection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Self::Development,
            _ => Self::Production,
        }
    }

    #[must_use]
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

/// Bounded, fixed-delay reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RECONNECT_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            request_secs: DEFAULT_HTTP_REQUEST_TIMEOUT_SECS,
            connect_secs: DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Backend origin without a trailing slash.
    pub api_base_url: String,
    pub mode: Mode,
    /// Directory holding the persisted session token.
    pub state_dir: PathBuf,
    pub reconnect: ReconnectPolicy,
    /// Period of the relative-time refresh.
    pub tick: Duration,
    /// Retained activity entries.
    pub activity_limit: usize,
    pub http: HttpTimeouts,
}

impl SyncConfig {
    /// Config with defaults for everything but the backend and mode.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if `api_base_url` is not an
    /// absolute `http`/`https` URL.
    pub fn new(api_base_url: &str, mode: Mode) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url)?,
            mode,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            reconnect: ReconnectPolicy::default(),
            tick: Duration::from_secs(DEFAULT_TICK_SECS),
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
            http: HttpTimeouts::default(),
        })
    }

    /// Build config from environment variables.
    ///
    /// All optional:
    /// - `VITE_API_BASE_URL`: backend origin, default `http://localhost:5000`
    /// - `MODE`: `development` (default) or any deployed mode name
    /// - `ADMIN_STATE_DIR`: token directory, default `.folio-admin`
    /// - `SYNC_RECONNECT_ATTEMPTS`: default 5
    /// - `SYNC_RECONNECT_DELAY_MS`: default 1000
    /// - `SYNC_TICK_SECS`: default 60
    /// - `SYNC_ACTIVITY_LIMIT`: default 10
    /// - `HTTP_REQUEST_TIMEOUT_SECS`: default 30
    /// - `HTTP_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] for a malformed base URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = std::env::var("VITE_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned());
        let mode = std::env::var("MODE").map(|m| Mode::parse(&m)).unwrap_or_default();

        let mut config = Self::new(&base, mode)?;
        if let Ok(dir) = std::env::var("ADMIN_STATE_DIR") {
            if !dir.trim().is_empty() {
                config.state_dir = PathBuf::from(dir);
            }
        }
        config.reconnect = ReconnectPolicy {
            attempts: env_parse("SYNC_RECONNECT_ATTEMPTS", DEFAULT_RECONNECT_ATTEMPTS),
            delay: Duration::from_millis(env_parse("SYNC_RECONNECT_DELAY_MS", DEFAULT_RECONNECT_DELAY_MS)),
        };
        config.tick = Duration::from_secs(env_parse("SYNC_TICK_SECS", DEFAULT_TICK_SECS).max(1));
        config.activity_limit = env_parse("SYNC_ACTIVITY_LIMIT", DEFAULT_ACTIVITY_LIMIT).max(1);
        config.http = HttpTimeouts {
            request_secs: env_parse("HTTP_REQUEST_TIMEOUT_SECS", DEFAULT_HTTP_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("HTTP_CONNECT_TIMEOUT_SECS", DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
        };
        Ok(config)
    }

    /// Replace the backend origin, validated as in [`SyncConfig::new`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] for a malformed URL.
    pub fn with_base_url(mut self, api_base_url: &str) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base_url(api_base_url)?;
        Ok(self)
    }

    /// Path of the persisted token file.
    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        self.state_dir.join(crate::session::store::TOKEN_KEY)
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
        value: raw.to_owned(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            value: raw.to_owned(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
