//! Configuration management for the sync host.

use quotesync_engine::ResolutionPolicy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Mock endpoint the quote feed is polled from by default.
pub const DEFAULT_REMOTE_URL: &str = "https://jsonplaceholder.typicode.com/posts";

/// Category given to remote records that carry none.
pub const DEFAULT_CATEGORY: &str = "ServerData";

/// Host configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint returning the remote quote array
    pub remote_url: String,
    /// Directory holding persisted state
    pub data_dir: PathBuf,
    /// Period between timer-triggered syncs
    pub sync_interval: Duration,
    /// Conflict resolution policy
    pub policy: ResolutionPolicy,
    /// Category for remote records without one
    pub default_category: String,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            data_dir: PathBuf::from("./data"),
            sync_interval: Duration::from_secs(5),
            policy: ResolutionPolicy::ServerWins,
            default_category: DEFAULT_CATEGORY.to_string(),
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let remote_url = lookup("QUOTESYNC_REMOTE_URL").unwrap_or(defaults.remote_url);
        if !(remote_url.starts_with("http://") || remote_url.starts_with("https://")) {
            return Err(ConfigError::InvalidRemoteUrl(remote_url));
        }

        let data_dir = lookup("QUOTESYNC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let sync_interval = match lookup("QUOTESYNC_INTERVAL_SECS") {
            Some(raw) => parse_secs(&raw).ok_or(ConfigError::InvalidInterval(raw))?,
            None => defaults.sync_interval,
        };

        let policy = match lookup("QUOTESYNC_POLICY") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidPolicy(raw))?,
            None => defaults.policy,
        };

        let default_category = lookup("QUOTESYNC_DEFAULT_CATEGORY")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(defaults.default_category);

        let http_timeout = match lookup("QUOTESYNC_HTTP_TIMEOUT_SECS") {
            Some(raw) => parse_secs(&raw).ok_or(ConfigError::InvalidTimeout(raw))?,
            None => defaults.http_timeout,
        };

        Ok(Self {
            remote_url,
            data_dir,
            sync_interval,
            policy,
            default_category,
            http_timeout,
        })
    }
}

fn parse_secs(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(secs) => Some(Duration::from_secs(secs)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("QUOTESYNC_REMOTE_URL must be an http(s) URL, got {0:?}")]
    InvalidRemoteUrl(String),

    #[error("Invalid QUOTESYNC_INTERVAL_SECS value {0:?}")]
    InvalidInterval(String),

    #[error("Invalid QUOTESYNC_POLICY value {0:?} (expected server, local or manual)")]
    InvalidPolicy(String),

    #[error("Invalid QUOTESYNC_HTTP_TIMEOUT_SECS value {0:?}")]
    InvalidTimeout(String),
}
