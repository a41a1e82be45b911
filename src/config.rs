//! Configuration types for helios-client

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Helios API root
pub const DEFAULT_API_URL: &str = "https://api.helios.earth/v1";

/// Pagination limits understood by the remote service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when a query does not specify one (default: 100)
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Largest page size a caller may request (default: 100)
    #[serde(default = "default_limit")]
    pub max_limit: u64,

    /// Hard ceiling on `skip`; results beyond it cannot be retrieved (default: 4000)
    #[serde(default = "default_max_skip")]
    pub max_skip: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_limit(),
            max_skip: default_max_skip(),
        }
    }
}

/// Retry configuration for transient request failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts per request (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for a [`Session`](crate::session::Session)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// API root, without trailing slash (default: "https://api.helios.earth/v1")
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Verify TLS certificates (default: true)
    #[serde(default = "default_true")]
    pub ssl_verify: bool,

    /// Timeout applied to every individual request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Maximum in-flight requests per batch (default: 20)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Pagination limits
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Per-request retry behavior
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ssl_verify: true,
            request_timeout: default_request_timeout(),
            max_concurrency: default_max_concurrency(),
            user_agent: default_user_agent(),
            pagination: PaginationConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Build a configuration from the defaults overlaid with environment variables
    ///
    /// Recognized variables:
    /// - `HELIOS_API_URL`
    /// - `HELIOS_MAX_CONCURRENCY`
    /// - `HELIOS_SSL_VERIFY` (`1`, `0`, `true`, `false`)
    /// - `HELIOS_REQUEST_TIMEOUT` (seconds)
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the variable if a value cannot be parsed,
    /// or if the resulting configuration fails [`Config::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("HELIOS_API_URL") {
            config.api_url = url;
        }
        if let Some(raw) = lookup("HELIOS_MAX_CONCURRENCY") {
            config.max_concurrency = raw.trim().parse().map_err(|_| {
                Error::config(
                    format!("expected a positive integer, got {raw:?}"),
                    Some("HELIOS_MAX_CONCURRENCY"),
                )
            })?;
        }
        if let Some(raw) = lookup("HELIOS_SSL_VERIFY") {
            config.ssl_verify = parse_bool(&raw).ok_or_else(|| {
                Error::config(
                    format!("expected one of 1, 0, true, false; got {raw:?}"),
                    Some("HELIOS_SSL_VERIFY"),
                )
            })?;
        }
        if let Some(raw) = lookup("HELIOS_REQUEST_TIMEOUT") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::config(
                    format!("expected whole seconds, got {raw:?}"),
                    Some("HELIOS_REQUEST_TIMEOUT"),
                )
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Strip the trailing slash from `api_url` so paths can be appended blindly
    pub fn normalize(&mut self) {
        let trimmed = self.api_url.trim_end_matches('/').len();
        self.api_url.truncate(trimmed);
    }

    /// Check invariants the engine relies on
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(Error::config("api_url must not be empty", Some("api_url")));
        }
        if self.max_concurrency == 0 {
            return Err(Error::config(
                "max_concurrency must be at least 1",
                Some("max_concurrency"),
            ));
        }
        let p = &self.pagination;
        if p.default_limit == 0 || p.max_limit == 0 {
            return Err(Error::config(
                "page limits must be at least 1",
                Some("pagination"),
            ));
        }
        if p.default_limit > p.max_limit {
            return Err(Error::config(
                format!(
                    "default_limit ({}) exceeds max_limit ({})",
                    p.default_limit, p.max_limit
                ),
                Some("pagination.default_limit"),
            ));
        }
        if p.max_skip == 0 {
            return Err(Error::config(
                "max_skip must be at least 1",
                Some("pagination.max_skip"),
            ));
        }

        let r = &self.retry;
        if !r.backoff_multiplier.is_finite() || r.backoff_multiplier < 1.0 {
            return Err(Error::config(
                format!(
                    "backoff_multiplier must be a finite number >= 1.0, got {}",
                    r.backoff_multiplier
                ),
                Some("retry.backoff_multiplier"),
            ));
        }
        if r.initial_delay > r.max_delay {
            return Err(Error::config(
                format!(
                    "initial_delay ({:?}) exceeds max_delay ({:?})",
                    r.initial_delay, r.max_delay
                ),
                Some("retry.initial_delay"),
            ));
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_user_agent() -> String {
    concat!("helios-client/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_true() -> bool {
    true
}

fn default_limit() -> u64 {
    100
}

fn default_max_skip() -> u64 {
    4000
}

fn default_max_concurrency() -> usize {
    20
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
