//! Configuration module
//!
//! Client settings are read from `KOLLUS_`-prefixed environment variables,
//! with an optional `.env` file loaded first.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://c-api-kr.kollus.com";
pub const DEFAULT_UPLOAD_URL: &str = "https://upload.kr.kollus.com";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

const ENV_PREFIX: &str = "KOLLUS_";

/// Raw environment shape, before defaults are normalized.
#[derive(Deserialize)]
struct EnvConfig {
    access_token: String,
    #[serde(default = "default_api_url")]
    api_url: String,
    #[serde(default = "default_upload_url")]
    upload_url: String,
    http_timeout_secs: Option<u64>,
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_upload_url() -> String {
    DEFAULT_UPLOAD_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Connection settings for the upload client and progress monitor.
#[derive(Clone)]
pub struct ClientConfig {
    pub access_token: String,
    /// Host serving `create-url` for normal uploads
    pub api_base_url: String,
    /// Host serving `create_url` for passthrough and filelive uploads
    pub upload_base_url: String,
    /// Transport-level timeout; `None` leaves requests unbounded
    pub http_timeout: Option<Duration>,
    pub poll_interval: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("access_token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("upload_base_url", &self.upload_base_url)
            .field("http_timeout", &self.http_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_base_url: DEFAULT_API_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_URL.to_string(),
            http_timeout: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Load from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load from an explicit set of variables. Only `KOLLUS_`-prefixed
    /// entries are read.
    pub fn from_vars<I>(vars: I) -> Result<Self, anyhow::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env: EnvConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .map_err(|e| anyhow::anyhow!("Invalid KOLLUS_* configuration: {}", e))?;

        let config = Self {
            access_token: env.access_token,
            api_base_url: env.api_url.trim_end_matches('/').to_string(),
            upload_base_url: env.upload_url.trim_end_matches('/').to_string(),
            http_timeout: env.http_timeout_secs.map(Duration::from_secs),
            poll_interval: Duration::from_millis(env.poll_interval_ms),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.access_token.trim().is_empty() {
            return Err(anyhow::anyhow!("KOLLUS_ACCESS_TOKEN must not be empty"));
        }

        for (name, url) in [
            ("KOLLUS_API_URL", &self.api_base_url),
            ("KOLLUS_UPLOAD_URL", &self.upload_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow::anyhow!(
                    "{} must be an http(s) URL, got '{}'",
                    name,
                    url
                ));
            }
        }

        if self.poll_interval.is_zero() {
            return Err(anyhow::anyhow!(
                "KOLLUS_POLL_INTERVAL_MS must be greater than zero"
            ));
        }

        Ok(())
    }
}
