use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    // Backend
    pub api_url: String,          // http://localhost:5000
    pub http_timeout_secs: u64,   // 15

    // Realtime prices
    pub stream_url: String,       // ws://localhost:5000/stream
    pub stream_enabled: bool,     // true
    pub reconnect_secs: u64,      // 5
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; missing keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            api_url: get("DASHBOARD_API_URL", "http://localhost:5000"),
            http_timeout_secs: get("DASHBOARD_HTTP_TIMEOUT_SECS", "15")
                .parse()
                .context("DASHBOARD_HTTP_TIMEOUT_SECS must be a whole number of seconds")?,

            stream_url: get("DASHBOARD_STREAM_URL", "ws://localhost:5000/stream"),
            stream_enabled: get("DASHBOARD_STREAM_ENABLED", "true")
                .parse()
                .context("DASHBOARD_STREAM_ENABLED must be true or false")?,
            reconnect_secs: get("DASHBOARD_RECONNECT_SECS", "5")
                .parse()
                .context("DASHBOARD_RECONNECT_SECS must be a whole number of seconds")?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            bail!("DASHBOARD_API_URL must be an http(s) URL, got {}", self.api_url);
        }
        if self.stream_enabled
            && !(self.stream_url.starts_with("ws://") || self.stream_url.starts_with("wss://"))
        {
            bail!("DASHBOARD_STREAM_URL must be a ws(s) URL, got {}", self.stream_url);
        }
        if self.http_timeout_secs == 0 {
            bail!("DASHBOARD_HTTP_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_secs)
    }
}
