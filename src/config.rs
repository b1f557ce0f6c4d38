//! Configuration types for nav-query

use crate::error::{Error, Result};
use crate::types::{DEFAULT_BATCH_SIZE, MAX_RECORD_COUNT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public entry page of the bulk VAT-number lookup
pub const DEFAULT_START_URL: &str =
    "http://nav.gov.hu/nav/adatbazisok/adatbleker/afaalanyok/afaalanyok_csoportos";

/// Client configuration
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Page holding the iframe that points at the upload form
    #[serde(default = "default_start_url")]
    pub start_url: String,

    /// Identifiers per upload in streaming lookups (default: 128)
    ///
    /// Zero or anything above [`MAX_RECORD_COUNT`] falls back to the default.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound for any single HTTP request (default: 120 seconds)
    ///
    /// A call's own deadline shortens this further.
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// TCP/TLS connect timeout (default: 30 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_url: default_start_url(),
            batch_size: default_batch_size(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Batch size actually used for chunking
    pub fn effective_batch_size(&self) -> usize {
        if self.batch_size == 0 || self.batch_size > MAX_RECORD_COUNT {
            DEFAULT_BATCH_SIZE
        } else {
            self.batch_size
        }
    }

    /// Check the settings that would otherwise only fail on first use
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.start_url).map_err(|e| Error::Config {
            message: format!("invalid start URL {:?}: {}", self.start_url, e),
            key: Some("start_url".to_string()),
        })?;
        if self.request_timeout.is_zero() {
            return Err(Error::Config {
                message: "request timeout must be positive".to_string(),
                key: Some("request_timeout".to_string()),
            });
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::Config {
                message: "connect timeout must be positive".to_string(),
                key: Some("connect_timeout".to_string()),
            });
        }
        Ok(())
    }
}

fn default_start_url() -> String {
    DEFAULT_START_URL.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("nav-query/", env!("CARGO_PKG_VERSION")).to_string()
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
