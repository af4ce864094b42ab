//! Configuration for talking to the extraction engine.
//!
//! Everything the controllers need to know about the engine lives in
//! [`EngineConfig`], built via [`EngineConfigBuilder`]. The defaults match an
//! engine started locally with its stock settings, so most callers only use
//! [`EngineConfig::default()`].

use crate::error::SessionError;
use serde::{Deserialize, Serialize};

/// Default engine address: the local engine listens on port 8002.
pub const DEFAULT_ENGINE_URL: &str = "http://localhost:8002";

/// Default advisory upload limit: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Settings for the engine client and the local upload checks.
///
/// # Example
/// ```rust
/// use documinter::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .base_url("http://127.0.0.1:9000")
///     .process_timeout_secs(600)
///     .build()
///     .unwrap();
/// assert_eq!(config.endpoint("process"), "http://127.0.0.1:9000/process");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root URL of the engine. Default: `http://localhost:8002`.
    pub base_url: String,

    /// Largest file accepted for upload, in bytes. Default: 50 MiB.
    ///
    /// Checked locally; an oversized file never reaches the engine.
    pub max_upload_bytes: u64,

    /// Timeout for the `/upload` call in seconds. Default: 120.
    pub upload_timeout_secs: u64,

    /// Timeout for the `/process` call in seconds. Default: 300.
    ///
    /// Clean-mode extraction of a long document is the slowest thing the
    /// engine does.
    pub process_timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENGINE_URL.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_timeout_secs: 120,
            process_timeout_secs: 300,
            connect_timeout_secs: 10,
        }
    }
}

impl EngineConfig {
    /// Create a new builder for `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full URL for an engine route, e.g. `endpoint("upload")`.
    pub fn endpoint(&self, route: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs;
        self
    }

    pub fn process_timeout_secs(mut self, secs: u64) -> Self {
        self.config.process_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, SessionError> {
        let c = &self.config;
        let url = c.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SessionError::InvalidConfig(format!(
                "engine URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(SessionError::InvalidConfig(
                "upload limit must be ≥ 1 byte".into(),
            ));
        }
        if c.upload_timeout_secs == 0 || c.process_timeout_secs == 0 || c.connect_timeout_secs == 0 {
            return Err(SessionError::InvalidConfig("timeouts must be ≥ 1s".into()));
        }
        let mut config = self.config;
        config.base_url = config.base_url.trim().to_string();
        Ok(config)
    }
}
