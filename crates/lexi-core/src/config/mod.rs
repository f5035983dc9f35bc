//! Client configuration.
//!
//! Provides `ClientConfig`, the JSON file shared by CLI and embedders to point
//! the sync engine at a remote store and tune its cycles.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::ConflictStrategy;
use crate::sync::SyncConfig;
use crate::util::{non_blank, remote_base_url};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Client configuration loaded from JSON.
///
/// Every field is optional; missing tuning values fall back to the
/// `SyncConfig` defaults. The auth token is a secret and is never printed.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub strategy: Option<ConflictStrategy>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub remote_timeout_secs: Option<u64>,
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
    #[serde(default)]
    pub tombstone_retention_days: Option<u64>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("remote_url", &self.remote_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("user_id", &self.user_id)
            .field("strategy", &self.strategy)
            .field("max_retries", &self.max_retries)
            .field("remote_timeout_secs", &self.remote_timeout_secs)
            .field("sync_interval_secs", &self.sync_interval_secs)
            .field("tombstone_retention_days", &self.tombstone_retention_days)
            .finish()
    }
}

impl ClientConfig {
    /// Normalize text fields and reject invalid values.
    pub fn validated(mut self) -> Result<Self> {
        self.remote_url = non_blank(self.remote_url)
            .map(|url| remote_base_url(&url))
            .transpose()?;
        self.auth_token = non_blank(self.auth_token);
        self.user_id = non_blank(self.user_id);

        if self.remote_timeout_secs == Some(0) {
            return Err(Error::Config("remote_timeout_secs must be positive".to_string()));
        }
        if self.sync_interval_secs == Some(0) {
            return Err(Error::Config("sync_interval_secs must be positive".to_string()));
        }
        Ok(self)
    }

    /// Whether a remote store is configured.
    pub const fn has_remote(&self) -> bool {
        self.remote_url.is_some()
    }

    /// Sync engine settings derived from this configuration.
    pub fn sync_config(&self) -> SyncConfig {
        let mut config = SyncConfig::new();
        if let Some(strategy) = self.strategy {
            config = config.with_strategy(strategy);
        }
        if let Some(max_retries) = self.max_retries {
            config = config.with_max_retries(max_retries);
        }
        if let Some(secs) = self.remote_timeout_secs {
            config = config.with_remote_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.sync_interval_secs {
            config = config.with_sync_interval(Duration::from_secs(secs));
        }
        if let Some(days) = self.tombstone_retention_days {
            config = config
                .with_tombstone_retention(Duration::from_secs(days.saturating_mul(SECS_PER_DAY)));
        }
        config
    }
}

/// Parse and validate a client configuration from a raw JSON payload.
pub fn parse_client_config(payload: &str) -> Result<ClientConfig> {
    let config: ClientConfig = serde_json::from_str(payload)
        .map_err(|error| Error::Config(format!("invalid client config JSON: {error}")))?;
    config.validated()
}

/// Load a client configuration file; a missing file yields the default.
pub fn load_client_config(path: impl AsRef<Path>) -> Result<ClientConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("No client config at {}, using defaults", path.display());
        return Ok(ClientConfig::default());
    }
    let payload = std::fs::read_to_string(path)?;
    parse_client_config(&payload)
}
