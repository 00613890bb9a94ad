//! Monitor configuration and field-by-field overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default time between poll cycles.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(5000);

/// Default RPC endpoint (public mainnet).
pub const DEFAULT_RPC_ENDPOINT: &str = "https://api.mainnet-beta.solana.com";

/// Default retry ceiling handed to the transport.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-request timeout handed to the transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Configuration for a [`NetworkMonitor`](crate::NetworkMonitor).
///
/// Immutable once a monitor is built. `max_retries` and `timeout` are not
/// used by the monitor itself; they are forwarded to the sample source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Time between poll cycles.
    pub polling_interval: Duration,
    /// Node to poll. Opaque to the monitor.
    pub rpc_endpoint: String,
    /// Transport retry ceiling.
    pub max_retries: u32,
    /// Transport per-request timeout.
    pub timeout: Duration,
    /// Also fetch the voting validator count each cycle.
    pub track_validators: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            polling_interval: DEFAULT_POLLING_INTERVAL,
            rpc_endpoint: DEFAULT_RPC_ENDPOINT.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            track_validators: false,
        }
    }
}

impl MonitorConfig {
    /// Defaults with `patch` applied on top.
    pub fn from_patch(patch: MonitorConfigPatch) -> Result<Self, ConfigError> {
        Self::default().apply(patch)
    }

    /// Apply every field set in `patch`, then validate.
    pub fn apply(mut self, patch: MonitorConfigPatch) -> Result<Self, ConfigError> {
        if let Some(ms) = patch.polling_interval_ms {
            self.polling_interval = Duration::from_millis(ms);
        }
        if let Some(endpoint) = patch.rpc_endpoint {
            self.rpc_endpoint = endpoint;
        }
        if let Some(retries) = patch.max_retries {
            self.max_retries = retries;
        }
        if let Some(ms) = patch.timeout_ms {
            self.timeout = Duration::from_millis(ms);
        }
        if let Some(track) = patch.track_validators {
            self.track_validators = track;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check that durations are positive and the endpoint is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling_interval.is_zero() {
            return Err(ConfigError::ZeroPollingInterval);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.rpc_endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        Ok(())
    }
}

/// A partial [`MonitorConfig`]. Unset fields keep their current value.
///
/// This is the shape configuration files and environment variables are
/// deserialized into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfigPatch {
    pub polling_interval_ms: Option<u64>,
    pub rpc_endpoint: Option<String>,
    pub max_retries: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub track_validators: Option<bool>,
}

impl MonitorConfigPatch {
    /// Layer `other` over `self`; fields set in `other` win.
    pub fn merge(self, other: MonitorConfigPatch) -> Self {
        Self {
            polling_interval_ms: other.polling_interval_ms.or(self.polling_interval_ms),
            rpc_endpoint: other.rpc_endpoint.or(self.rpc_endpoint),
            max_retries: other.max_retries.or(self.max_retries),
            timeout_ms: other.timeout_ms.or(self.timeout_ms),
            track_validators: other.track_validators.or(self.track_validators),
        }
    }
}
