//! Error types for the monitor.

use slotwatch_rpc::TransportError;
use thiserror::Error;

/// Invalid monitor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("polling interval must be greater than zero")]
    ZeroPollingInterval,

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("RPC endpoint must not be empty")]
    EmptyEndpoint,
}

/// Errors that can occur while building a monitor or attaching outputs.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The sample source could not be created.
    #[error("failed to create sample source: {0}")]
    Source(#[from] TransportError),

    /// No sample source was given and none can be built from the config.
    #[error("no sample source configured")]
    MissingSource,

    /// An output could not be opened.
    #[error("failed to open output: {0}")]
    Output(#[source] std::io::Error),
}
