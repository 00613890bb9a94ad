//! # slotwatch-rpc
//!
//! Sample sources for the slotwatch monitor.
//!
//! A [`SampleSource`] answers the three reads a poll cycle needs: the current
//! slot, the block time of a slot, and the most recent performance sample.
//! Each read fails independently with a [`TransportError`]; retries and
//! timeouts are the source's business, not the monitor's.
//!
//! ## Sources
//!
//! - **JSON-RPC** (`json-rpc` feature) - Polls a Solana-compatible node over
//!   HTTP with bounded retries and a per-request timeout
//!
//! ## Quick Start (JSON-RPC)
//!
//! ```rust,no_run
//! # #[cfg(feature = "json-rpc")]
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use slotwatch_rpc::json_rpc::JsonRpcSource;
//! use slotwatch_rpc::SampleSource;
//! use std::time::Duration;
//!
//! let source = JsonRpcSource::builder()
//!     .endpoint("https://api.mainnet-beta.solana.com")
//!     .timeout(Duration::from_secs(10))
//!     .max_retries(3)
//!     .build()?;
//!
//! let slot = source.fetch_current_slot().await?;
//! println!("current slot {}", slot);
//! # Ok(())
//! # }
//! ```

use std::fmt::Debug;

use async_trait::async_trait;

pub mod error;

#[cfg(feature = "json-rpc")]
pub mod json_rpc;

pub use error::TransportError;

// Re-export types for convenience
pub use slotwatch_types::PerformanceSample;

/// Remote reads a poll cycle is built from.
///
/// Implementations must treat every response as untrusted: payloads that do
/// not have the expected shape become [`TransportError::Parse`], or absent
/// values where the read allows absence.
#[async_trait]
pub trait SampleSource: Send + Sync + Debug {
    /// Fetch the slot the node currently considers latest.
    async fn fetch_current_slot(&self) -> Result<u64, TransportError>;

    /// Fetch the unix timestamp (seconds) of the block at `slot`.
    ///
    /// Returns `Ok(None)` when the node has no timestamp for that slot.
    async fn fetch_block_time(&self, slot: u64) -> Result<Option<i64>, TransportError>;

    /// Fetch the most recent performance sample.
    ///
    /// Returns `Ok(None)` when the node has no sample data, or when the
    /// sample it returned was malformed.
    async fn fetch_performance_sample(&self) -> Result<Option<PerformanceSample>, TransportError>;

    /// Fetch the number of currently voting validators.
    ///
    /// Sources that cannot answer this return `Ok(None)`.
    async fn fetch_validator_count(&self) -> Result<Option<u64>, TransportError> {
        Ok(None)
    }

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}
