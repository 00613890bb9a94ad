//! The network metrics snapshot.

use crate::{DerivedMetrics, HealthState, Milliseconds};

/// A point-in-time view of cluster health metrics.
///
/// A monitor produces one of these per successful poll cycle and replaces its
/// previous snapshot wholesale; snapshots are never partially updated.
///
/// # Example
///
/// ```rust
/// use slotwatch_types::{HealthState, NetworkMetrics};
/// use std::time::Duration;
///
/// let metrics = NetworkMetrics::builder()
///     .slot_height(312_000_000)
///     .tps(1200)
///     .skip_rate(0.05)
///     .block_time(Duration::from_millis(300))
///     .build();
///
/// assert_eq!(metrics.health(), HealthState::Degraded);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct NetworkMetrics {
    /// Slot the node reported as current.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub slot_height: u64,

    /// Average slot duration over the latest sample window.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub block_time: Milliseconds,

    /// Unix timestamp (seconds) of the block at `slot_height`, if the node has one.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(2))]
    pub block_timestamp: Option<i64>,

    /// Transactions per second over the latest sample window.
    #[cfg_attr(feature = "minicbor", n(3))]
    pub tps: u64,

    /// Number of voting validators. Only present when validator tracking is enabled.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(4))]
    pub validator_count: Option<u64>,

    /// Skip rate over the latest sample window. May fall outside `[0, 1]`.
    #[cfg_attr(feature = "minicbor", n(5))]
    pub skip_rate: f64,

    /// Unix timestamp in milliseconds when this snapshot was taken.
    #[cfg_attr(feature = "minicbor", n(6))]
    pub timestamp_ms: u64,
}

impl NetworkMetrics {
    /// Create a builder for constructing snapshots.
    pub fn builder() -> NetworkMetricsBuilder {
        NetworkMetricsBuilder::new()
    }

    /// Classify this snapshot.
    pub fn health(&self) -> HealthState {
        HealthState::classify(self)
    }
}

/// Builder for `NetworkMetrics`.
#[derive(Debug, Default)]
pub struct NetworkMetricsBuilder {
    slot_height: u64,
    block_time: Milliseconds,
    block_timestamp: Option<i64>,
    tps: u64,
    validator_count: Option<u64>,
    skip_rate: f64,
    timestamp_ms: Option<u64>,
}

impl NetworkMetricsBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slot height.
    pub fn slot_height(mut self, slot: u64) -> Self {
        self.slot_height = slot;
        self
    }

    /// Set the average block time.
    pub fn block_time(mut self, block_time: impl Into<Milliseconds>) -> Self {
        self.block_time = block_time.into();
        self
    }

    /// Set the block timestamp reported for the slot.
    pub fn block_timestamp(mut self, timestamp: Option<i64>) -> Self {
        self.block_timestamp = timestamp;
        self
    }

    /// Set transactions per second.
    pub fn tps(mut self, tps: u64) -> Self {
        self.tps = tps;
        self
    }

    /// Set the validator count.
    pub fn validator_count(mut self, count: Option<u64>) -> Self {
        self.validator_count = count;
        self
    }

    /// Set the skip rate.
    pub fn skip_rate(mut self, skip_rate: f64) -> Self {
        self.skip_rate = skip_rate;
        self
    }

    /// Copy tps, skip rate and block time from derived sample metrics.
    pub fn derived(mut self, derived: DerivedMetrics) -> Self {
        self.tps = derived.tps;
        self.skip_rate = derived.skip_rate;
        self.block_time = derived.block_time;
        self
    }

    /// Set the snapshot timestamp. Defaults to now.
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> NetworkMetrics {
        NetworkMetrics {
            slot_height: self.slot_height,
            block_time: self.block_time,
            block_timestamp: self.block_timestamp,
            tps: self.tps,
            validator_count: self.validator_count,
            skip_rate: self.skip_rate,
            timestamp_ms: self.timestamp_ms.unwrap_or_else(current_timestamp_ms),
        }
    }
}

/// Current unix time in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
