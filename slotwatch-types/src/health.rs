//! Health classification of a metrics snapshot.
//!
//! Thresholds are fixed. Classification is a pure function of one snapshot:
//! there is no hysteresis, so a metric hovering around a threshold can flap
//! between adjacent polls.

use crate::NetworkMetrics;

/// Breach limits for one severity tier.
///
/// A tier is breached when any single limit is crossed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierLimits {
    /// Skip rate strictly above this breaches the tier.
    pub max_skip_rate: f64,
    /// Throughput strictly below this breaches the tier.
    pub min_tps: u64,
    /// Block time (ms) strictly above this breaches the tier.
    pub max_block_time_ms: u64,
}

impl TierLimits {
    /// Whether `metrics` crosses any limit of this tier.
    ///
    /// NaN skip rates never breach.
    pub fn is_breached_by(&self, metrics: &NetworkMetrics) -> bool {
        metrics.skip_rate > self.max_skip_rate
            || metrics.tps < self.min_tps
            || metrics.block_time.as_millis() > self.max_block_time_ms
    }
}

/// Limits for [`HealthState::Emergency`].
pub const EMERGENCY_LIMITS: TierLimits = TierLimits {
    max_skip_rate: 0.15,
    min_tps: 500,
    max_block_time_ms: 800,
};

/// Limits for [`HealthState::Degraded`].
pub const DEGRADED_LIMITS: TierLimits = TierLimits {
    max_skip_rate: 0.08,
    min_tps: 1500,
    max_block_time_ms: 500,
};

/// Cluster health, ordered by increasing severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(index_only))]
pub enum HealthState {
    #[default]
    #[cfg_attr(feature = "minicbor", n(0))]
    Nominal,
    #[cfg_attr(feature = "minicbor", n(1))]
    Degraded,
    #[cfg_attr(feature = "minicbor", n(2))]
    Emergency,
}

impl HealthState {
    /// Classify a snapshot. Emergency limits are checked before degraded ones.
    pub fn classify(metrics: &NetworkMetrics) -> Self {
        if EMERGENCY_LIMITS.is_breached_by(metrics) {
            HealthState::Emergency
        } else if DEGRADED_LIMITS.is_breached_by(metrics) {
            HealthState::Degraded
        } else {
            HealthState::Nominal
        }
    }

    /// Classify an optional snapshot.
    ///
    /// With no data yet this reports [`HealthState::Nominal`]: a monitor that
    /// has never completed a poll looks healthy. Callers that alert on health
    /// should check for the absence of metrics separately.
    pub fn classify_opt(metrics: Option<&NetworkMetrics>) -> Self {
        metrics.map_or(HealthState::Nominal, Self::classify)
    }

    /// Returns the upper-case label used in logs and exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Nominal => "NOMINAL",
            HealthState::Degraded => "DEGRADED",
            HealthState::Emergency => "EMERGENCY",
        }
    }

    /// Numeric severity (0 = nominal).
    pub fn severity(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
