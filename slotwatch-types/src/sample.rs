//! Raw performance samples and the metrics derived from them.

use crate::Milliseconds;

/// One performance sample window as reported by the node.
///
/// Field names follow the `getRecentPerformanceSamples` wire format when
/// the `serde` feature is enabled. Any of the counts may be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct PerformanceSample {
    /// Transactions processed during the window, votes included.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub num_transactions: u64,

    /// Length of the window in seconds.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub sample_period_secs: u64,

    /// Slots that elapsed during the window.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub num_slots: u64,

    /// Non-vote transactions processed during the window.
    #[cfg_attr(feature = "minicbor", n(3))]
    pub num_non_vote_transactions: u64,
}

impl PerformanceSample {
    /// Derive normalized metrics from this sample.
    pub fn derive(&self) -> DerivedMetrics {
        derive_metrics(Some(self))
    }
}

/// Metrics computed from a single performance sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedMetrics {
    /// Transactions per second, rounded to the nearest integer.
    pub tps: u64,

    /// `(slots - non-vote transactions) / slots`. Not clamped: malformed
    /// samples can push this below 0 or above 1.
    pub skip_rate: f64,

    /// Average slot duration over the window.
    pub block_time: Milliseconds,
}

/// Derive tps, skip rate and average slot time from an optional sample.
///
/// A missing sample or a zero-length window yields all zeros. A window with
/// no slots yields a zero skip rate and block time but still reports tps.
pub fn derive_metrics(sample: Option<&PerformanceSample>) -> DerivedMetrics {
    let Some(sample) = sample else {
        return DerivedMetrics::default();
    };

    if sample.sample_period_secs == 0 {
        return DerivedMetrics::default();
    }

    let tps = (sample.num_transactions as f64 / sample.sample_period_secs as f64).round() as u64;

    if sample.num_slots == 0 {
        return DerivedMetrics {
            tps,
            ..Default::default()
        };
    }

    let slots = sample.num_slots as f64;
    let skip_rate = (slots - sample.num_non_vote_transactions as f64) / slots;
    let block_time = (sample.sample_period_secs as f64 * 1000.0 / slots).round() as u64;

    DerivedMetrics {
        tps,
        skip_rate,
        block_time: Milliseconds::from_millis(block_time),
    }
}
