//! # slotwatch-types
//!
//! Core types for cluster health monitoring. This crate defines the metrics
//! snapshot produced by a slotwatch monitor, the raw performance sample it is
//! derived from, and the health classification consumers alert on.
//!
//! Everything here is pure: derivation and classification never fail and never
//! touch the network, so they can be reused by any transport or UI.
//!
//! ## Features
//!
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//! - `minicbor`: Compact binary serialization via CBOR
//! - `all`: Enable all serialization formats
//!
//! ## Example
//!
//! ```rust
//! use slotwatch_types::{HealthState, NetworkMetrics, PerformanceSample};
//!
//! let sample = PerformanceSample {
//!     num_transactions: 180_000,
//!     sample_period_secs: 60,
//!     num_slots: 150,
//!     num_non_vote_transactions: 141,
//! };
//!
//! let metrics = NetworkMetrics::builder()
//!     .slot_height(250_000_000)
//!     .derived(sample.derive())
//!     .build();
//!
//! assert_eq!(metrics.tps, 3000);
//! assert_eq!(metrics.health(), HealthState::Nominal);
//! ```

mod duration;
mod health;
mod metrics;
mod sample;

pub use duration::*;
pub use health::*;
pub use metrics::*;
pub use sample::*;
