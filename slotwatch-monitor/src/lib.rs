//! # slotwatch-monitor
//!
//! Polling engine that turns a node's performance samples into
//! [`NetworkMetrics`] snapshots, classifies their health and fans them out to
//! subscribers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slotwatch_monitor::{MonitorConfigPatch, NetworkMonitor, Output};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let monitor = NetworkMonitor::builder()
//!         .patch(MonitorConfigPatch {
//!             polling_interval_ms: Some(2000),
//!             ..Default::default()
//!         })
//!         .build()?;
//!
//!     // Write every snapshot to disk and log the health state
//!     let _file = monitor.attach(Output::file("metrics.json"))?;
//!     let _log = monitor.subscribe(|metrics| {
//!         println!("{} {}", metrics.slot_height, metrics.health());
//!     });
//!
//!     monitor.start();
//!     tokio::signal::ctrl_c().await?;
//!     monitor.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `json-rpc` (default): build a JSON-RPC source from the configured endpoint
//! - `prometheus`: serve the latest snapshot over HTTP for scraping

mod config;
mod error;
mod monitor;
mod output;
mod poller;
mod registry;
mod state;

#[cfg(feature = "prometheus")]
pub mod prometheus;

pub use config::{
    MonitorConfig, MonitorConfigPatch, DEFAULT_MAX_RETRIES, DEFAULT_POLLING_INTERVAL,
    DEFAULT_RPC_ENDPOINT, DEFAULT_TIMEOUT,
};
pub use error::{ConfigError, MonitorError};
pub use monitor::{NetworkMonitor, NetworkMonitorBuilder};
pub use output::Output;
pub use registry::{Callback, SubscriberRegistry, Subscription, SubscriptionId};
pub use state::MetricsCell;

#[cfg(feature = "prometheus")]
pub use prometheus::{PrometheusConfig, PrometheusExporter};

// Re-export for convenience
pub use slotwatch_rpc::{SampleSource, TransportError};
pub use slotwatch_types::{HealthState, NetworkMetrics, PerformanceSample};
