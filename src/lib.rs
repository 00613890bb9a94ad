//! # slotwatch
//!
//! Command-line front end for the slotwatch cluster health monitor.
//!
//! The heavy lifting lives in the workspace crates:
//!
//! ```text
//! ┌──────────────────┐    ┌───────────────────┐    ┌──────────────────┐
//! │  slotwatch-rpc   │───▶│ slotwatch-monitor │───▶│    slotwatch     │
//! │ (SampleSource)   │    │ (poll + fan-out)  │    │ (settings, CLI)  │
//! └──────────────────┘    └─────────┬─────────┘    └──────────────────┘
//!                                   │
//!                                   ▼
//!                         ┌───────────────────┐
//!                         │  slotwatch-types  │
//!                         │ (derive, classify)│
//!                         └───────────────────┘
//! ```
//!
//! This crate only adds what the binary needs on top:
//!
//! - **[`settings`]**: layered configuration (file, `SLOTWATCH_*` env, flags)
//! - **[`report`]**: terminal rendering of snapshots as text lines or JSON
//!
//! ## Usage
//!
//! ```bash
//! # Poll mainnet every 5 seconds and print one line per update
//! slotwatch
//!
//! # One JSON snapshot from a local validator, then exit
//! slotwatch --endpoint http://127.0.0.1:8899 --once --json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use slotwatch::report::Format;
//! use slotwatch::settings;
//! use slotwatch_monitor::{MonitorConfigPatch, NetworkMonitor};
//!
//! # tokio_test::block_on(async {
//! let config = settings::load(None, MonitorConfigPatch::default()).unwrap();
//! let monitor = NetworkMonitor::connect(config).unwrap();
//! let metrics = monitor.poll_now().await.unwrap();
//! println!("{}", Format::Line.render(&metrics).unwrap());
//! # });
//! ```

pub mod report;
pub mod settings;

pub use report::Format;
