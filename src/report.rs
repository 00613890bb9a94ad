//! Rendering snapshots for the terminal.

use serde::Serialize;
use slotwatch_types::{HealthState, NetworkMetrics};

/// How snapshots are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// One human-readable line.
    #[default]
    Line,
    /// One JSON object per line.
    Json,
}

impl Format {
    pub fn render(&self, metrics: &NetworkMetrics) -> serde_json::Result<String> {
        match self {
            Format::Line => Ok(format_line(metrics)),
            Format::Json => format_json(metrics),
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    metrics: &'a NetworkMetrics,
    health: HealthState,
}

/// One human-readable line per snapshot.
pub fn format_line(metrics: &NetworkMetrics) -> String {
    let mut line = format!(
        "[{}] slot={} tps={} skip_rate={:.2}% block_time={}",
        metrics.health(),
        metrics.slot_height,
        metrics.tps,
        metrics.skip_rate * 100.0,
        metrics.block_time,
    );
    if let Some(count) = metrics.validator_count {
        line.push_str(&format!(" validators={}", count));
    }
    line
}

/// The snapshot as a single-line JSON object with its health state added.
pub fn format_json(metrics: &NetworkMetrics) -> serde_json::Result<String> {
    serde_json::to_string(&Report {
        metrics,
        health: metrics.health(),
    })
}
