//! Shared engine state.

use std::sync::Arc;

use parking_lot::RwLock;
use slotwatch_rpc::SampleSource;
use slotwatch_types::NetworkMetrics;

use crate::config::MonitorConfig;
use crate::registry::SubscriberRegistry;

/// Holds the latest snapshot.
///
/// Readers get a cheap `Arc` clone and never wait on a poll cycle; a cycle
/// replaces the whole snapshot in one write.
#[derive(Debug, Default)]
pub struct MetricsCell {
    latest: RwLock<Option<Arc<NetworkMetrics>>>,
}

impl MetricsCell {
    pub fn load(&self) -> Option<Arc<NetworkMetrics>> {
        self.latest.read().clone()
    }

    pub fn store(&self, metrics: Arc<NetworkMetrics>) {
        *self.latest.write() = Some(metrics);
    }
}

/// Everything a poll cycle needs, shared between the engine and its timer task.
#[derive(Debug)]
pub(crate) struct SharedState {
    pub source: Arc<dyn SampleSource>,
    pub config: MonitorConfig,
    pub metrics: MetricsCell,
    pub registry: SubscriberRegistry,
    /// Held for the duration of a cycle so cycles never overlap.
    pub cycle_guard: Arc<tokio::sync::Mutex<()>>,
}

impl SharedState {
    pub fn new(source: Arc<dyn SampleSource>, config: MonitorConfig) -> Self {
        Self {
            source,
            config,
            metrics: MetricsCell::default(),
            registry: SubscriberRegistry::new(),
            cycle_guard: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}
