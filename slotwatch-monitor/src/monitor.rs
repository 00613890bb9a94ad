//! The [`NetworkMonitor`] engine.

use std::sync::Arc;

use parking_lot::Mutex;
use slotwatch_rpc::{SampleSource, TransportError};
use slotwatch_types::{HealthState, NetworkMetrics};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{MonitorConfig, MonitorConfigPatch};
use crate::error::MonitorError;
use crate::output::Output;
use crate::poller::{run_cycle, spawn_poller};
use crate::registry::Subscription;
use crate::state::SharedState;

#[derive(Debug)]
struct Poller {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Periodically polls a [`SampleSource`], keeps the latest
/// [`NetworkMetrics`] and notifies subscribers after every successful cycle.
///
/// A monitor starts out stopped. Build as many as you need; each one owns its
/// source, timer and subscribers.
///
/// # Example
///
/// ```rust,no_run
/// use slotwatch_monitor::{MonitorConfig, NetworkMonitor};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let monitor = NetworkMonitor::connect(MonitorConfig::default())?;
///
///     let _sub = monitor.subscribe(|metrics| {
///         println!("slot {} at {} tps", metrics.slot_height, metrics.tps);
///     });
///
///     monitor.start();
///     tokio::signal::ctrl_c().await?;
///     monitor.stop();
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct NetworkMonitor {
    state: Arc<SharedState>,
    poller: Mutex<Option<Poller>>,
}

impl NetworkMonitor {
    pub fn builder() -> NetworkMonitorBuilder {
        NetworkMonitorBuilder::new()
    }

    /// Build a monitor polling `config.rpc_endpoint` over JSON-RPC.
    #[cfg(feature = "json-rpc")]
    pub fn connect(config: MonitorConfig) -> Result<Self, MonitorError> {
        Self::builder().config(config).build()
    }

    /// Start polling. The first cycle runs immediately, then one every
    /// polling interval. Does nothing if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut poller = self.poller.lock();
        if poller.as_ref().is_some_and(|p| !p.task.is_finished()) {
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = spawn_poller(self.state.clone(), stop_rx);
        *poller = Some(Poller { stop_tx, task });

        info!(
            source = self.state.source.description(),
            interval_ms = self.state.config.polling_interval.as_millis() as u64,
            "Network monitor started"
        );
    }

    /// Stop polling. The latest snapshot is kept. Does nothing if stopped.
    ///
    /// A cycle already in flight may still complete and publish.
    pub fn stop(&self) {
        if let Some(poller) = self.poller.lock().take() {
            let _ = poller.stop_tx.send(true);
            info!(source = self.state.source.description(), "Network monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.poller
            .lock()
            .as_ref()
            .is_some_and(|p| !p.task.is_finished())
    }

    /// Latest snapshot, or `None` before the first successful cycle.
    pub fn metrics(&self) -> Option<Arc<NetworkMetrics>> {
        self.state.metrics.load()
    }

    /// Classify the latest snapshot. With no data yet this is
    /// [`HealthState::Nominal`].
    pub fn evaluate_network_health(&self) -> HealthState {
        HealthState::classify_opt(self.metrics().as_deref())
    }

    /// Register a callback for every new snapshot.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&NetworkMetrics) + Send + Sync + 'static,
    {
        self.state.registry.subscribe(callback)
    }

    /// Drive `output` with every new snapshot.
    ///
    /// The output is opened first; if that fails nothing is subscribed.
    /// Unsubscribing drops the output and closes it.
    pub fn attach(&self, output: Output) -> Result<Subscription, MonitorError> {
        output.open().map_err(MonitorError::Output)?;
        Ok(self.subscribe(move |metrics| output.emit(metrics)))
    }

    /// Run one cycle now, waiting for any in-flight cycle to finish first.
    ///
    /// Works whether or not the monitor is running; on success the snapshot
    /// is replaced and subscribers are notified as for a timer cycle.
    pub async fn poll_now(&self) -> Result<Arc<NetworkMetrics>, TransportError> {
        let _guard = self.state.cycle_guard.lock().await;
        run_cycle(&self.state).await
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.state.config
    }

    /// Human-readable name of the sample source.
    pub fn source_description(&self) -> &str {
        self.state.source.description()
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for configuring a [`NetworkMonitor`].
#[derive(Debug, Default)]
pub struct NetworkMonitorBuilder {
    config: Option<MonitorConfig>,
    patch: MonitorConfigPatch,
    source: Option<Arc<dyn SampleSource>>,
}

impl NetworkMonitorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base configuration. Defaults to [`MonitorConfig::default`].
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides applied on top of the base configuration. Later patches win.
    pub fn patch(mut self, patch: MonitorConfigPatch) -> Self {
        self.patch = self.patch.merge(patch);
        self
    }

    /// Poll `source` instead of building a JSON-RPC client from the config.
    pub fn source(self, source: impl SampleSource + 'static) -> Self {
        self.shared_source(Arc::new(source))
    }

    pub fn shared_source(mut self, source: Arc<dyn SampleSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Validate the configuration and build the monitor.
    pub fn build(self) -> Result<NetworkMonitor, MonitorError> {
        let config = self.config.unwrap_or_default().apply(self.patch)?;
        let source = match self.source {
            Some(source) => source,
            None => default_source(&config)?,
        };

        Ok(NetworkMonitor {
            state: Arc::new(SharedState::new(source, config)),
            poller: Mutex::new(None),
        })
    }
}

#[cfg(feature = "json-rpc")]
fn default_source(config: &MonitorConfig) -> Result<Arc<dyn SampleSource>, MonitorError> {
    let source = slotwatch_rpc::json_rpc::JsonRpcSource::builder()
        .endpoint(config.rpc_endpoint.clone())
        .timeout(config.timeout)
        .max_retries(config.max_retries)
        .build()?;
    Ok(Arc::new(source))
}

#[cfg(not(feature = "json-rpc"))]
fn default_source(_config: &MonitorConfig) -> Result<Arc<dyn SampleSource>, MonitorError> {
    Err(MonitorError::MissingSource)
}
