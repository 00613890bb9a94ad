//! Output sinks that receive every new snapshot.

use std::path::PathBuf;

use slotwatch_types::NetworkMetrics;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[cfg(feature = "prometheus")]
use std::sync::Arc;

#[cfg(feature = "prometheus")]
use crate::prometheus::{PrometheusConfig, PrometheusExporter};

/// Destination for snapshots.
///
/// Attach one to a running engine with
/// [`NetworkMonitor::attach`](crate::NetworkMonitor::attach); it is then
/// driven like any other subscriber.
#[derive(Debug)]
pub enum Output {
    /// Write the latest snapshot to a JSON file.
    ///
    /// The file is overwritten on every update. Inside a tokio runtime the
    /// write runs on a spawned task so the notifying thread never blocks.
    File(PathBuf),

    /// Forward snapshots through a channel.
    ///
    /// Delivery is best effort: a full or closed channel drops the update.
    Channel(mpsc::Sender<NetworkMetrics>),

    /// Serve the latest snapshot over HTTP in Prometheus text format.
    #[cfg(feature = "prometheus")]
    Prometheus(Arc<PrometheusExporter>),
}

impl Output {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slotwatch_monitor::Output;
    ///
    /// let output = Output::file("metrics.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slotwatch_monitor::Output;
    ///
    /// let (output, mut rx) = Output::channel(16);
    ///
    /// // Later:
    /// // while let Some(metrics) = rx.recv().await {
    /// //     println!("slot {}", metrics.slot_height);
    /// // }
    /// ```
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<NetworkMetrics>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    /// Create a Prometheus output. The HTTP server starts when the output
    /// is attached and stops once its subscription is removed.
    #[cfg(feature = "prometheus")]
    pub fn prometheus(config: PrometheusConfig) -> Self {
        Output::Prometheus(Arc::new(PrometheusExporter::new(config)))
    }

    /// Called once when the output is attached to an engine.
    pub(crate) fn open(&self) -> std::io::Result<()> {
        #[cfg(feature = "prometheus")]
        if let Output::Prometheus(exporter) = self {
            exporter.start_server()?;
        }
        Ok(())
    }

    /// Deliver one snapshot. Failures are logged and never propagated.
    pub(crate) fn emit(&self, metrics: &NetworkMetrics) {
        match self {
            Output::File(path) => {
                let json = match serde_json::to_string_pretty(metrics) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize metrics");
                        return;
                    }
                };
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        let path = path.clone();
                        handle.spawn(async move {
                            if let Err(e) = tokio::fs::write(&path, json).await {
                                warn!(path = %path.display(), error = %e, "Failed to write metrics file");
                            }
                        });
                    }
                    Err(_) => {
                        if let Err(e) = std::fs::write(path, json) {
                            warn!(path = %path.display(), error = %e, "Failed to write metrics file");
                        }
                    }
                }
            }
            Output::Channel(tx) => {
                if let Err(e) = tx.try_send(metrics.clone()) {
                    debug!(error = %e, "Dropped metrics update for channel output");
                }
            }
            #[cfg(feature = "prometheus")]
            Output::Prometheus(exporter) => exporter.record(metrics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(slot: u64) -> NetworkMetrics {
        NetworkMetrics::builder()
            .slot_height(slot)
            .tps(2500)
            .timestamp_ms(1_700_000_000_000)
            .build()
    }

    #[test]
    fn file_output_overwrites_with_latest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let output = Output::file(&path);

        output.emit(&metrics(1));
        output.emit(&metrics(2));

        let written: NetworkMetrics =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.slot_height, 2);
        assert_eq!(written.tps, 2500);
    }

    #[test]
    fn file_output_to_missing_directory_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let output = Output::file(dir.path().join("missing").join("metrics.json"));
        output.emit(&metrics(1));
    }

    async fn read_slot_when_written(path: &std::path::Path, slot: u64) -> NetworkMetrics {
        for _ in 0..500 {
            if let Ok(text) = tokio::fs::read_to_string(path).await {
                if let Ok(written) = serde_json::from_str::<NetworkMetrics>(&text) {
                    if written.slot_height == slot {
                        return written;
                    }
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("metrics file never reached slot {}", slot);
    }

    #[tokio::test]
    async fn file_output_inside_runtime_writes_off_thread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let output = Output::file(&path);

        output.emit(&metrics(3));
        // emit returned before the spawned write had a chance to run
        assert!(!path.exists());

        let written = read_slot_when_written(&path, 3).await;
        assert_eq!(written.tps, 2500);
    }

    #[tokio::test]
    async fn file_output_inside_runtime_to_missing_directory_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let output = Output::file(dir.path().join("missing").join("metrics.json"));
        output.emit(&metrics(1));
        tokio::task::yield_now().await;
    }

    #[test]
    fn channel_output_forwards_snapshots() {
        let (output, mut rx) = Output::channel(4);
        output.emit(&metrics(7));

        assert_eq!(rx.try_recv().unwrap().slot_height, 7);
    }

    #[test]
    fn full_channel_drops_update() {
        let (output, mut rx) = Output::channel(1);
        output.emit(&metrics(1));
        output.emit(&metrics(2));

        assert_eq!(rx.try_recv().unwrap().slot_height, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (output, rx) = Output::channel(1);
        drop(rx);
        output.emit(&metrics(1));
    }
}
