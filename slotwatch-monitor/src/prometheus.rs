//! Prometheus exposition format support.
//!
//! Serves the latest snapshot and its health state in the Prometheus
//! text-based exposition format.
//!
//! ## Example
//!
//! ```rust,no_run
//! use slotwatch_monitor::{NetworkMonitor, Output};
//! use slotwatch_monitor::prometheus::PrometheusConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PrometheusConfig::builder()
//!         .listen_addr("0.0.0.0:9090")
//!         .metrics_path("/metrics")
//!         .build();
//!
//!     let monitor = NetworkMonitor::builder().build()?;
//!     let _sub = monitor.attach(Output::prometheus(config))?;
//!     monitor.start();
//!
//!     // Metrics available at http://localhost:9090/metrics
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::fmt::Write as _;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::{Mutex, RwLock};
use slotwatch_types::{HealthState, NetworkMetrics};
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Configuration for Prometheus metrics endpoint.
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Address to listen on (e.g., "0.0.0.0:9090")
    pub listen_addr: String,
    /// Path for metrics endpoint (e.g., "/metrics")
    pub metrics_path: String,
    /// Optional namespace prefix for all metrics
    pub namespace: Option<String>,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9090".to_string(),
            metrics_path: "/metrics".to_string(),
            namespace: None,
        }
    }
}

impl PrometheusConfig {
    pub fn builder() -> PrometheusConfigBuilder {
        PrometheusConfigBuilder::default()
    }
}

/// Builder for PrometheusConfig.
#[derive(Debug, Default)]
pub struct PrometheusConfigBuilder {
    listen_addr: Option<String>,
    metrics_path: Option<String>,
    namespace: Option<String>,
}

impl PrometheusConfigBuilder {
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = Some(path.into());
        self
    }

    pub fn namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = Some(ns.into());
        self
    }

    pub fn build(self) -> PrometheusConfig {
        let defaults = PrometheusConfig::default();
        PrometheusConfig {
            listen_addr: self.listen_addr.unwrap_or(defaults.listen_addr),
            metrics_path: self.metrics_path.unwrap_or(defaults.metrics_path),
            namespace: self.namespace,
        }
    }
}

type Latest = Arc<RwLock<Option<NetworkMetrics>>>;

/// Background server task and the address it is bound to.
#[derive(Debug)]
struct Server {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

/// Prometheus exporter that serves metrics over HTTP.
///
/// The server is aborted by [`stop_server`](Self::stop_server) or when the
/// exporter is dropped.
#[derive(Debug)]
pub struct PrometheusExporter {
    config: PrometheusConfig,
    latest: Latest,
    server: Mutex<Option<Server>>,
}

impl PrometheusExporter {
    pub fn new(config: PrometheusConfig) -> Self {
        Self {
            config,
            latest: Arc::new(RwLock::new(None)),
            server: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PrometheusConfig {
        &self.config
    }

    /// Replace the snapshot being served.
    pub fn record(&self, metrics: &NetworkMetrics) {
        *self.latest.write() = Some(metrics.clone());
    }

    /// Current metrics in exposition format; empty until the first snapshot.
    pub fn render(&self) -> String {
        render_latest(&self.latest, self.config.namespace.as_deref())
    }

    /// Bind the listen address and serve in a background task.
    ///
    /// Binding happens before this returns, so an unusable address is an
    /// error here, as is calling it outside a tokio runtime. Calling it again
    /// while serving returns the existing address.
    pub fn start_server(&self) -> io::Result<SocketAddr> {
        let mut server = self.server.lock();
        if let Some(running) = server.as_ref().filter(|s| !s.task.is_finished()) {
            return Ok(running.addr);
        }

        let handle = Handle::try_current().map_err(io::Error::other)?;
        let listener = std::net::TcpListener::bind(self.config.listen_addr.as_str())?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let listener = {
            let _enter = handle.enter();
            TcpListener::from_std(listener)?
        };
        info!(addr = %addr, path = %self.config.metrics_path, "Serving Prometheus metrics");

        let metrics_path = self.config.metrics_path.clone();
        let namespace = self.config.namespace.clone();
        let latest = self.latest.clone();
        let task = handle.spawn(async move {
            if let Err(e) = run_server(listener, metrics_path, namespace, latest).await {
                error!(error = %e, "Prometheus server error");
            }
        });

        *server = Some(Server { addr, task });
        Ok(addr)
    }

    /// Address the server is bound to, if it is running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server
            .lock()
            .as_ref()
            .filter(|s| !s.task.is_finished())
            .map(|s| s.addr)
    }

    /// Abort the server task. Does nothing if it is not running.
    pub fn stop_server(&self) {
        if let Some(server) = self.server.lock().take() {
            server.task.abort();
            debug!(addr = %server.addr, "Stopped Prometheus server");
        }
    }
}

impl Drop for PrometheusExporter {
    fn drop(&mut self) {
        self.stop_server();
    }
}

async fn run_server(
    listener: TcpListener,
    metrics_path: String,
    namespace: Option<String>,
    latest: Latest,
) -> io::Result<()> {
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        let metrics_path = metrics_path.clone();
        let namespace = namespace.clone();
        let latest = latest.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let response = handle_request(req.uri().path(), &metrics_path, namespace.as_deref(), &latest);
                async move { Ok::<_, Infallible>(response) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(error = %e, "Prometheus connection error");
            }
        });
    }
}

fn text_response(status: StatusCode, content_type: &'static str, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn handle_request(
    path: &str,
    metrics_path: &str,
    namespace: Option<&str>,
    latest: &Latest,
) -> Response<Full<Bytes>> {
    if path == metrics_path {
        text_response(
            StatusCode::OK,
            "text/plain; version=0.0.4; charset=utf-8",
            render_latest(latest, namespace),
        )
    } else if path == "/health" || path == "/healthz" {
        text_response(StatusCode::OK, "text/plain", "OK".to_string())
    } else {
        text_response(StatusCode::NOT_FOUND, "text/plain", "Not Found".to_string())
    }
}

fn render_latest(latest: &Latest, namespace: Option<&str>) -> String {
    latest
        .read()
        .as_ref()
        .map(|m| format_prometheus(m, namespace))
        .unwrap_or_default()
}

fn gauge(out: &mut String, prefix: &str, name: &str, help: &str, value: impl std::fmt::Display) {
    // Writing to a String cannot fail.
    let _ = writeln!(out, "# HELP {prefix}slotwatch_{name} {help}");
    let _ = writeln!(out, "# TYPE {prefix}slotwatch_{name} gauge");
    let _ = writeln!(out, "{prefix}slotwatch_{name} {value}");
}

/// Format a snapshot as Prometheus exposition format.
pub fn format_prometheus(metrics: &NetworkMetrics, namespace: Option<&str>) -> String {
    let mut out = String::new();
    let prefix = namespace.map(|n| format!("{}_", n)).unwrap_or_default();
    let health = HealthState::classify(metrics);

    gauge(&mut out, &prefix, "slot_height", "Current slot of the polled node", metrics.slot_height);
    gauge(
        &mut out,
        &prefix,
        "block_time_milliseconds",
        "Average slot duration over the latest performance sample",
        metrics.block_time.as_millis(),
    );
    gauge(&mut out, &prefix, "tps", "Transactions per second over the latest sample", metrics.tps);
    gauge(
        &mut out,
        &prefix,
        "skip_rate",
        "Fraction of slots in the latest sample without normal activity",
        format!("{:.6}", metrics.skip_rate),
    );
    if let Some(count) = metrics.validator_count {
        gauge(&mut out, &prefix, "validator_count", "Number of voting validators", count);
    }
    if let Some(ts) = metrics.block_timestamp {
        gauge(
            &mut out,
            &prefix,
            "block_timestamp_seconds",
            "Estimated production time of the current slot",
            ts,
        );
    }
    gauge(
        &mut out,
        &prefix,
        "health_state",
        "Health severity (0 nominal, 1 degraded, 2 emergency)",
        health.severity(),
    );

    let _ = writeln!(out, "# HELP {prefix}slotwatch_health Current health state");
    let _ = writeln!(out, "# TYPE {prefix}slotwatch_health gauge");
    for state in [HealthState::Nominal, HealthState::Degraded, HealthState::Emergency] {
        let _ = writeln!(
            out,
            "{prefix}slotwatch_health{{state=\"{}\"}} {}",
            state.as_str(),
            u8::from(state == health)
        );
    }

    gauge(
        &mut out,
        &prefix,
        "snapshot_timestamp_seconds",
        "Unix timestamp of the snapshot",
        format!("{:.3}", metrics.timestamp_ms as f64 / 1000.0),
    );

    out
}
