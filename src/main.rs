use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use slotwatch::report::Format;
use slotwatch::settings;
use slotwatch_monitor::{MonitorConfigPatch, NetworkMonitor, Output};
use tracing::{error, info};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "slotwatch")]
#[command(about = "Monitor Solana cluster health from a node's performance samples")]
struct Args {
    /// Settings file (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint to poll
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Time between polls in milliseconds
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Retries per request on transient transport errors
    #[arg(long)]
    max_retries: Option<u32>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Also report the number of voting validators (`--track-validators=false` disables it)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    track_validators: Option<bool>,

    /// Write the latest snapshot to this JSON file on every update
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print JSON objects instead of text lines
    #[arg(long)]
    json: bool,

    /// Poll once, print the result and exit
    #[arg(long)]
    once: bool,

    /// Serve Prometheus metrics on this address (e.g. 0.0.0.0:9090)
    #[cfg(feature = "prometheus")]
    #[arg(long)]
    prometheus: Option<String>,
}

impl Args {
    fn patch(&self) -> MonitorConfigPatch {
        MonitorConfigPatch {
            polling_interval_ms: self.interval_ms,
            rpc_endpoint: self.endpoint.clone(),
            max_retries: self.max_retries,
            timeout_ms: self.timeout_ms,
            track_validators: self.track_validators,
        }
    }

    fn format(&self) -> Format {
        if self.json {
            Format::Json
        } else {
            Format::Line
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install log subscriber")?;

    let args = Args::parse();
    let config = settings::load(args.config.as_deref(), args.patch())?;
    let monitor = NetworkMonitor::connect(config).context("failed to build monitor")?;

    if let Some(path) = &args.output {
        monitor
            .attach(Output::file(path))
            .context("failed to open output file")?;
    }

    #[cfg(feature = "prometheus")]
    if let Some(addr) = &args.prometheus {
        let config = slotwatch_monitor::PrometheusConfig::builder()
            .listen_addr(addr.clone())
            .build();
        monitor
            .attach(Output::prometheus(config))
            .context("failed to start Prometheus exporter")?;
    }

    let format = args.format();

    if args.once {
        let metrics = monitor
            .poll_now()
            .await
            .with_context(|| format!("failed to poll {}", monitor.source_description()))?;
        println!("{}", format.render(&metrics)?);
        return Ok(());
    }

    monitor.subscribe(move |metrics| match format.render(metrics) {
        Ok(line) => println!("{}", line),
        Err(e) => error!(error = %e, "Failed to render metrics"),
    });

    monitor.start();
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutting down");
    monitor.stop();

    Ok(())
}
