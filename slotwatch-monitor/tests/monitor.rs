use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use slotwatch_monitor::{
    ConfigError, HealthState, MonitorConfigPatch, MonitorError, NetworkMonitor, Output,
    PerformanceSample, SampleSource, TransportError,
};
use tokio::time::sleep;

/// In-memory source whose behavior tests flip at runtime.
#[derive(Debug)]
struct ScriptedSource {
    slot: AtomicU64,
    slot_calls: AtomicUsize,
    validator_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_slot: AtomicBool,
    fail_block_time: AtomicBool,
    slot_delay: Mutex<Duration>,
    sample: Mutex<Option<PerformanceSample>>,
}

impl ScriptedSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: AtomicU64::new(0),
            slot_calls: AtomicUsize::new(0),
            validator_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fail_slot: AtomicBool::new(false),
            fail_block_time: AtomicBool::new(false),
            slot_delay: Mutex::new(Duration::ZERO),
            sample: Mutex::new(Some(healthy_sample())),
        })
    }

    fn slot_calls(&self) -> usize {
        self.slot_calls.load(Ordering::SeqCst)
    }
}

/// 3000 tps, 0.02 skip rate, 400 ms slots.
fn healthy_sample() -> PerformanceSample {
    PerformanceSample {
        num_transactions: 180_000,
        sample_period_secs: 60,
        num_slots: 150,
        num_non_vote_transactions: 147,
    }
}

#[async_trait]
impl SampleSource for ScriptedSource {
    async fn fetch_current_slot(&self) -> Result<u64, TransportError> {
        self.slot_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.slot_delay.lock().unwrap();
        if !delay.is_zero() {
            sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_slot.load(Ordering::SeqCst) {
            return Err(TransportError::Connection("node unreachable".to_string()));
        }
        Ok(self.slot.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn fetch_block_time(&self, slot: u64) -> Result<Option<i64>, TransportError> {
        if self.fail_block_time.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout);
        }
        Ok(Some(1_700_000_000 + slot as i64))
    }

    async fn fetch_performance_sample(&self) -> Result<Option<PerformanceSample>, TransportError> {
        Ok(self.sample.lock().unwrap().clone())
    }

    async fn fetch_validator_count(&self) -> Result<Option<u64>, TransportError> {
        self.validator_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(1400))
    }

    fn description(&self) -> &str {
        "scripted"
    }
}

fn monitor(source: &Arc<ScriptedSource>, interval_ms: u64) -> NetworkMonitor {
    NetworkMonitor::builder()
        .shared_source(source.clone())
        .patch(MonitorConfigPatch {
            polling_interval_ms: Some(interval_ms),
            ..Default::default()
        })
        .build()
        .unwrap()
}

fn counting(monitor: &NetworkMonitor) -> (slotwatch_monitor::Subscription, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let sub = monitor.subscribe(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    (sub, count)
}

#[tokio::test(start_paused = true)]
async fn first_cycle_runs_immediately_then_every_interval() {
    let source = ScriptedSource::new();
    let monitor = monitor(&source, 1000);
    let (_sub, count) = counting(&monitor);

    monitor.start();
    assert!(monitor.is_running());

    sleep(Duration::from_millis(10)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);

    let metrics = monitor.metrics().unwrap();
    assert_eq!(metrics.slot_height, 2);
    assert_eq!(metrics.block_timestamp, Some(1_700_000_002));
    assert_eq!(metrics.tps, 3000);
    assert_eq!(metrics.block_time.as_millis(), 400);
    assert_eq!(metrics.validator_count, None);
}

#[tokio::test]
async fn two_subscribers_fire_once_then_only_the_remaining_one() {
    let source = ScriptedSource::new();
    let monitor = monitor(&source, 1000);
    let (first, first_count) = counting(&monitor);
    let (_second, second_count) = counting(&monitor);

    monitor.poll_now().await.unwrap();
    assert_eq!(first_count.load(Ordering::SeqCst), 1);
    assert_eq!(second_count.load(Ordering::SeqCst), 1);

    first.unsubscribe();
    monitor.poll_now().await.unwrap();
    assert_eq!(first_count.load(Ordering::SeqCst), 1);
    assert_eq!(second_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_block_time_keeps_snapshot_and_notifies_nobody() {
    let source = ScriptedSource::new();
    let monitor = monitor(&source, 1000);
    let (_sub, count) = counting(&monitor);

    let first = monitor.poll_now().await.unwrap();
    source.fail_block_time.store(true, Ordering::SeqCst);

    let err = monitor.poll_now().await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&monitor.metrics().unwrap(), &first));
}

#[tokio::test(start_paused = true)]
async fn timer_survives_failed_cycles() {
    let source = ScriptedSource::new();
    source.fail_slot.store(true, Ordering::SeqCst);
    let monitor = monitor(&source, 1000);

    monitor.start();
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(source.slot_calls(), 3);
    assert!(monitor.metrics().is_none());
    assert!(monitor.is_running());

    source.fail_slot.store(false, Ordering::SeqCst);
    sleep(Duration::from_millis(1000)).await;
    assert!(monitor.metrics().is_some());
}

#[tokio::test(start_paused = true)]
async fn stop_then_start_resumes_with_snapshot_kept() {
    let source = ScriptedSource::new();
    let monitor = monitor(&source, 1000);

    monitor.start();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(monitor.metrics().unwrap().slot_height, 1);

    monitor.stop();
    assert!(!monitor.is_running());
    sleep(Duration::from_millis(5000)).await;
    assert_eq!(source.slot_calls(), 1);
    assert_eq!(monitor.metrics().unwrap().slot_height, 1);

    monitor.start();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(source.slot_calls(), 2);
    assert_eq!(monitor.metrics().unwrap().slot_height, 2);
}

#[tokio::test(start_paused = true)]
async fn start_and_stop_are_idempotent() {
    let source = ScriptedSource::new();
    let monitor = monitor(&source, 1000);

    monitor.stop();
    monitor.start();
    monitor.start();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(source.slot_calls(), 1);

    monitor.stop();
    monitor.stop();
    sleep(Duration::from_millis(3000)).await;
    assert_eq!(source.slot_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn panicking_subscriber_does_not_stop_others_or_the_timer() {
    let source = ScriptedSource::new();
    let monitor = monitor(&source, 1000);
    let _bad = monitor.subscribe(|_| panic!("subscriber bug"));
    let (_good, count) = counting(&monitor);

    monitor.start();
    sleep(Duration::from_millis(1500)).await;

    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert!(monitor.is_running());
}

#[tokio::test(start_paused = true)]
async fn overlapping_ticks_are_skipped() {
    let source = ScriptedSource::new();
    *source.slot_delay.lock().unwrap() = Duration::from_millis(2500);
    let monitor = monitor(&source, 1000);

    monitor.start();
    sleep(Duration::from_millis(6500)).await;

    // Cycles start at 0, 3000 and 6000; the ticks in between find one in flight.
    assert_eq!(source.slot_calls(), 3);
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn poll_now_waits_for_in_flight_cycle() {
    let source = ScriptedSource::new();
    *source.slot_delay.lock().unwrap() = Duration::from_millis(500);
    let monitor = monitor(&source, 10_000);

    monitor.start();
    sleep(Duration::from_millis(10)).await;

    let metrics = monitor.poll_now().await.unwrap();
    assert_eq!(metrics.slot_height, 2);
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn validator_count_fetched_only_when_tracked() {
    let source = ScriptedSource::new();
    let untracked = monitor(&source, 1000);
    assert_eq!(untracked.poll_now().await.unwrap().validator_count, None);
    assert_eq!(source.validator_calls.load(Ordering::SeqCst), 0);

    let tracked = NetworkMonitor::builder()
        .shared_source(source.clone())
        .patch(MonitorConfigPatch {
            track_validators: Some(true),
            ..Default::default()
        })
        .build()
        .unwrap();
    assert_eq!(tracked.poll_now().await.unwrap().validator_count, Some(1400));
    assert_eq!(source.validator_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_sample_yields_zero_metrics() {
    let source = ScriptedSource::new();
    *source.sample.lock().unwrap() = None;
    let monitor = monitor(&source, 1000);

    let metrics = monitor.poll_now().await.unwrap();
    assert_eq!(metrics.tps, 0);
    assert_eq!(metrics.skip_rate, 0.0);
    assert_eq!(metrics.block_time.as_millis(), 0);
    // Zero tps is below every floor.
    assert_eq!(monitor.evaluate_network_health(), HealthState::Emergency);
}

#[tokio::test]
async fn health_follows_latest_snapshot() {
    let source = ScriptedSource::new();
    let monitor = monitor(&source, 1000);
    assert_eq!(monitor.evaluate_network_health(), HealthState::Nominal);

    monitor.poll_now().await.unwrap();
    assert_eq!(monitor.evaluate_network_health(), HealthState::Nominal);

    // 1200 tps
    *source.sample.lock().unwrap() = Some(PerformanceSample {
        num_transactions: 72_000,
        ..healthy_sample()
    });
    monitor.poll_now().await.unwrap();
    assert_eq!(monitor.evaluate_network_health(), HealthState::Degraded);
}

#[tokio::test]
async fn attached_outputs_receive_updates() {
    let source = ScriptedSource::new();
    let monitor = monitor(&source, 1000);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latest.json");

    let (channel, mut rx) = Output::channel(8);
    let _channel = monitor.attach(channel).unwrap();
    let file = monitor.attach(Output::file(&path)).unwrap();

    monitor.poll_now().await.unwrap();
    assert_eq!(rx.recv().await.unwrap().slot_height, 1);
    wait_for_file_containing(&path, "\"slot_height\": 1").await;

    file.unsubscribe();
    monitor.poll_now().await.unwrap();
    assert_eq!(rx.recv().await.unwrap().slot_height, 2);
    sleep(Duration::from_millis(50)).await;
    assert!(std::fs::read_to_string(&path).unwrap().contains("\"slot_height\": 1"));
}

async fn wait_for_file_containing(path: &std::path::Path, needle: &str) {
    for _ in 0..500 {
        if let Ok(text) = tokio::fs::read_to_string(path).await {
            if text.contains(needle) {
                return;
            }
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never contained {}", path.display(), needle);
}

#[cfg(feature = "prometheus")]
#[tokio::test]
async fn prometheus_output_serves_until_unsubscribed() {
    use slotwatch_monitor::PrometheusConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let source = ScriptedSource::new();
    let monitor = monitor(&source, 1000);
    let exporter = monitor
        .attach(Output::prometheus(
            PrometheusConfig::builder().listen_addr(addr.to_string()).build(),
        ))
        .unwrap();
    monitor.poll_now().await.unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.contains("slotwatch_slot_height 1"));

    exporter.unsubscribe();
    let mut refused = false;
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_err() {
            refused = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(refused, "exporter still listening after unsubscribe");
}

#[cfg(feature = "prometheus")]
#[tokio::test]
async fn prometheus_bind_failure_is_reported_and_nothing_is_attached() {
    use slotwatch_monitor::PrometheusConfig;

    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap();
    let source = ScriptedSource::new();
    let monitor = monitor(&source, 1000);
    let (_sub, calls) = counting(&monitor);

    let err = monitor
        .attach(Output::prometheus(
            PrometheusConfig::builder().listen_addr(addr.to_string()).build(),
        ))
        .unwrap_err();
    assert!(matches!(err, MonitorError::Output(_)));

    monitor.poll_now().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn zero_interval_is_rejected() {
    let source = ScriptedSource::new();
    let err = NetworkMonitor::builder()
        .shared_source(source)
        .patch(MonitorConfigPatch {
            polling_interval_ms: Some(0),
            ..Default::default()
        })
        .build()
        .unwrap_err();

    assert!(matches!(
        err,
        MonitorError::Config(ConfigError::ZeroPollingInterval)
    ));
}
