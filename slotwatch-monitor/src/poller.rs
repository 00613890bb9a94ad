//! Poll cycle and background timer.

use std::sync::Arc;

use slotwatch_rpc::TransportError;
use slotwatch_types::{derive_metrics, NetworkMetrics};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::state::SharedState;

/// Fetch one set of inputs and build a snapshot from them.
///
/// The slot -> block time chain runs concurrently with the performance
/// sample fetch (and the validator count when tracked). Any failure fails
/// the whole fetch.
async fn fetch(state: &SharedState) -> Result<NetworkMetrics, TransportError> {
    let source = state.source.as_ref();

    let slot_and_time = async {
        let slot = source.fetch_current_slot().await?;
        let block_timestamp = source.fetch_block_time(slot).await?;
        Ok::<_, TransportError>((slot, block_timestamp))
    };

    let validators = async {
        if state.config.track_validators {
            source.fetch_validator_count().await
        } else {
            Ok(None)
        }
    };

    let ((slot, block_timestamp), sample, validator_count) = tokio::try_join!(
        slot_and_time,
        source.fetch_performance_sample(),
        validators
    )?;

    Ok(NetworkMetrics::builder()
        .slot_height(slot)
        .block_timestamp(block_timestamp)
        .derived(derive_metrics(sample.as_ref()))
        .validator_count(validator_count)
        .build())
}

/// Run one poll cycle: fetch, swap the snapshot, then notify subscribers.
///
/// On failure the previous snapshot is left untouched and nobody is notified.
/// Callers must hold the cycle guard.
pub(crate) async fn run_cycle(state: &SharedState) -> Result<Arc<NetworkMetrics>, TransportError> {
    let metrics = Arc::new(fetch(state).await?);
    state.metrics.store(metrics.clone());

    let delivered = state.registry.notify(&metrics);
    debug!(
        slot = metrics.slot_height,
        tps = metrics.tps,
        skip_rate = metrics.skip_rate,
        block_time_ms = metrics.block_time.as_millis(),
        delivered,
        "Metrics updated"
    );
    Ok(metrics)
}

/// Spawn the timer task. The first tick fires immediately.
///
/// Each tick runs its cycle on its own task so the timer keeps reacting to
/// `stop_rx` while a slow cycle is in flight. A tick that finds the cycle
/// guard held is skipped.
pub(crate) fn spawn_poller(state: Arc<SharedState>, mut stop_rx: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let Ok(guard) = state.cycle_guard.clone().try_lock_owned() else {
                        debug!("Previous poll cycle still running, skipping tick");
                        continue;
                    };

                    let state = state.clone();
                    tokio::spawn(async move {
                        let _guard = guard;
                        if let Err(e) = run_cycle(&state).await {
                            warn!(
                                endpoint = state.source.description(),
                                error = %e,
                                "Poll cycle failed, keeping previous snapshot"
                            );
                        }
                    });
                }
            }
        }

        debug!("Poll timer stopped");
    })
}
