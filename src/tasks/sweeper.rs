//! Periodic Sweep Task
//!
//! Background task that runs the engine's sweep on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::EngineCore;

/// Lower bound for the sweep interval; tokio intervals cannot tick at zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Spawns the task that sweeps `core` every `period`.
///
/// The first sweep happens one full period after the task starts. Ticks
/// missed while a sweep holds the lock are delayed, not replayed in a burst.
///
/// # Returns
/// A JoinHandle the engine keeps so it can abort the task on shutdown.
pub(crate) fn spawn_sweeper(core: Arc<EngineCore>, period: Duration) -> JoinHandle<()> {
    let period = period.max(MIN_SWEEP_INTERVAL);

    tokio::spawn(async move {
        info!("Starting cache sweeper with interval of {:?}", period);

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let report = core.sweep().await;

            if report.expired > 0 || report.evicted > 0 {
                info!(
                    "Sweep: expired {}, evicted {}, {} entries remain",
                    report.expired, report.evicted, report.remaining
                );
            } else {
                debug!("Sweep: nothing to remove ({} entries)", report.remaining);
            }
        }
    })
}
