// ── Device-stats loop ──

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::{CycleOutcome, LoopStatus, PollHealth, PollPhase, PollTask};
use crate::error::CoreError;
use crate::model::DeviceStats;
use crate::service::{SensorService, with_timeout};

/// Polls device counts and publishes the latest value.
///
/// A failed cycle leaves the published value as it was.
pub struct StatsPoller<S> {
    service: Arc<S>,
    timeout: Duration,
    current: watch::Sender<DeviceStats>,
    status: LoopStatus,
}

impl<S: SensorService> StatsPoller<S> {
    pub fn new(service: Arc<S>, timeout: Duration) -> Self {
        let (current, _) = watch::channel(DeviceStats::default());
        Self {
            service,
            timeout,
            current,
            status: LoopStatus::new(),
        }
    }

    /// Last successfully fetched counts; zeros before the first success.
    pub fn current(&self) -> DeviceStats {
        *self.current.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceStats> {
        self.current.subscribe()
    }

    pub fn health(&self) -> PollHealth {
        self.status.snapshot()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<PollHealth> {
        self.status.subscribe()
    }

    /// Run one fetch-and-publish cycle.
    pub async fn poll_once(&self) -> CycleOutcome {
        self.status.begin();

        match with_timeout(self.timeout, self.service.device_stats()).await {
            Ok(stats) => {
                self.status.set_phase(PollPhase::Applying);
                self.current.send_replace(stats);
                self.status.succeeded();
                debug!(
                    active = stats.active_count,
                    total = stats.total_count,
                    "device stats updated"
                );
                CycleOutcome::Applied { emitted: 0 }
            }
            Err(e) => {
                warn!(task = Self::NAME, error = %e, "device stats poll failed");
                self.status.skipped(&e);
                CycleOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl<S: SensorService> PollTask for StatsPoller<S> {
    const NAME: &'static str = "device-stats";

    fn status(&self) -> &LoopStatus {
        &self.status
    }

    async fn cycle(&self) -> Result<CycleOutcome, CoreError> {
        Ok(self.poll_once().await)
    }
}
