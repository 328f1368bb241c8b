// ── Sensor-feed loop ──
//
// fetch → diff → append → commit runs under one lock, so a manual poll
// and the periodic loop can never diff against the same baseline twice.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use super::{CycleOutcome, LoopStatus, PollHealth, PollPhase, PollTask};
use crate::differ::{Diff, SnapshotDiffer};
use crate::error::CoreError;
use crate::model::Notification;
use crate::service::{SensorService, with_timeout};
use crate::store::NotificationLedger;

#[derive(Debug, Default)]
struct FeedState {
    differ: SnapshotDiffer,
    /// Set once an append is rejected; the loop never appends again.
    fault: Option<String>,
}

/// Polls the sensor feed and appends one notification per new record.
pub struct FeedPoller<S> {
    service: Arc<S>,
    ledger: Arc<NotificationLedger>,
    timeout: Duration,
    state: Mutex<FeedState>,
    status: LoopStatus,
}

impl<S: SensorService> FeedPoller<S> {
    pub fn new(service: Arc<S>, ledger: Arc<NotificationLedger>, timeout: Duration) -> Self {
        Self {
            service,
            ledger,
            timeout,
            state: Mutex::new(FeedState::default()),
            status: LoopStatus::new(),
        }
    }

    pub fn ledger(&self) -> &Arc<NotificationLedger> {
        &self.ledger
    }

    pub fn health(&self) -> PollHealth {
        self.status.snapshot()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<PollHealth> {
        self.status.subscribe()
    }

    /// The invariant violation that halted this loop, if any.
    pub fn fault(&self) -> Option<String> {
        // Halted is terminal; last_error no longer changes.
        if self.status.phase() == PollPhase::Halted {
            self.status.snapshot().last_error
        } else {
            None
        }
    }

    /// Length of the current diff baseline.
    pub async fn baseline_len(&self) -> usize {
        self.state.lock().await.differ.baseline_len()
    }

    /// Run one fetch-diff-append cycle.
    ///
    /// Fetch failures and malformed snapshots are absorbed and reported as
    /// [`CycleOutcome::Skipped`]. Returns `Err` only for an
    /// [`InvariantViolation`](CoreError::InvariantViolation), after which
    /// every later call fails the same way.
    pub async fn poll_once(&self) -> Result<CycleOutcome, CoreError> {
        let mut state = self.state.lock().await;
        if let Some(message) = &state.fault {
            return Err(CoreError::InvariantViolation {
                message: message.clone(),
            });
        }

        self.status.begin();

        let snapshot = match with_timeout(self.timeout, self.service.sensor_snapshot()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(task = Self::NAME, error = %e, "sensor feed poll failed");
                self.status.skipped(&e);
                return Ok(CycleOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
        };

        self.status.set_phase(PollPhase::Applying);

        let emitted = match state.differ.diff(&snapshot) {
            Diff::Unchanged => 0,
            Diff::Shrunk { baseline, current } => {
                warn!(baseline, current, "sensor feed shrank; keeping previous baseline");
                self.status.succeeded();
                return Ok(CycleOutcome::Applied { emitted: 0 });
            }
            Diff::Appended(new) => {
                let mut id = self.ledger.last_id();
                let batch: Vec<Notification> = new
                    .iter()
                    .map(|record| {
                        id = id.saturating_add(1);
                        Notification::fall_detected(id, record)
                    })
                    .collect();
                let count = batch.len();

                if let Err(e) = self.ledger.append(batch) {
                    error!(error = %e, "notification ledger rejected batch; halting feed loop");
                    if let CoreError::InvariantViolation { message } = &e {
                        state.fault = Some(message.clone());
                    }
                    self.status.halt(&e);
                    return Err(e);
                }

                for record in new {
                    info!(device = %record.device_id, time = %record.timestamp, "fall detected");
                }
                count
            }
        };

        state.differ.commit(snapshot);
        self.status.succeeded();
        debug!(
            records = state.differ.baseline_len(),
            emitted, "sensor feed applied"
        );

        Ok(CycleOutcome::Applied { emitted })
    }
}

impl<S: SensorService> PollTask for FeedPoller<S> {
    const NAME: &'static str = "sensor-feed";

    fn status(&self) -> &LoopStatus {
        &self.status
    }

    async fn cycle(&self) -> Result<CycleOutcome, CoreError> {
        self.poll_once().await
    }
}
