// ── Periodic polling ──
//
// Each loop owns one `PollTask` and drives it on a fixed-period timer.
// Recoverable failures are absorbed inside the task's cycle; only a
// fatal error (an invariant violation) ends the loop early.

mod feed;
mod stats;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CoreError;

pub use feed::FeedPoller;
pub use stats::StatsPoller;

/// Where a polling loop currently is in its cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PollPhase {
    /// Waiting for the next tick.
    #[default]
    Idle,
    Fetching,
    Applying,
    /// The cycle failed and is being discarded.
    Skipping,
    /// Stopped after a fatal error. No further cycles run.
    Halted,
    /// Cancelled.
    Stopped,
}

/// Health counters for one polling loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollHealth {
    pub phase: PollPhase,
    /// Cycles started.
    pub cycles: u64,
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

/// What one poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Fetched and applied. `emitted` counts new notifications (always
    /// zero for the stats loop).
    Applied { emitted: usize },
    /// Fetch or parse failed; state left untouched.
    Skipped { reason: String },
}

/// Publishes a loop's [`PollHealth`] so it can be read mid-cycle.
#[derive(Debug)]
pub(crate) struct LoopStatus {
    tx: watch::Sender<PollHealth>,
}

impl LoopStatus {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(PollHealth::default());
        Self { tx }
    }

    pub(crate) fn snapshot(&self) -> PollHealth {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<PollHealth> {
        self.tx.subscribe()
    }

    pub(crate) fn phase(&self) -> PollPhase {
        self.tx.borrow().phase
    }

    pub(crate) fn set_phase(&self, phase: PollPhase) {
        self.tx.send_if_modified(|h| {
            let changed = h.phase != phase;
            h.phase = phase;
            changed
        });
    }

    pub(crate) fn begin(&self) {
        self.tx.send_modify(|h| {
            h.phase = PollPhase::Fetching;
            h.cycles += 1;
        });
    }

    pub(crate) fn succeeded(&self) {
        self.tx.send_modify(|h| {
            h.phase = PollPhase::Idle;
            h.successes += 1;
            h.consecutive_failures = 0;
        });
    }

    pub(crate) fn skipped(&self, err: &CoreError) {
        self.tx.send_modify(|h| {
            h.phase = PollPhase::Skipping;
            h.failures += 1;
            h.consecutive_failures = h.consecutive_failures.saturating_add(1);
            h.last_error = Some(err.to_string());
        });
        self.set_phase(PollPhase::Idle);
    }

    pub(crate) fn halt(&self, err: &CoreError) {
        self.tx.send_modify(|h| {
            h.phase = PollPhase::Halted;
            h.last_error = Some(err.to_string());
        });
    }

    /// Mark cancelled. A halted loop stays halted.
    pub(crate) fn stop(&self) {
        self.tx.send_if_modified(|h| {
            if h.phase == PollPhase::Halted {
                return false;
            }
            h.phase = PollPhase::Stopped;
            true
        });
    }
}

/// One pollable source.
pub(crate) trait PollTask: Send + Sync + 'static {
    /// Loop name used in logs.
    const NAME: &'static str;

    fn status(&self) -> &LoopStatus;

    /// Run a single cycle. Errors only for failures that must stop the loop.
    fn cycle(&self) -> impl Future<Output = Result<CycleOutcome, CoreError>> + Send;
}

/// Drive `task` every `period` until cancelled or a cycle fails fatally.
///
/// The first cycle runs immediately. Overrunning ticks are skipped rather
/// than queued, and cycles never overlap within one loop. Cancellation
/// also aborts a cycle that is mid-fetch.
pub(crate) async fn run_periodic<T: PollTask>(
    task: Arc<T>,
    period: Duration,
    cancel: CancellationToken,
) -> Result<(), CoreError> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break Ok(()),
            _ = interval.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break Ok(()),
            outcome = task.cycle() => outcome,
        };

        match outcome {
            Ok(outcome) => debug!(task = T::NAME, ?outcome, "poll cycle finished"),
            Err(e) => break Err(e),
        }
    };

    task.status().stop();
    debug!(task = T::NAME, "poll loop exited");
    result
}
