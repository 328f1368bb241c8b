// ── Wall clock ──
//
// Produces the formatted timestamp shown alongside the live counters and
// stamped onto manual test reports. Injectable so tests can pin time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// 24-hour, zero-padded local time: `2025-05-01 09:03:07`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of local wall-clock time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;

    /// The current time rendered with [`TIMESTAMP_FORMAT`].
    fn timestamp(&self) -> String {
        format_timestamp(&self.now())
    }
}

/// The host's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Republish the formatted timestamp once per `period` until cancelled.
pub(crate) async fn clock_task(
    clock: Arc<dyn Clock>,
    period: Duration,
    tx: watch::Sender<String>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let now = clock.timestamp();
                trace!(%now, "clock tick");
                tx.send_replace(now);
            }
        }
    }
}
