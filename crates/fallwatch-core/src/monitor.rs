// ── Monitor ──
//
// Owns the clock, device-stats and sensor-feed loops for one sensor
// service, plus the read model a presentation layer renders from.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::clock::{Clock, SystemClock, clock_task};
use crate::config::MonitorConfig;
use crate::error::CoreError;
use crate::model::{DeviceStats, Notification, SensorRecord};
use crate::poller::{CycleOutcome, FeedPoller, PollHealth, StatsPoller, run_periodic};
use crate::service::{HttpSensorService, SensorService};
use crate::store::NotificationLedger;
use crate::stream::NotificationStream;
use crate::submit::ReportSubmitter;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Construct, call
/// [`start()`](Self::start), read through the accessors, and finally
/// [`shutdown()`](Self::shutdown) to stop every loop together.
pub struct Monitor<S: SensorService = HttpSensorService> {
    inner: Arc<MonitorInner<S>>,
}

impl<S: SensorService> Clone for Monitor<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct MonitorInner<S: SensorService> {
    config: MonitorConfig,
    service: Arc<S>,
    clock: Arc<dyn Clock>,
    timestamp: watch::Sender<String>,
    ledger: Arc<NotificationLedger>,
    stats: Arc<StatsPoller<S>>,
    feed: Arc<FeedPoller<S>>,
    submitter: ReportSubmitter<S>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<Result<(), CoreError>>>>,
}

impl Monitor<HttpSensorService> {
    /// Monitor backed by the HTTP client and the host clock. Does NOT
    /// start polling; call [`start()`](Self::start).
    pub fn new(config: MonitorConfig) -> Result<Self, CoreError> {
        let service = HttpSensorService::from_config(&config)?;
        Ok(Self::with_service(config, service, Arc::new(SystemClock)))
    }
}

impl<S: SensorService> Monitor<S> {
    /// Monitor over any [`SensorService`] with an injected clock.
    pub fn with_service(config: MonitorConfig, service: S, clock: Arc<dyn Clock>) -> Self {
        Self::with_ledger(config, service, clock, Arc::new(NotificationLedger::new()))
    }

    /// Monitor that appends to an existing ledger, so notifications and
    /// their numbering carry over from an earlier monitor.
    pub fn with_ledger(
        config: MonitorConfig,
        service: S,
        clock: Arc<dyn Clock>,
        ledger: Arc<NotificationLedger>,
    ) -> Self {
        let service = Arc::new(service);
        let timeout = config.effective_timeout();
        let (timestamp, _) = watch::channel(clock.timestamp());

        let stats = Arc::new(StatsPoller::new(Arc::clone(&service), timeout));
        let feed = Arc::new(FeedPoller::new(
            Arc::clone(&service),
            Arc::clone(&ledger),
            timeout,
        ));
        let submitter = ReportSubmitter::new(
            Arc::clone(&service),
            config.api_key.clone(),
            Arc::clone(&clock),
            timeout,
        );

        Self {
            inner: Arc::new(MonitorInner {
                config,
                service,
                clock,
                timestamp,
                ledger,
                stats,
                feed,
                submitter,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The ledger notifications are appended to.
    pub fn ledger(&self) -> &Arc<NotificationLedger> {
        &self.inner.ledger
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn service(&self) -> &Arc<S> {
        &self.inner.service
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the clock, device-stats and sensor-feed loops.
    ///
    /// Each poller runs its first cycle immediately. Fails if a period is
    /// zero, or if the monitor is already running or has been shut down.
    pub async fn start(&self) -> Result<(), CoreError> {
        self.inner.config.validate()?;
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Internal("monitor has been shut down".into()));
        }

        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            return Err(CoreError::Internal("monitor is already running".into()));
        }

        let config = &self.inner.config;

        {
            let clock = Arc::clone(&self.inner.clock);
            let tx = self.inner.timestamp.clone();
            let cancel = self.inner.cancel.child_token();
            let period = config.clock_interval;
            handles.push(tokio::spawn(async move {
                clock_task(clock, period, tx, cancel).await;
                Ok(())
            }));
        }

        handles.push(tokio::spawn(run_periodic(
            Arc::clone(&self.inner.stats),
            config.stats_interval,
            self.inner.cancel.child_token(),
        )));

        {
            let feed = Arc::clone(&self.inner.feed);
            let period = config.feed_interval;
            let cancel = self.inner.cancel.child_token();
            handles.push(tokio::spawn(async move {
                let result = run_periodic(feed, period, cancel).await;
                if let Err(ref e) = result {
                    error!(error = %e, "sensor feed loop halted");
                }
                result
            }));
        }

        info!(
            base_url = %config.base_url,
            timeout = ?config.effective_timeout(),
            "monitor started"
        );
        Ok(())
    }

    /// Cancel every loop, abort in-flight requests and wait for the tasks
    /// to finish.
    ///
    /// Returns the error that halted a loop, if one did.
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        self.inner.cancel.cancel();

        let mut first_err = None;
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(e) => Err(CoreError::Internal(format!("poll task panicked: {e}"))),
            };
            if let Err(e) = outcome {
                first_err.get_or_insert(e);
            }
        }

        debug!(notifications = self.inner.ledger.len(), "monitor stopped");
        first_err.map_or(Ok(()), Err)
    }

    /// `true` between `start()` and `shutdown()`.
    pub async fn is_running(&self) -> bool {
        !self.inner.cancel.is_cancelled() && !self.inner.task_handles.lock().await.is_empty()
    }

    // ── Read model ───────────────────────────────────────────────

    /// Clock text, refreshed once per clock period.
    pub fn timestamp(&self) -> String {
        self.inner.timestamp.borrow().clone()
    }

    pub fn subscribe_timestamp(&self) -> watch::Receiver<String> {
        self.inner.timestamp.subscribe()
    }

    /// Last successfully polled device counts.
    pub fn device_stats(&self) -> DeviceStats {
        self.inner.stats.current()
    }

    pub fn subscribe_device_stats(&self) -> watch::Receiver<DeviceStats> {
        self.inner.stats.subscribe()
    }

    /// Point-in-time copy of the notification ledger.
    pub fn notifications(&self) -> Arc<Vec<Notification>> {
        self.inner.ledger.snapshot()
    }

    pub fn notification_stream(&self) -> NotificationStream {
        self.inner.ledger.subscribe()
    }

    /// Number of fall events detected so far.
    pub fn fall_count(&self) -> usize {
        self.inner.ledger.len()
    }

    pub fn stats_health(&self) -> PollHealth {
        self.inner.stats.health()
    }

    pub fn feed_health(&self) -> PollHealth {
        self.inner.feed.health()
    }

    pub fn subscribe_stats_health(&self) -> watch::Receiver<PollHealth> {
        self.inner.stats.subscribe_health()
    }

    pub fn subscribe_feed_health(&self) -> watch::Receiver<PollHealth> {
        self.inner.feed.subscribe_health()
    }

    /// The invariant violation that halted the feed loop, if any.
    pub fn fault(&self) -> Option<String> {
        self.inner.feed.fault()
    }

    // ── Actions ──────────────────────────────────────────────────

    /// Submit a fall report. `None` sends the default test record stamped
    /// with the current clock time.
    pub async fn submit_report(
        &self,
        record: Option<SensorRecord>,
    ) -> Result<serde_json::Value, CoreError> {
        self.inner.submitter.submit(record).await
    }

    /// The record [`submit_report(None)`](Self::submit_report) would send.
    pub fn default_report(&self) -> SensorRecord {
        self.inner.submitter.default_record()
    }

    /// Run one device-stats cycle outside the timer.
    pub async fn poll_stats_now(&self) -> CycleOutcome {
        self.inner.stats.poll_once().await
    }

    /// Run one sensor-feed cycle outside the timer. Serialized with the
    /// periodic loop.
    pub async fn poll_feed_now(&self) -> Result<CycleOutcome, CoreError> {
        self.inner.feed.poll_once().await
    }
}
