#![allow(clippy::unwrap_used)]

// Integration tests for the pollers and the Monitor, driven by a scripted
// in-memory sensor service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use url::Url;

use fallwatch_core::{
    CoreError, CycleOutcome, DeviceStats, FeedPoller, FixedClock, Monitor, MonitorConfig,
    Notification, NotificationLedger, PollPhase, SensorRecord, SensorService,
};

// ── Scripted service ────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Fail {
    Transport,
    Status(u16),
    Malformed,
}

impl From<Fail> for CoreError {
    fn from(f: Fail) -> Self {
        match f {
            Fail::Transport => CoreError::Transport {
                message: "connection refused".into(),
                timed_out: false,
            },
            Fail::Status(status) => CoreError::Protocol {
                message: format!("HTTP {status}"),
                status: Some(status),
            },
            Fail::Malformed => CoreError::Protocol {
                message: "expected `data` to be an array".into(),
                status: None,
            },
        }
    }
}

struct Script {
    stats: Result<DeviceStats, Fail>,
    feed: Result<Vec<SensorRecord>, Fail>,
    feed_delay: Option<Duration>,
    /// Append one record to the feed on every fetch.
    feed_grows: bool,
    submit: Result<serde_json::Value, Fail>,
    submitted: Vec<(SensorRecord, String)>,
    stats_calls: usize,
    feed_calls: usize,
}

#[derive(Clone)]
struct FakeService {
    script: Arc<Mutex<Script>>,
}

impl FakeService {
    fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                stats: Ok(DeviceStats::default()),
                feed: Ok(Vec::new()),
                feed_delay: None,
                feed_grows: false,
                submit: Ok(json!({ "status": "ok" })),
                submitted: Vec::new(),
                stats_calls: 0,
                feed_calls: 0,
            })),
        }
    }

    fn set_stats(&self, stats: Result<DeviceStats, Fail>) {
        self.script.lock().unwrap().stats = stats;
    }

    fn set_feed(&self, feed: Result<Vec<SensorRecord>, Fail>) {
        self.script.lock().unwrap().feed = feed;
    }

    fn set_feed_delay(&self, delay: Duration) {
        self.script.lock().unwrap().feed_delay = Some(delay);
    }

    fn set_feed_growing(&self) {
        self.script.lock().unwrap().feed_grows = true;
    }

    fn set_submit(&self, reply: Result<serde_json::Value, Fail>) {
        self.script.lock().unwrap().submit = reply;
    }

    fn submitted(&self) -> Vec<(SensorRecord, String)> {
        self.script.lock().unwrap().submitted.clone()
    }

    fn feed_calls(&self) -> usize {
        self.script.lock().unwrap().feed_calls
    }

    fn stats_calls(&self) -> usize {
        self.script.lock().unwrap().stats_calls
    }
}

impl SensorService for FakeService {
    async fn device_stats(&self) -> Result<DeviceStats, CoreError> {
        let mut s = self.script.lock().unwrap();
        s.stats_calls += 1;
        s.stats.clone().map_err(CoreError::from)
    }

    async fn sensor_snapshot(&self) -> Result<Vec<SensorRecord>, CoreError> {
        let (reply, delay) = {
            let mut s = self.script.lock().unwrap();
            s.feed_calls += 1;
            if s.feed_grows {
                if let Ok(feed) = &mut s.feed {
                    let next = format!("g{}", feed.len() + 1);
                    feed.push(rec(&next));
                }
            }
            (s.feed.clone(), s.feed_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        reply.map_err(CoreError::from)
    }

    async fn submit_report(
        &self,
        record: &SensorRecord,
        api_key: &SecretString,
    ) -> Result<serde_json::Value, CoreError> {
        let mut s = self.script.lock().unwrap();
        s.submitted
            .push((record.clone(), api_key.expose_secret().to_owned()));
        s.submit.clone().map_err(CoreError::from)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn rec(device: &str) -> SensorRecord {
    SensorRecord {
        device_id: device.into(),
        timestamp: "2025-05-01 10:00:00".into(),
        acc: (0.1, 0.2, 9.7),
        gyro: (0.0, 0.0, 0.0),
    }
}

fn records(devices: &[&str]) -> Vec<SensorRecord> {
    devices.iter().copied().map(rec).collect()
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(9, 3, 7)
            .unwrap(),
    ))
}

fn config() -> MonitorConfig {
    MonitorConfig::new(Url::parse("http://sensors.test").unwrap())
}

fn monitor(service: &FakeService) -> Monitor<FakeService> {
    Monitor::with_service(config(), service.clone(), clock())
}

fn monitor_with_key(service: &FakeService) -> Monitor<FakeService> {
    let config = config().with_api_key(SecretString::from("k-123"));
    Monitor::with_service(config, service.clone(), clock())
}

fn ledger_lines(m: &Monitor<FakeService>) -> Vec<String> {
    m.notifications().iter().map(ToString::to_string).collect()
}

// ── Sensor feed scenarios ───────────────────────────────────────────

#[tokio::test]
async fn first_record_gets_id_one() {
    let service = FakeService::new();
    let m = monitor(&service);

    service.set_feed(Ok(records(&["d1"])));
    let outcome = m.poll_feed_now().await.unwrap();

    assert_eq!(outcome, CycleOutcome::Applied { emitted: 1 });
    assert_eq!(
        m.notifications().as_slice(),
        &[Notification {
            id: 1,
            message: "d1 Fall detected".into(),
        }]
    );
    assert_eq!(m.fall_count(), 1);
}

#[tokio::test]
async fn appended_suffix_gets_next_ids() {
    let service = FakeService::new();
    let m = monitor(&service);

    service.set_feed(Ok(records(&["r1"])));
    m.poll_feed_now().await.unwrap();
    let before = m.notifications();

    service.set_feed(Ok(records(&["r1", "r2", "r3"])));
    let outcome = m.poll_feed_now().await.unwrap();

    assert_eq!(outcome, CycleOutcome::Applied { emitted: 2 });
    assert_eq!(
        ledger_lines(&m),
        vec!["1 r1 Fall detected", "2 r2 Fall detected", "3 r3 Fall detected"]
    );
    // Earlier snapshot untouched by the later append.
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].message, "r1 Fall detected");
}

#[tokio::test]
async fn failed_poll_keeps_baseline() {
    let service = FakeService::new();
    let m = monitor(&service);

    service.set_feed(Ok(records(&["d1"])));
    m.poll_feed_now().await.unwrap();

    service.set_feed(Err(Fail::Transport));
    let outcome = m.poll_feed_now().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Skipped { .. }));
    assert_eq!(m.fall_count(), 1);

    service.set_feed(Ok(records(&["d1", "d2"])));
    m.poll_feed_now().await.unwrap();
    assert_eq!(ledger_lines(&m), vec!["1 d1 Fall detected", "2 d2 Fall detected"]);

    let health = m.feed_health();
    assert_eq!(health.failures, 1);
    assert_eq!(health.successes, 2);
    assert_eq!(health.consecutive_failures, 0);
}

#[tokio::test]
async fn malformed_snapshot_is_skipped() {
    let service = FakeService::new();
    let m = monitor(&service);

    service.set_feed(Ok(records(&["d1"])));
    m.poll_feed_now().await.unwrap();

    service.set_feed(Err(Fail::Malformed));
    let outcome = m.poll_feed_now().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Skipped { .. }));

    service.set_feed(Ok(records(&["d1", "d2"])));
    assert_eq!(
        m.poll_feed_now().await.unwrap(),
        CycleOutcome::Applied { emitted: 1 }
    );
    assert_eq!(m.fall_count(), 2);
}

#[tokio::test]
async fn unchanged_snapshot_never_grows_ledger() {
    let service = FakeService::new();
    let m = monitor(&service);

    service.set_feed(Ok(records(&["d1", "d2"])));
    m.poll_feed_now().await.unwrap();

    for _ in 0..5 {
        assert_eq!(
            m.poll_feed_now().await.unwrap(),
            CycleOutcome::Applied { emitted: 0 }
        );
    }
    assert_eq!(m.fall_count(), 2);
}

#[tokio::test]
async fn shrinking_feed_does_not_lower_baseline() {
    let service = FakeService::new();
    let m = monitor(&service);

    service.set_feed(Ok(records(&["a", "b", "c"])));
    m.poll_feed_now().await.unwrap();

    service.set_feed(Ok(records(&["a"])));
    assert_eq!(
        m.poll_feed_now().await.unwrap(),
        CycleOutcome::Applied { emitted: 0 }
    );

    // Growth is measured against the three-record baseline, not the one.
    service.set_feed(Ok(records(&["a", "b", "c", "d"])));
    assert_eq!(
        m.poll_feed_now().await.unwrap(),
        CycleOutcome::Applied { emitted: 1 }
    );
    assert_eq!(
        ledger_lines(&m),
        vec![
            "1 a Fall detected",
            "2 b Fall detected",
            "3 c Fall detected",
            "4 d Fall detected",
        ]
    );
}

#[tokio::test]
async fn ledger_length_is_sum_of_positive_growth() {
    let service = FakeService::new();
    let m = monitor(&service);

    let feeds: [&[&str]; 6] = [
        &["a"],
        &["a", "b", "c"],
        &["a", "b", "c"],
        &["a", "b"],
        &["a", "b", "c", "d"],
        &["a", "b", "c", "d", "e", "f"],
    ];

    let mut last_len = 0;
    for feed in feeds {
        service.set_feed(Ok(records(feed)));
        m.poll_feed_now().await.unwrap();
        let len = m.fall_count();
        assert!(len >= last_len, "ledger shrank from {last_len} to {len}");
        last_len = len;
    }

    assert_eq!(m.fall_count(), 6);
    let ids: Vec<u64> = m.notifications().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn notification_stream_sees_new_batches() {
    let service = FakeService::new();
    let m = monitor(&service);
    let mut stream = m.notification_stream();

    service.set_feed(Ok(records(&["d1", "d2"])));
    m.poll_feed_now().await.unwrap();

    let batch = stream.next_batch().await.unwrap();
    let lines: Vec<String> = batch.iter().map(ToString::to_string).collect();
    assert_eq!(lines, vec!["1 d1 Fall detected", "2 d2 Fall detected"]);
}

#[tokio::test(start_paused = true)]
async fn slow_feed_times_out_as_failure() {
    let service = FakeService::new();
    let m = monitor(&service);

    service.set_feed(Ok(records(&["d1"])));
    service.set_feed_delay(Duration::from_secs(5));

    let outcome = m.poll_feed_now().await.unwrap();
    let CycleOutcome::Skipped { reason } = outcome else {
        panic!("expected a skipped cycle");
    };
    assert!(reason.contains("timed out"), "reason: {reason}");
    assert_eq!(m.fall_count(), 0);
    assert_eq!(m.feed_health().failures, 1);
}

#[tokio::test]
async fn rejected_append_halts_feed() {
    let service = FakeService::new();
    let ledger = Arc::new(NotificationLedger::new());
    ledger
        .append(vec![Notification {
            id: u64::MAX,
            message: "seed Fall detected".into(),
        }])
        .unwrap();

    let poller = FeedPoller::new(
        Arc::new(service.clone()),
        Arc::clone(&ledger),
        Duration::from_secs(1),
    );
    service.set_feed(Ok(records(&["d1"])));

    let err = poller.poll_once().await.unwrap_err();
    assert!(matches!(err, CoreError::InvariantViolation { .. }));
    assert_eq!(ledger.len(), 1);
    assert_eq!(poller.health().phase, PollPhase::Halted);
    assert!(poller.fault().is_some());

    // Halted for good: no further fetches.
    let calls = service.feed_calls();
    assert_err!(poller.poll_once().await);
    assert_eq!(service.feed_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn overlapping_feed_cycles_number_every_record_once() {
    let service = FakeService::new();
    service.set_feed_growing();
    service.set_feed_delay(Duration::from_millis(50));

    let ledger = Arc::new(NotificationLedger::new());
    let poller = Arc::new(FeedPoller::new(
        Arc::new(service.clone()),
        Arc::clone(&ledger),
        Duration::from_secs(1),
    ));

    let cycles: Vec<_> = (0..8)
        .map(|_| {
            let poller = Arc::clone(&poller);
            tokio::spawn(async move { poller.poll_once().await })
        })
        .collect();
    for cycle in cycles {
        let outcome = cycle.await.unwrap().unwrap();
        assert_eq!(outcome, CycleOutcome::Applied { emitted: 1 });
    }

    let lines: Vec<String> = ledger.snapshot().iter().map(ToString::to_string).collect();
    let expected: Vec<String> = (1..=8).map(|i| format!("{i} g{i} Fall detected")).collect();
    assert_eq!(lines, expected);
    assert_eq!(poller.baseline_len().await, 8);
    assert_eq!(service.feed_calls(), 8);
}

#[tokio::test(start_paused = true)]
async fn manual_polls_and_periodic_loop_share_one_baseline() {
    let service = FakeService::new();
    service.set_feed_growing();
    service.set_feed_delay(Duration::from_millis(300));

    let m = monitor(&service);
    m.start().await.unwrap();

    let manual: Vec<_> = (0..6)
        .map(|_| {
            let m = m.clone();
            tokio::spawn(async move { m.poll_feed_now().await })
        })
        .collect();
    for poll in manual {
        assert_ok!(poll.await.unwrap());
    }
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_ok!(m.shutdown().await);

    // Every fetch grew the feed by one record; each record is reported
    // exactly once, in order, whichever cycle happened to fetch it.
    let lines = ledger_lines(&m);
    assert!(lines.len() >= 6, "only {} notifications", lines.len());
    let expected: Vec<String> = (1..=lines.len())
        .map(|i| format!("{i} g{i} Fall detected"))
        .collect();
    assert_eq!(lines, expected);
}

#[tokio::test(start_paused = true)]
async fn halted_feed_escalates_through_monitor() {
    let service = FakeService::new();
    service.set_stats(Ok(DeviceStats {
        active_count: 1,
        total_count: 4,
    }));
    service.set_feed(Ok(records(&["d1"])));

    let ledger = Arc::new(NotificationLedger::new());
    ledger
        .append(vec![Notification {
            id: u64::MAX,
            message: "seed Fall detected".into(),
        }])
        .unwrap();
    let m = Monitor::with_ledger(config(), service.clone(), clock(), ledger);
    let mut feed_health = m.subscribe_feed_health();

    m.start().await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(1),
        feed_health.wait_for(|h| h.phase == PollPhase::Halted),
    )
    .await
    .unwrap()
    .unwrap();

    let fault = m.fault().unwrap();
    assert!(fault.contains("not greater than"), "fault: {fault}");
    assert_eq!(m.fall_count(), 1);

    // The feed loop has exited; stats keep polling.
    let feed_calls = service.feed_calls();
    let stats_calls = service.stats_calls();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(service.feed_calls(), feed_calls);
    assert!(service.stats_calls() > stats_calls);
    assert_eq!(m.device_stats().total_count, 4);
    assert!(m.is_running().await);

    let err = m.shutdown().await.unwrap_err();
    assert!(matches!(err, CoreError::InvariantViolation { .. }));
    assert_eq!(m.feed_health().phase, PollPhase::Halted);
    assert_eq!(m.stats_health().phase, PollPhase::Stopped);
    assert!(m.fault().is_some());
}

// ── Device stats ────────────────────────────────────────────────────

#[tokio::test]
async fn stats_start_at_zero() {
    let service = FakeService::new();
    let m = monitor(&service);
    assert_eq!(m.device_stats(), DeviceStats::default());
}

#[tokio::test]
async fn stats_replace_and_survive_failure() {
    let service = FakeService::new();
    let m = monitor(&service);

    service.set_stats(Ok(DeviceStats {
        active_count: 3,
        total_count: 10,
    }));
    assert_eq!(
        m.poll_stats_now().await,
        CycleOutcome::Applied { emitted: 0 }
    );
    assert_eq!(m.device_stats().total_count, 10);
    assert_eq!(m.device_stats().active_count, 3);

    service.set_stats(Err(Fail::Status(503)));
    assert!(matches!(
        m.poll_stats_now().await,
        CycleOutcome::Skipped { .. }
    ));
    assert_eq!(m.device_stats().total_count, 10);

    let health = m.stats_health();
    assert_eq!(health.failures, 1);
    assert_eq!(health.last_error.as_deref(), Some("Protocol error: HTTP 503"));
}

#[tokio::test]
async fn loops_fail_independently() {
    let service = FakeService::new();
    let m = monitor(&service);

    service.set_stats(Err(Fail::Transport));
    service.set_feed(Ok(records(&["d1"])));
    m.poll_stats_now().await;
    m.poll_feed_now().await.unwrap();
    assert_eq!(m.fall_count(), 1);

    service.set_stats(Ok(DeviceStats {
        active_count: 1,
        total_count: 4,
    }));
    service.set_feed(Err(Fail::Transport));
    m.poll_stats_now().await;
    m.poll_feed_now().await.unwrap();
    assert_eq!(m.device_stats().total_count, 4);
    assert_eq!(m.fall_count(), 1);
}

// ── Manual submit ───────────────────────────────────────────────────

#[tokio::test]
async fn submit_returns_response_body() {
    let service = FakeService::new();
    let m = monitor_with_key(&service);
    service.set_submit(Ok(json!({ "result": "fall", "confidence": 0.97 })));

    let body = m.submit_report(None).await.unwrap();
    assert_eq!(body, json!({ "result": "fall", "confidence": 0.97 }));

    let sent = service.submitted();
    assert_eq!(sent.len(), 1);
    let (record, key) = &sent[0];
    assert_eq!(record, &SensorRecord::test_report("2025-05-01 09:03:07"));
    assert_eq!(key, "k-123");
    assert_eq!(m.fall_count(), 0);
}

#[tokio::test]
async fn submit_sends_caller_record() {
    let service = FakeService::new();
    let m = monitor_with_key(&service);

    m.submit_report(Some(rec("wrist-2"))).await.unwrap();
    assert_eq!(service.submitted()[0].0.device_id, "wrist-2");
}

#[tokio::test]
async fn submit_failure_wraps_cause() {
    let service = FakeService::new();
    let m = monitor_with_key(&service);
    service.set_submit(Err(Fail::Status(500)));

    let err = m.submit_report(None).await.unwrap_err();
    let CoreError::SubmissionFailed { source } = err else {
        panic!("expected SubmissionFailed");
    };
    assert!(matches!(*source, CoreError::Protocol { status: Some(500), .. }));
    assert_eq!(m.fall_count(), 0);
}

#[tokio::test]
async fn submit_without_key_does_no_io() {
    let service = FakeService::new();
    let m = monitor(&service);

    let err = m.submit_report(None).await.unwrap_err();
    assert!(matches!(err, CoreError::MissingApiKey));
    assert!(service.submitted().is_empty());
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn loops_poll_immediately_then_every_period() {
    let service = FakeService::new();
    service.set_stats(Ok(DeviceStats {
        active_count: 2,
        total_count: 5,
    }));
    service.set_feed(Ok(records(&["d1"])));

    let m = monitor(&service);
    m.start().await.unwrap();
    assert!(m.is_running().await);

    // Let the immediate first cycles run.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(m.device_stats().total_count, 5);
    assert_eq!(m.fall_count(), 1);
    assert_eq!(m.timestamp(), "2025-05-01 09:03:07");

    service.set_feed(Ok(records(&["d1", "d2"])));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(m.fall_count(), 2);
    assert!(service.stats_calls() >= 2);

    assert_ok!(m.shutdown().await);
    assert!(!m.is_running().await);
    assert_eq!(m.feed_health().phase, PollPhase::Stopped);
    assert_eq!(m.stats_health().phase, PollPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn shutdown_aborts_in_flight_fetch() {
    let service = FakeService::new();
    service.set_feed(Ok(records(&["d1"])));
    service.set_feed_delay(Duration::from_millis(800));

    let m = monitor(&service);
    m.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    m.shutdown().await.unwrap();
    assert_eq!(m.fall_count(), 0);
    assert_eq!(m.feed_health().phase, PollPhase::Stopped);

    // No loop survives the shutdown.
    let calls = service.feed_calls();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(service.feed_calls(), calls);
}

#[tokio::test]
async fn start_twice_or_after_shutdown_fails() {
    let service = FakeService::new();
    let m = monitor(&service);

    m.start().await.unwrap();
    assert!(matches!(m.start().await, Err(CoreError::Internal(_))));

    m.shutdown().await.unwrap();
    assert!(matches!(m.start().await, Err(CoreError::Internal(_))));
}

#[tokio::test]
async fn zero_period_is_rejected_at_start() {
    let service = FakeService::new();
    let mut config = config();
    config.clock_interval = Duration::ZERO;
    let m = Monitor::with_service(config, service.clone(), clock());

    let err = m.start().await.unwrap_err();
    assert!(matches!(err, CoreError::Config { .. }));
    assert!(!m.is_running().await);
    assert_eq!(service.feed_calls(), 0);
}
