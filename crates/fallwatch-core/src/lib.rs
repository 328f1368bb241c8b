//! Fall-detection monitoring core.
//!
//! Polls a sensor service for device counts and for its record feed,
//! turns newly arrived records into numbered fall notifications, and
//! exposes the result through [`Monitor`]:
//!
//! ```no_run
//! # async fn demo() -> Result<(), fallwatch_core::CoreError> {
//! use fallwatch_core::{Monitor, MonitorConfig};
//!
//! let url = "http://localhost:8090".parse().map_err(|_| {
//!     fallwatch_core::CoreError::Config { message: "bad url".into() }
//! })?;
//! let monitor = Monitor::new(MonitorConfig::new(url))?;
//! monitor.start().await?;
//!
//! let mut feed = monitor.notification_stream();
//! while let Some(batch) = feed.next_batch().await {
//!     for n in batch {
//!         println!("{n}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod convert;
pub mod differ;
pub mod error;
pub mod model;
pub mod monitor;
pub mod poller;
pub mod service;
pub mod store;
pub mod stream;
pub mod submit;

// ── Primary re-exports ──────────────────────────────────────────
pub use clock::{Clock, FixedClock, SystemClock, TIMESTAMP_FORMAT};
pub use config::{DEFAULT_PERIOD, MonitorConfig, TlsVerification};
pub use differ::{Diff, SnapshotDiffer};
pub use error::CoreError;
pub use model::{Axes, DeviceStats, Notification, SensorRecord};
pub use monitor::Monitor;
pub use poller::{CycleOutcome, FeedPoller, PollHealth, PollPhase, StatsPoller};
pub use service::{HttpSensorService, SensorService};
pub use store::NotificationLedger;
pub use stream::{NotificationStream, NotificationWatchStream};
pub use submit::ReportSubmitter;
