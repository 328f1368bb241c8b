// ── Domain model ──
//
// Canonical types shared by the pollers, the ledger and consumers.
// Wire shapes live in `fallwatch-api`; `convert` maps between them.

pub mod device_stats;
pub mod notification;
pub mod sensor;

pub use device_stats::DeviceStats;
pub use notification::Notification;
pub use sensor::{Axes, SensorRecord};
