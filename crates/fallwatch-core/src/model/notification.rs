use std::fmt;

use serde::{Deserialize, Serialize};

use super::SensorRecord;

/// One detected fall event in the ledger.
///
/// `id` is 1-based, assigned once at emission and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
}

impl Notification {
    /// Build the notification emitted for a newly arrived record.
    pub fn fall_detected(id: u64, record: &SensorRecord) -> Self {
        Self {
            id,
            message: format!("{} Fall detected", record.device_id),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.message)
    }
}
