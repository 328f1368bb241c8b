use serde::{Deserialize, Serialize};

/// Device registry counts. Replaced wholesale on every successful poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    /// Devices currently reporting an active status.
    pub active_count: u32,
    /// Registered devices.
    pub total_count: u32,
}
