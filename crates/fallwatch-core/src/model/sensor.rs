use serde::{Deserialize, Serialize};

/// A three-axis sample `(x, y, z)`.
pub type Axes = (f64, f64, f64);

/// One IMU reading held by the sensor service.
///
/// Immutable once read. Identity is its position in the feed; no field
/// is assumed to be unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub device_id: String,
    pub timestamp: String,
    /// Accelerometer, m/s².
    pub acc: Axes,
    /// Gyroscope, rad/s.
    pub gyro: Axes,
}

impl SensorRecord {
    /// Device id used for manually injected test reports.
    pub const TEST_DEVICE_ID: &'static str = "test7";

    /// The canned reading sent by a manual test report: a device at rest,
    /// gravity on the z axis.
    pub fn test_report(timestamp: impl Into<String>) -> Self {
        Self {
            device_id: Self::TEST_DEVICE_ID.into(),
            timestamp: timestamp.into(),
            acc: (0.0, 0.0, 9.81),
            gyro: (0.0, 0.0, 0.0),
        }
    }
}
