// ── API → domain conversions ──
//
// Maps `fallwatch-api` wire types into canonical domain types and back.

use fallwatch_api::{DeviceStatsResponse, SensorReading};

use crate::model::{DeviceStats, SensorRecord};

impl From<SensorReading> for SensorRecord {
    fn from(r: SensorReading) -> Self {
        Self {
            device_id: r.device_id,
            timestamp: r.time,
            acc: (r.acc_x, r.acc_y, r.acc_z),
            gyro: (r.gyro_x, r.gyro_y, r.gyro_z),
        }
    }
}

impl From<&SensorRecord> for SensorReading {
    fn from(r: &SensorRecord) -> Self {
        let (acc_x, acc_y, acc_z) = r.acc;
        let (gyro_x, gyro_y, gyro_z) = r.gyro;
        Self {
            device_id: r.device_id.clone(),
            time: r.timestamp.clone(),
            acc_x,
            acc_y,
            acc_z,
            gyro_x,
            gyro_y,
            gyro_z,
        }
    }
}

impl From<DeviceStatsResponse> for DeviceStats {
    fn from(r: DeviceStatsResponse) -> Self {
        Self {
            active_count: r.status_0_count,
            total_count: r.total_devices,
        }
    }
}
