// Wire types for the sensor service
//
// Field names follow the service's JSON exactly. Conversion to domain
// types happens in `fallwatch-core`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One IMU sample as stored by the service.
///
/// Every field defaults when absent, `null` or of the wrong type: records
/// are identified by position in the feed, not by content, so one odd
/// field must not hide the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(default, deserialize_with = "lenient_text")]
    pub device_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub time: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub acc_x: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub acc_y: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub acc_z: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub gyro_x: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub gyro_y: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub gyro_z: f64,
}

/// Strings pass through, numbers and booleans are rendered, `null` is empty.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Numbers and numeric strings are read; anything else is `0.0`.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

/// `GET /get_device_stats` response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatsResponse {
    /// Devices currently reporting status 0 (active).
    pub status_0_count: u32,
    pub total_devices: u32,
}

/// `GET /show_data` envelope. `data` is kept loosely typed so a
/// non-array payload can be told apart from a transport failure.
#[derive(Debug, Deserialize)]
pub(crate) struct ShowDataEnvelope {
    #[serde(default)]
    pub data: Option<Value>,
}

/// `POST /fall-detection` request body: the reading plus the API key.
#[derive(Debug, Serialize)]
pub(crate) struct FallReportBody<'a> {
    #[serde(flatten)]
    pub reading: &'a SensorReading,
    pub api_key: &'a str,
}
