// Sensor feed endpoint

use tracing::{debug, warn};

use crate::client::SensorClient;
use crate::error::Error;
use crate::models::{SensorReading, ShowDataEnvelope};

impl SensorClient {
    /// Fetch every reading the service currently holds, in source order.
    ///
    /// `GET /show_data`
    ///
    /// A body whose `data` field is missing or not an array is rejected
    /// with [`Error::Deserialization`] rather than read as an empty feed.
    pub async fn show_data(&self) -> Result<Vec<SensorReading>, Error> {
        let url = self.endpoint_url("show_data")?;
        let envelope: ShowDataEnvelope = self.get(url).await?;

        let data = match envelope.data {
            Some(serde_json::Value::Array(items)) => items,
            Some(other) => {
                return Err(Error::Deserialization {
                    message: format!("expected `data` to be an array, got {}", kind(&other)),
                    body: other.to_string(),
                });
            }
            None => {
                return Err(Error::Deserialization {
                    message: "response has no `data` field".into(),
                    body: String::new(),
                });
            }
        };

        // A record that is not an object still holds its position in the feed.
        let readings: Vec<SensorReading> = data
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value(item).unwrap_or_else(|e| {
                    warn!(index, error = %e, "unreadable sensor record; using defaults");
                    SensorReading::default()
                })
            })
            .collect();
        debug!(records = readings.len(), "fetched sensor snapshot");
        Ok(readings)
    }
}

fn kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
