// Fall report submission endpoint

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::SensorClient;
use crate::error::Error;
use crate::models::{FallReportBody, SensorReading};

impl SensorClient {
    /// Submit one reading for fall analysis.
    ///
    /// `POST /fall-detection` with the reading's fields plus `api_key`.
    /// The response is returned verbatim; its shape is owned by the service.
    pub async fn submit_fall_report(
        &self,
        reading: &SensorReading,
        api_key: &SecretString,
    ) -> Result<serde_json::Value, Error> {
        let url = self.endpoint_url("fall-detection")?;
        debug!(device_id = %reading.device_id, "submitting fall report");
        let body = FallReportBody {
            reading,
            api_key: api_key.expose_secret(),
        };
        self.post(url, &body).await
    }
}
