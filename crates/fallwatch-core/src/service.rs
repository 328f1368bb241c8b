// ── Sensor service seam ──
//
// The pollers and the submitter talk to the remote service only through
// `SensorService`, so tests can script responses without a network.

use std::future::Future;
use std::time::Duration;

use secrecy::SecretString;

use fallwatch_api::transport::{TlsMode, TransportConfig};
use fallwatch_api::{SensorClient, SensorReading};

use crate::config::{MonitorConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{DeviceStats, SensorRecord};

/// The three operations the remote fall-detection service offers.
pub trait SensorService: Send + Sync + 'static {
    /// Current device counts.
    fn device_stats(&self) -> impl Future<Output = Result<DeviceStats, CoreError>> + Send;

    /// Every record the service currently holds, in source order.
    fn sensor_snapshot(&self)
    -> impl Future<Output = Result<Vec<SensorRecord>, CoreError>> + Send;

    /// Submit one record; the response body is returned verbatim.
    fn submit_report(
        &self,
        record: &SensorRecord,
        api_key: &SecretString,
    ) -> impl Future<Output = Result<serde_json::Value, CoreError>> + Send;
}

/// [`SensorService`] backed by the HTTP API.
#[derive(Debug, Clone)]
pub struct HttpSensorService {
    client: SensorClient,
}

impl HttpSensorService {
    pub fn new(client: SensorClient) -> Self {
        Self { client }
    }

    /// Build the HTTP client from monitor configuration.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: tls_to_transport(&config.tls),
            timeout: config.effective_timeout(),
        };
        let client = SensorClient::new(config.base_url.clone(), &transport)?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &SensorClient {
        &self.client
    }
}

impl SensorService for HttpSensorService {
    async fn device_stats(&self) -> Result<DeviceStats, CoreError> {
        Ok(self.client.get_device_stats().await?.into())
    }

    async fn sensor_snapshot(&self) -> Result<Vec<SensorRecord>, CoreError> {
        let readings = self.client.show_data().await?;
        Ok(readings.into_iter().map(SensorRecord::from).collect())
    }

    async fn submit_report(
        &self,
        record: &SensorRecord,
        api_key: &SecretString,
    ) -> Result<serde_json::Value, CoreError> {
        let reading = SensorReading::from(record);
        Ok(self.client.submit_fall_report(&reading, api_key).await?)
    }
}

/// Bound `fut` by `timeout`; an elapsed timer becomes a transport error.
pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, CoreError>>,
) -> Result<T, CoreError> {
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or_else(|_| Err(CoreError::timeout_elapsed(timeout)))
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
