// Device registry endpoint

use tracing::debug;

use crate::client::SensorClient;
use crate::error::Error;
use crate::models::DeviceStatsResponse;

impl SensorClient {
    /// Fetch active and total device counts.
    ///
    /// `GET /get_device_stats`
    pub async fn get_device_stats(&self) -> Result<DeviceStatsResponse, Error> {
        let url = self.endpoint_url("get_device_stats")?;
        let stats: DeviceStatsResponse = self.get(url).await?;
        debug!(
            active = stats.status_0_count,
            total = stats.total_devices,
            "fetched device stats"
        );
        Ok(stats)
    }
}
