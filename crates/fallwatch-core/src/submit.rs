// ── Manual report submission ──
//
// Independent of the polling loops: shares only the service handle and
// the clock, never the ledger.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::CoreError;
use crate::model::SensorRecord;
use crate::service::{SensorService, with_timeout};

/// Sends one sensor record to the fall-detection endpoint per call.
pub struct ReportSubmitter<S> {
    service: Arc<S>,
    api_key: Option<SecretString>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl<S: SensorService> ReportSubmitter<S> {
    pub fn new(
        service: Arc<S>,
        api_key: Option<SecretString>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            api_key,
            clock,
            timeout,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The record sent when the caller does not supply one.
    pub fn default_record(&self) -> SensorRecord {
        SensorRecord::test_report(self.clock.timestamp())
    }

    /// Submit `record` (or the default test record) exactly once.
    ///
    /// Fails with [`CoreError::MissingApiKey`] before any I/O when no key
    /// is configured. Every other failure is wrapped in
    /// [`CoreError::SubmissionFailed`].
    pub async fn submit(
        &self,
        record: Option<SensorRecord>,
    ) -> Result<serde_json::Value, CoreError> {
        let api_key = self.api_key.as_ref().ok_or(CoreError::MissingApiKey)?;
        let record = record.unwrap_or_else(|| self.default_record());

        debug!(device = %record.device_id, time = %record.timestamp, "submitting fall report");

        match with_timeout(self.timeout, self.service.submit_report(&record, api_key)).await {
            Ok(body) => {
                info!(device = %record.device_id, "fall report sent");
                Ok(body)
            }
            Err(e) => {
                warn!(device = %record.device_id, error = %e, "fall report failed");
                Err(CoreError::SubmissionFailed {
                    source: Box::new(e),
                })
            }
        }
    }
}
