// Sensor service HTTP client
//
// Wraps `reqwest::Client` with base-URL handling, status checking and
// JSON body decoding. Endpoint methods live in `devices`, `sensors` and
// `reports` as inherent impls to keep this module focused on transport
// mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Longest body excerpt carried in error messages.
const BODY_PREVIEW_LEN: usize = 200;

/// Raw HTTP client for the fall-detection sensor service.
///
/// Cheap to clone: the inner `reqwest::Client` is reference counted, so
/// each polling loop can hold its own handle.
#[derive(Debug, Clone)]
pub struct SensorClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_ms: u64,
}

impl SensorClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the service root, e.g. `http://gateway:8090`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout_ms: duration_ms(transport.timeout),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout_ms: 0,
        }
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{path}`, keeping any path prefix the base URL carries.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/{}", path.trim_start_matches('/'));
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        self.decode(resp).await
    }

    /// Send a POST request with a JSON body and decode the JSON response.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        self.decode(resp).await
    }

    /// Check the status, then parse the body as `T`.
    async fn decode<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body: preview(&body).to_owned(),
            });
        }

        let body = resp.text().await.map_err(|e| self.send_error(e))?;
        trace!(len = body.len(), "response body received");

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }

    fn send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            Error::Transport(err)
        }
    }
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

fn duration_ms(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> SensorClient {
        SensorClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn endpoint_url_joins_root() {
        let c = client("http://gateway:8090");
        assert_eq!(
            c.endpoint_url("show_data").unwrap().as_str(),
            "http://gateway:8090/show_data"
        );
    }

    #[test]
    fn endpoint_url_keeps_path_prefix() {
        let c = client("http://gateway:8090/api/");
        assert_eq!(
            c.endpoint_url("/get_device_stats").unwrap().as_str(),
            "http://gateway:8090/api/get_device_stats"
        );
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(BODY_PREVIEW_LEN + 10);
        assert_eq!(preview(&long).chars().count(), BODY_PREVIEW_LEN);
        assert_eq!(preview("short"), "short");
    }
}
