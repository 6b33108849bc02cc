use crate::config::RelayConfig;
use crate::errors::GatewayError;
use aggregator::report::ReportBatch;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::time::Duration;

/// Client for the upstream submission relay.
///
/// The contract is status-code only: 2xx means the batch was accepted. The
/// relay's behavior beyond that is not our concern.
#[derive(Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    url: url::Url,
    timeout: Duration,
}

impl RelayClient {
    pub fn new(config: &RelayConfig) -> Self {
        RelayClient {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Re-serialize the batch, gzip it, and POST it upstream.
    pub async fn forward(&self, batch: &ReportBatch) -> Result<(), GatewayError> {
        let json = serde_json::to_vec(batch)
            .map_err(|e| GatewayError::RelayPayloadError(e.to_string()))?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&json)
            .map_err(|e| GatewayError::RelayPayloadError(e.to_string()))?;
        let body = encoder
            .finish()
            .map_err(|e| GatewayError::RelayPayloadError(e.to_string()))?;

        let response = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::CONTENT_ENCODING, "gzip")
            .timeout(self.timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::RelayTimeout
                } else {
                    GatewayError::RelayRequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(GatewayError::RelayRejected(response.status().as_u16()));
        }

        Ok(())
    }
}
