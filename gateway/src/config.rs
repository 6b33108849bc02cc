use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Relay timeout cannot be 0")]
    InvalidRelayTimeout,
}

/// When local aggregation runs relative to the relay forward.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelayPolicy {
    /// Relay acceptance gates local aggregation: a rejected batch is a 400
    /// and nothing is merged.
    RelayFirst,
    /// Aggregate locally even when the relay rejects the batch.
    LocalFirst,
}

fn default_policy() -> RelayPolicy {
    RelayPolicy::RelayFirst
}

fn default_relay_timeout() -> u64 {
    10
}

/// Gateway configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for incoming submissions and read-side queries
    pub listener: Listener,
    /// Upstream submission relay
    pub relay: RelayConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        if self.relay.timeout_secs == 0 {
            return Err(ValidationError::InvalidRelayTimeout);
        }
        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Upstream relay configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RelayConfig {
    /// Endpoint that receives a gzip-compressed copy of every batch
    ///
    /// Note: Uses the `url::Url` type for compile-time URL validation.
    /// Invalid URLs will be rejected during config deserialization.
    pub url: Url,
    /// Bound on the whole relay request/response cycle
    #[serde(default = "default_relay_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_policy")]
    pub policy: RelayPolicy,
}
