use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Errors that can occur while accepting and forwarding submissions
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Unsupported content encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Malformed report batch: {0}")]
    MalformedBatch(String),

    #[error("Failed to encode relay payload: {0}")]
    RelayPayloadError(String),

    #[error("Relay rejected the batch with status {0}")]
    RelayRejected(u16),

    #[error("Relay request failed: {0}")]
    RelayRequestFailed(String),

    #[error("Relay timeout")]
    RelayTimeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
