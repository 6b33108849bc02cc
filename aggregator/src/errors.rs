use thiserror::Error;

/// Result type alias for aggregator operations
pub type Result<T, E = AggregateError> = std::result::Result<T, E>;

/// Errors that can occur while classifying, indexing, or merging reports
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("coordinate out of range: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("invalid cell resolution: {0} (expected 0..=15)")]
    InvalidResolution(u8),

    #[error("invalid cell id: {0:?}")]
    InvalidCellId(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<rusqlite::Error> for AggregateError {
    fn from(e: rusqlite::Error) -> Self {
        AggregateError::StoreUnavailable(e.to_string())
    }
}
