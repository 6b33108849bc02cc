use crate::errors::AggregateError;
use h3o::{LatLng, Resolution};

/// Maps positions to H3 cell ids at a fixed, deployment-wide resolution.
///
/// The resolution comes from configuration and must stay constant for the
/// lifetime of an aggregate database: ids produced at a different resolution
/// never collide with the stored ones.
#[derive(Clone, Copy, Debug)]
pub struct CellIndexer {
    resolution: Resolution,
}

impl CellIndexer {
    pub fn new(resolution: u8) -> Result<Self, AggregateError> {
        let resolution = Resolution::try_from(resolution)
            .map_err(|_| AggregateError::InvalidResolution(resolution))?;
        Ok(CellIndexer { resolution })
    }

    /// Pure function of (lat, lon, resolution): the same coordinates always
    /// yield the same identifier.
    pub fn cell_for(&self, lat: f64, lon: f64) -> Result<String, AggregateError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(AggregateError::InvalidCoordinate { lat, lon });
        }
        let coord =
            LatLng::new(lat, lon).map_err(|_| AggregateError::InvalidCoordinate { lat, lon })?;
        Ok(coord.to_cell(self.resolution).to_string())
    }
}

/// Cell ids are the lowercase-hex H3 index representation.
pub fn is_valid_cell_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
