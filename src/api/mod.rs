pub mod nominatim;

use thiserror::Error;

use crate::domain::{CityCoordinate, CityRef};

pub use nominatim::{NominatimClient, NominatimResult, interpret_response, select_match};

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("geocoding request for \"{query}\" failed: {source}")]
    Request {
        query: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("geocoder returned status {status} for \"{query}\"")]
    Status { query: String, status: u16 },
    #[error("failed to parse geocoder response for \"{query}\": {source}")]
    Parse {
        query: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no matching place found for \"{query}\"")]
    NotFound { query: String, raw: String },
    #[error("invalid coordinate \"{value}\" for \"{query}\"")]
    InvalidCoordinate { query: String, value: String },
}

/// Resolves a city to a coordinate; one call is one lookup
pub trait Geocoder {
    fn geocode(&mut self, city: &CityRef) -> Result<CityCoordinate, GeocodeError>;
}
