//! Output layers of the travel map. Each layer is one GeoJSON file.

pub mod cities;
pub mod countries;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use crate::domain::MetadataTable;

pub use cities::{CitiesReport, CityCache, flatten_cities, resolve_sequential, run_cities};
pub use countries::{CountriesReport, CountryOptions, join_countries, run_countries};

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write compact JSON, creating the parent directory if needed
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn load_metadata(path: &Path) -> Result<MetadataTable> {
    read_json(path).context("Failed to load travel metadata")
}
