use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{read_json, write_json};
use crate::domain::{Feature, FeatureCollection, MetadataTable};
use crate::geometry::{Precision, simplify_geometry};

/// Property of the base boundary file holding the ISO-3166-1 alpha-2 code
pub const ISO_PROPERTY: &str = "ISO_A2";

#[derive(Debug, Clone, Copy)]
pub struct CountryOptions {
    pub precision: Precision,
    pub simplify_tolerance: f64,
}

#[derive(Debug, Clone)]
pub struct CountriesReport {
    pub written: usize,
    /// Metadata codes with no boundary in the base collection
    pub dropped: Vec<String>,
    pub output: PathBuf,
}

/// Keep the boundaries listed in the metadata table and merge their travel data
///
/// Each kept feature's properties become the metadata record without
/// `cities`, plus `code`. Codes without a boundary are skipped silently; a
/// second boundary for a code already kept is ignored.
pub fn join_countries(
    metadata: &MetadataTable,
    boundaries: FeatureCollection,
) -> FeatureCollection {
    let FeatureCollection {
        type_,
        features,
        foreign,
    } = boundaries;
    let mut seen = HashSet::new();
    let mut joined = Vec::new();

    for feature in features {
        let Some(code) = feature.property_str(ISO_PROPERTY).map(str::to_string) else {
            continue;
        };
        let Some(record) = metadata.get(&code) else {
            continue;
        };
        if !seen.insert(code.clone()) {
            log::debug!("Duplicate boundary for {} ignored", code);
            continue;
        }

        joined.push(Feature {
            properties: Some(record.merged_properties(&code)),
            ..feature
        });
    }

    FeatureCollection {
        type_,
        features: joined,
        foreign,
    }
}

/// Metadata codes that have no matching boundary in the joined collection
pub fn missing_codes(metadata: &MetadataTable, joined: &FeatureCollection) -> Vec<String> {
    let present: HashSet<&str> = joined
        .features
        .iter()
        .filter_map(|f| f.property_str("code"))
        .collect();
    metadata
        .keys()
        .filter(|code| !present.contains(code.as_str()))
        .cloned()
        .collect()
}

/// Simplify outlines, then round every coordinate
pub fn compact_countries(collection: &FeatureCollection, options: &CountryOptions) -> Result<Value> {
    let mut compacted = collection.clone();
    for feature in &mut compacted.features {
        feature.geometry = simplify_geometry(&feature.geometry, options.simplify_tolerance);
    }
    let value = serde_json::to_value(&compacted)?;
    Ok(options.precision.round(&value)?)
}

/// Read both inputs, join them and write the country layer
pub fn run_countries(
    metadata: &MetadataTable,
    boundaries_path: &Path,
    output: &Path,
    options: &CountryOptions,
) -> Result<CountriesReport> {
    let boundaries: FeatureCollection = read_json(boundaries_path)
        .context("Failed to load country boundaries")?;
    log::debug!(
        "Loaded {} boundaries from {}",
        boundaries.features.len(),
        boundaries_path.display()
    );

    let joined = join_countries(metadata, boundaries);
    let dropped = missing_codes(metadata, &joined);
    for code in &dropped {
        log::debug!("No boundary for {}, skipped", code);
    }

    let compacted = compact_countries(&joined, options).context("Failed to round country geometry")?;
    write_json(output, &compacted)?;
    log::info!(
        "{} written with {} countries",
        output.display(),
        joined.features.len()
    );

    Ok(CountriesReport {
        written: joined.features.len(),
        dropped,
        output: output.to_path_buf(),
    })
}
