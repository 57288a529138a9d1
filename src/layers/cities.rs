use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::write_json;
use crate::api::{GeocodeError, Geocoder};
use crate::domain::{
    CityCoordinate, CityRef, Feature, FeatureCollection, MetadataTable, ResolvedCity,
};

#[derive(Debug, Clone)]
pub struct CitiesReport {
    pub cached: usize,
    pub resolved: usize,
    pub output: PathBuf,
}

/// Every city of every metadata entry, paired with its country's display name
///
/// Order follows the metadata table, then each country's list. A city listed
/// twice for the same country appears once.
pub fn flatten_cities(metadata: &MetadataTable) -> Vec<CityRef> {
    let mut seen = HashSet::new();
    metadata
        .values()
        .flat_map(|record| {
            record
                .city_names()
                .iter()
                .map(|name| CityRef::new(name.as_str(), record.name()))
        })
        .filter(|city| seen.insert(city.key()))
        .collect()
}

/// Previously generated city file as written by this tool or by older
/// generators, which stored a bare array of features
#[derive(Deserialize)]
#[serde(untagged)]
enum CityFile {
    Collection(FeatureCollection),
    Features(Vec<Feature>),
}

/// Coordinates from an earlier run, keyed by `CityRef::key`
#[derive(Debug, Clone, Default)]
pub struct CityCache {
    coordinates: HashMap<String, CityCoordinate>,
}

impl CityCache {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the cache from an earlier output file
    ///
    /// A missing, unreadable or unparsable file yields an empty cache.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                if path.exists() {
                    log::warn!("Ignoring unreadable city cache {}: {}", path.display(), e);
                } else {
                    log::debug!("No city cache at {}", path.display());
                }
                return Self::empty();
            }
        };

        match Self::from_json(&contents) {
            Ok(cache) => {
                log::debug!("Loaded {} cached cities from {}", cache.len(), path.display());
                cache
            }
            Err(e) => {
                log::warn!("Ignoring unparsable city cache {}: {}", path.display(), e);
                Self::empty()
            }
        }
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let features = match serde_json::from_str(contents)? {
            CityFile::Collection(collection) => collection.features,
            CityFile::Features(features) => features,
        };
        Ok(Self::from_features(&features))
    }

    /// Index point features by name and country; anything else is skipped
    pub fn from_features(features: &[Feature]) -> Self {
        let coordinates = features
            .iter()
            .filter_map(|feature| {
                let name = feature.property_str("name")?;
                let country = feature.property_str("country")?;
                let coordinate = CityCoordinate::from_position(feature.geometry.get("coordinates")?)?;
                Some((CityRef::new(name, country).key(), coordinate))
            })
            .collect();
        Self { coordinates }
    }

    pub fn get(&self, city: &CityRef) -> Option<CityCoordinate> {
        self.coordinates.get(&city.key()).copied()
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Split cities into those already resolved by the cache and those still to look up
    pub fn partition(&self, cities: Vec<CityRef>) -> (Vec<ResolvedCity>, Vec<CityRef>) {
        let mut resolved = Vec::new();
        let mut pending = Vec::new();
        for city in cities {
            match self.get(&city) {
                Some(coordinate) => resolved.push(ResolvedCity::new(city, coordinate)),
                None => pending.push(city),
            }
        }
        (resolved, pending)
    }
}

/// Look up cities one at a time, each request finishing before the next starts
///
/// The first failure stops the loop; nothing resolved so far is returned.
pub fn resolve_sequential<G, F>(
    pending: Vec<CityRef>,
    geocoder: &mut G,
    mut on_lookup: F,
) -> Result<Vec<ResolvedCity>, GeocodeError>
where
    G: Geocoder + ?Sized,
    F: FnMut(usize, usize, &CityRef),
{
    let total = pending.len();
    let mut resolved = Vec::with_capacity(total);

    for (i, city) in pending.into_iter().enumerate() {
        on_lookup(i, total, &city);
        match geocoder.geocode(&city) {
            Ok(coordinate) => {
                log::debug!(
                    "Resolved {} -> ({:.4}, {:.4})",
                    city.query(),
                    coordinate.lon,
                    coordinate.lat
                );
                resolved.push(ResolvedCity::new(city, coordinate));
            }
            Err(e) => {
                if let GeocodeError::NotFound { query, raw } = &e {
                    log::error!("Not found for {}, response: {}", query, raw);
                }
                return Err(e);
            }
        }
    }

    Ok(resolved)
}

pub fn build_collection(cities: &[ResolvedCity]) -> FeatureCollection {
    FeatureCollection::new(cities.iter().map(ResolvedCity::to_feature).collect())
}

/// All cities of the metadata table with coordinates: cache hits first, then fresh lookups
pub fn resolve_cities<G, F>(
    metadata: &MetadataTable,
    cache: &CityCache,
    geocoder: &mut G,
    on_lookup: F,
) -> Result<(Vec<ResolvedCity>, usize), GeocodeError>
where
    G: Geocoder + ?Sized,
    F: FnMut(usize, usize, &CityRef),
{
    let (mut cities, pending) = cache.partition(flatten_cities(metadata));
    let cached = cities.len();
    log::info!("{} cities cached, {} to geocode", cached, pending.len());

    cities.extend(resolve_sequential(pending, geocoder, on_lookup)?);
    Ok((cities, cached))
}

/// Resolve every city and write the city layer
///
/// The earlier contents of `output` serve as the cache. The file is only
/// written once every city has a coordinate.
pub fn run_cities<G, F>(
    metadata: &MetadataTable,
    output: &Path,
    geocoder: &mut G,
    on_lookup: F,
) -> Result<CitiesReport>
where
    G: Geocoder + ?Sized,
    F: FnMut(usize, usize, &CityRef),
{
    let cache = CityCache::load(output);
    let (cities, cached) = resolve_cities(metadata, &cache, geocoder, on_lookup)
        .context("Failed to geocode cities")?;

    write_json(output, &build_collection(&cities))?;
    log::info!("{} written with {} cities", output.display(), cities.len());

    Ok(CitiesReport {
        cached,
        resolved: cities.len() - cached,
        output: output.to_path_buf(),
    })
}
