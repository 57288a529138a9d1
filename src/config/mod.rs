use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::api::nominatim::{NOMINATIM_URL, USER_AGENT};
use crate::geometry::{MAX_DECIMALS, Precision};

fn default_data() -> PathBuf {
    PathBuf::from("data.json")
}
fn default_boundaries() -> PathBuf {
    PathBuf::from("vendor/countries.geojson")
}
fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}
fn default_countries_file() -> String {
    "countries.geojson".to_string()
}
fn default_cities_file() -> String {
    "cities.geojson".to_string()
}
fn default_coordinates() -> u32 {
    7
}
fn default_extras() -> u32 {
    2
}

fn decimals<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = u32::deserialize(deserializer)?;
    if value > MAX_DECIMALS {
        return Err(serde::de::Error::custom(format!(
            "precision of {} decimals is above the maximum of {}",
            value, MAX_DECIMALS
        )));
    }
    Ok(value)
}

#[derive(Debug, Deserialize, Clone)]
pub struct FileConfig {
    #[serde(default = "default_data")]
    pub data: PathBuf,
    #[serde(default = "default_boundaries")]
    pub boundaries: PathBuf,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default = "default_countries_file")]
    pub countries_file: String,
    #[serde(default = "default_cities_file")]
    pub cities_file: String,
    #[serde(default)]
    pub verbose: bool,
    /// Ramer-Douglas-Peucker tolerance in degrees for country outlines, 0 = off
    #[serde(default)]
    pub simplify_tolerance: f64,
    #[serde(default)]
    pub precision: PrecisionConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            data: default_data(),
            boundaries: default_boundaries(),
            out_dir: default_out_dir(),
            countries_file: default_countries_file(),
            cities_file: default_cities_file(),
            verbose: false,
            simplify_tolerance: 0.0,
            precision: PrecisionConfig::default(),
            geocoder: GeocoderConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PrecisionConfig {
    /// Decimals kept for longitude and latitude
    #[serde(default = "default_coordinates", deserialize_with = "decimals")]
    pub coordinates: u32,
    /// Decimals kept for elevation and any other extra component
    #[serde(default = "default_extras", deserialize_with = "decimals")]
    pub extras: u32,
    #[serde(default)]
    pub lenient_geometry: bool,
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self {
            coordinates: default_coordinates(),
            extras: default_extras(),
            lenient_geometry: false,
        }
    }
}

impl PrecisionConfig {
    pub fn to_precision(&self) -> Precision {
        Precision::new(self.coordinates, self.extras).with_lenient(self.lenient_geometry)
    }
}

fn default_geocoder_url() -> String {
    NOMINATIM_URL.to_string()
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

pub fn default_accepted_types() -> Vec<String> {
    vec![
        "city".to_string(),
        "town".to_string(),
        "administrative".to_string(),
    ]
}

fn default_request_interval_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocoderConfig {
    #[serde(default = "default_geocoder_url")]
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accepted_types")]
    pub accepted_types: Vec<String>,
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: default_geocoder_url(),
            user_agent: default_user_agent(),
            accepted_types: default_accepted_types(),
            request_interval_ms: default_request_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FileConfig {
    /// First parsable config file from the standard search locations
    pub fn load() -> Option<Self> {
        let config_paths = get_config_paths();

        for path in config_paths {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }

    /// Config from an explicit path; unlike `load`, a missing or broken file is an error
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Config file not found: {:?}", path);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn countries_output(&self) -> PathBuf {
        self.out_dir.join(&self.countries_file)
    }

    /// Output of the city layer, also read back as the coordinate cache
    pub fn cities_output(&self) -> PathBuf {
        self.out_dir.join(&self.cities_file)
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("travelmap.toml"));
    paths.push(PathBuf::from(".travelmap.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("travelmap").join("config.toml"));
        paths.push(config_dir.join("travelmap.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".travelmap.toml"));
        paths.push(home.join(".config").join("travelmap").join("config.toml"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();

        assert_eq!(config.data, PathBuf::from("data.json"));
        assert_eq!(config.countries_output(), PathBuf::from("dist/countries.geojson"));
        assert_eq!(config.cities_output(), PathBuf::from("dist/cities.geojson"));
        assert_eq!(config.precision.coordinates, 7);
        assert_eq!(config.precision.extras, 2);
        assert_eq!(config.geocoder.url, NOMINATIM_URL);
        assert_eq!(config.geocoder.accepted_types, default_accepted_types());
        assert_eq!(config.geocoder.request_interval_ms, 1000);
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            out_dir = "public"
            simplify_tolerance = 0.01

            [precision]
            coordinates = 5
            lenient_geometry = true

            [geocoder]
            user_agent = "my travels generator"
            accepted_types = ["city", "village"]
        "#;
        let config: FileConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.countries_output(), PathBuf::from("public/countries.geojson"));
        assert_eq!(config.simplify_tolerance, 0.01);
        assert_eq!(
            config.precision.to_precision(),
            Precision::new(5, 2).with_lenient(true)
        );
        assert_eq!(config.geocoder.user_agent, "my travels generator");
        assert_eq!(config.geocoder.accepted_types, vec!["city", "village"]);
        assert_eq!(config.geocoder.timeout_secs, 30);
    }

    #[test]
    fn test_from_path_errors() {
        let dir = tempdir().unwrap();
        assert!(FileConfig::from_path(&dir.path().join("missing.toml")).is_err());

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "out_dir = [").unwrap();
        assert!(FileConfig::from_path(&broken).is_err());
    }

    #[test]
    fn test_precision_above_maximum_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("travelmap.toml");
        fs::write(&path, "[precision]\ncoordinates = 400\n").unwrap();

        let err = FileConfig::from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("above the maximum of 15"));

        let config: FileConfig = toml::from_str("[precision]\nextras = 15").unwrap();
        assert_eq!(config.precision.extras, 15);
        assert!(toml::from_str::<FileConfig>("[precision]\nextras = 16").is_err());
    }
}
