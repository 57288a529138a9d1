use serde_json::{Value, json};

use super::geojson::Feature;

/// A city to place on the map, identified by its name and country display name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CityRef {
    pub name: String,
    pub country: String,
}

impl CityRef {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
        }
    }

    /// Cache key shared with previously generated files: `{name}_{country}`
    pub fn key(&self) -> String {
        format!("{}_{}", self.name, self.country)
    }

    /// Free-text geocoder query: `{name}, {country}`
    pub fn query(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

/// A resolved position in GeoJSON axis order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CityCoordinate {
    pub lon: f64,
    pub lat: f64,
}

impl CityCoordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Read a `[lon, lat]` position whose components may be numbers or numeric strings
    pub fn from_position(value: &Value) -> Option<Self> {
        let position = value.as_array()?;
        if position.len() < 2 {
            return None;
        }
        let lon = coerce_f64(&position[0])?;
        let lat = coerce_f64(&position[1])?;
        Some(Self { lon, lat })
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// A city with its coordinate attached
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCity {
    pub city: CityRef,
    pub coordinate: CityCoordinate,
}

impl ResolvedCity {
    pub fn new(city: CityRef, coordinate: CityCoordinate) -> Self {
        Self { city, coordinate }
    }

    pub fn to_feature(&self) -> Feature {
        let geometry = json!({
            "type": "Point",
            "coordinates": [self.coordinate.lon, self.coordinate.lat],
        });
        let mut properties = serde_json::Map::new();
        properties.insert("name".to_string(), Value::String(self.city.name.clone()));
        properties.insert(
            "country".to_string(),
            Value::String(self.city.country.clone()),
        );
        Feature::new(geometry, properties)
    }
}
