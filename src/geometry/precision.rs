use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PrecisionError {
    #[error("unknown GeoJSON type: {0}")]
    UnknownType(String),
    #[error("GeoJSON object has no type member")]
    MissingType,
    #[error("invalid coordinates in {0}")]
    InvalidCoordinates(String),
}

/// Rounds GeoJSON coordinates to a fixed number of decimals
///
/// The first two components of a position (lon, lat) use `coordinates`
/// decimals; any further component (elevation, measure) uses `extras`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Precision {
    pub coordinates: u32,
    pub extras: u32,
    /// Replace objects of unknown type with `{}` instead of failing
    pub lenient: bool,
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            coordinates: 7,
            extras: 2,
            lenient: false,
        }
    }
}

/// Most decimals a coordinate can be rounded to
pub const MAX_DECIMALS: u32 = 15;

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    (value * factor).round() / factor
}

impl Precision {
    pub fn new(coordinates: u32, extras: u32) -> Self {
        Self {
            coordinates,
            extras,
            lenient: false,
        }
    }

    pub fn with_lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Return a copy of any GeoJSON object with every position rounded
    ///
    /// Accepts geometries, GeometryCollections (nested to any depth),
    /// Features and FeatureCollections.
    pub fn round(&self, value: &Value) -> Result<Value, PrecisionError> {
        let Some(object) = value.as_object() else {
            return self.unknown("non-object".to_string());
        };
        let Some(kind) = object.get("type").and_then(Value::as_str) else {
            if self.lenient {
                log::warn!("GeoJSON object without type replaced by an empty object");
                return Ok(Value::Object(Map::new()));
            }
            return Err(PrecisionError::MissingType);
        };

        let depth = match kind {
            "Point" => 0,
            "MultiPoint" | "LineString" => 1,
            "MultiLineString" | "Polygon" => 2,
            "MultiPolygon" => 3,
            "GeometryCollection" => {
                return self.round_members(object, "geometries", kind, |v| self.round(v));
            }
            "Feature" => {
                let mut out = object.clone();
                if let Some(geometry) = object.get("geometry")
                    && !geometry.is_null()
                {
                    out.insert("geometry".to_string(), self.round(geometry)?);
                }
                return Ok(Value::Object(out));
            }
            "FeatureCollection" => {
                return self.round_members(object, "features", kind, |v| self.round(v));
            }
            other => return self.unknown(other.to_string()),
        };

        let coordinates = object
            .get("coordinates")
            .ok_or_else(|| PrecisionError::InvalidCoordinates(kind.to_string()))?;
        let mut out = object.clone();
        out.insert(
            "coordinates".to_string(),
            self.round_nested(coordinates, depth, kind)?,
        );
        Ok(Value::Object(out))
    }

    fn round_members<F>(
        &self,
        object: &Map<String, Value>,
        member: &str,
        kind: &str,
        round: F,
    ) -> Result<Value, PrecisionError>
    where
        F: Fn(&Value) -> Result<Value, PrecisionError>,
    {
        let items = object
            .get(member)
            .and_then(Value::as_array)
            .ok_or_else(|| PrecisionError::InvalidCoordinates(kind.to_string()))?;
        let rounded = items.iter().map(round).collect::<Result<Vec<_>, _>>()?;
        let mut out = object.clone();
        out.insert(member.to_string(), Value::Array(rounded));
        Ok(Value::Object(out))
    }

    fn round_nested(&self, value: &Value, depth: u8, kind: &str) -> Result<Value, PrecisionError> {
        if depth == 0 {
            return self.round_position(value, kind);
        }
        let items = value
            .as_array()
            .ok_or_else(|| PrecisionError::InvalidCoordinates(kind.to_string()))?;
        items
            .iter()
            .map(|item| self.round_nested(item, depth - 1, kind))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn round_position(&self, value: &Value, kind: &str) -> Result<Value, PrecisionError> {
        let invalid = || PrecisionError::InvalidCoordinates(kind.to_string());
        let components = value.as_array().ok_or_else(invalid)?;
        if components.len() < 2 {
            return Err(invalid());
        }

        components
            .iter()
            .enumerate()
            .map(|(i, component)| {
                let n = component.as_f64().ok_or_else(invalid)?;
                let decimals = if i < 2 { self.coordinates } else { self.extras };
                Number::from_f64(round_to(n, decimals))
                    .map(Value::Number)
                    .ok_or_else(invalid)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn unknown(&self, kind: String) -> Result<Value, PrecisionError> {
        if self.lenient {
            log::warn!("Unsupported GeoJSON type {} replaced by an empty object", kind);
            Ok(Value::Object(Map::new()))
        } else {
            Err(PrecisionError::UnknownType(kind))
        }
    }
}
