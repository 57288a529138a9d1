use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn feature_type() -> String {
    "Feature".to_string()
}

fn feature_collection_type() -> String {
    "FeatureCollection".to_string()
}

/// GeoJSON feature with an untyped geometry
///
/// Geometry stays a raw JSON value so boundary files pass through without a
/// lossy round trip; members other than type/geometry/properties are kept in
/// `foreign`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub type_: String,
    #[serde(default)]
    pub geometry: Value,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub foreign: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Value, properties: Map<String, Value>) -> Self {
        Self {
            type_: feature_type(),
            geometry,
            properties: Some(properties),
            foreign: Map::new(),
        }
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.as_ref()?.get(key)?.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_type")]
    pub type_: String,
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub foreign: Map<String, Value>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            type_: feature_collection_type(),
            features,
            foreign: Map::new(),
        }
    }
}
