use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Hand-authored travel metadata, keyed by ISO-3166-1 alpha-2 code
pub type MetadataTable = BTreeMap<String, CountryRecord>;

/// One entry of the metadata table
///
/// The entry is kept exactly as written so the polygon properties carry every
/// field through unchanged, `null`s and unknown fields included. The known
/// fields are read from it once for city flattening and the legend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct CountryRecord {
    name: String,
    years: Option<Vec<i32>>,
    birth: Option<bool>,
    lived: Option<(i32, i32)>,
    cities: Option<Vec<String>>,
    fields: Map<String, Value>,
}

/// Typed view of the known fields; years may be written as any JSON number
#[derive(Deserialize)]
struct KnownFields {
    name: String,
    #[serde(default)]
    years: Option<Vec<f64>>,
    #[serde(default)]
    birth: Option<bool>,
    #[serde(default)]
    lived: Option<(f64, f64)>,
    #[serde(default)]
    cities: Option<Vec<String>>,
}

fn year(value: f64) -> i32 {
    value.round() as i32
}

impl TryFrom<Map<String, Value>> for CountryRecord {
    type Error = serde_json::Error;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let known: KnownFields = serde_json::from_value(Value::Object(fields.clone()))?;
        Ok(Self {
            name: known.name,
            years: known.years.map(|years| years.into_iter().map(year).collect()),
            birth: known.birth,
            lived: known.lived.map(|(from, to)| (year(from), year(to))),
            cities: known.cities,
            fields,
        })
    }
}

impl From<CountryRecord> for Map<String, Value> {
    fn from(record: CountryRecord) -> Self {
        record.fields
    }
}

impl CountryRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn years(&self) -> &[i32] {
        self.years.as_deref().unwrap_or(&[])
    }

    pub fn lived(&self) -> Option<(i32, i32)> {
        self.lived
    }

    pub fn is_birth(&self) -> bool {
        self.birth.unwrap_or(false)
    }

    pub fn has_lived(&self) -> bool {
        self.lived.is_some()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.years().first().copied()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.years().last().copied()
    }

    pub fn city_names(&self) -> &[String] {
        self.cities.as_deref().unwrap_or(&[])
    }

    /// Properties for the country polygon: every field except `cities`, plus `code`
    pub fn merged_properties(&self, code: &str) -> Map<String, Value> {
        let mut properties = self.fields.clone();
        properties.remove("cities");
        properties.insert("code".to_string(), Value::String(code.to_string()));
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_record_with_optional_fields() {
        let json = r#"{
            "RU": {"name": "Russia", "birth": true, "lived": [1990, 2015], "cities": ["Moscow"]},
            "FR": {"name": "France", "years": [2016, 2019]},
            "IS": {"name": "Iceland"}
        }"#;
        let table: MetadataTable = serde_json::from_str(json).unwrap();

        assert_eq!(table.len(), 3);
        assert!(table["RU"].is_birth());
        assert_eq!(table["RU"].lived(), Some((1990, 2015)));
        assert_eq!(table["RU"].city_names(), ["Moscow"]);
        assert_eq!(table["FR"].first_year(), Some(2016));
        assert_eq!(table["FR"].last_year(), Some(2019));
        assert!(table["IS"].city_names().is_empty());
        assert_eq!(table["IS"].last_year(), None);
    }

    #[test]
    fn test_merged_properties_drop_cities_and_add_code() {
        let record: CountryRecord = serde_json::from_value(json!({
            "name": "France",
            "years": [2016],
            "cities": ["Paris", "Lyon"],
            "note": "honeymoon"
        }))
        .unwrap();

        let props = record.merged_properties("FR");

        assert_eq!(
            Value::Object(props),
            json!({"name": "France", "years": [2016], "note": "honeymoon", "code": "FR"})
        );
    }

    #[test]
    fn test_merged_properties_keep_fields_as_written() {
        let table: MetadataTable = serde_json::from_value(json!({
            "FR": {"name": "France", "years": null, "birth": null, "cities": null},
            "DE": {"name": "Germany", "years": [2016.0, 2019], "lived": [2001.0, 2003.0]}
        }))
        .unwrap();

        assert_eq!(
            Value::Object(table["FR"].merged_properties("FR")),
            json!({"name": "France", "years": null, "birth": null, "code": "FR"})
        );
        assert_eq!(table["FR"].last_year(), None);
        assert!(table["FR"].city_names().is_empty());

        assert_eq!(
            Value::Object(table["DE"].merged_properties("DE")),
            json!({"name": "Germany", "years": [2016.0, 2019], "lived": [2001.0, 2003.0], "code": "DE"})
        );
        assert_eq!(table["DE"].years(), [2016, 2019]);
        assert_eq!(table["DE"].lived(), Some((2001, 2003)));
    }

    #[test]
    fn test_record_serializes_as_written() {
        let entry = json!({"name": "France", "years": [2016.0], "cities": null, "note": 1});
        let record: CountryRecord = serde_json::from_value(entry.clone()).unwrap();

        assert_eq!(serde_json::to_value(&record).unwrap(), entry);
    }
}
