//! Colour scale and legend for the country layer.
//!
//! Countries are coloured by how recently they were last visited. Birth and
//! lived-in countries, and countries without dated visits, get fixed colours
//! outside the recency scale.

use crate::domain::{CountryRecord, MetadataTable};

pub const PALETTE: [&str; 9] = [
    "#800026", "#BD0026", "#E31A1C", "#FC4E2A", "#FD8D3C", "#FEB24C", "#FED976", "#FFEDA0",
    "#FFFFCC",
];
pub const BIRTH_COLOR: &str = PALETTE[0];
pub const LIVED_COLOR: &str = PALETTE[1];
pub const UNDATED_COLOR: &str = PALETTE[8];

/// Most recent first
fn recency_scale() -> &'static [&'static str] {
    &PALETTE[2..8]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    /// (earliest first visit, latest last visit) across all countries
    years: Option<(i32, i32)>,
}

impl ColorScale {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CountryRecord>) -> Self {
        let records: Vec<&CountryRecord> = records.into_iter().collect();
        let max = records.iter().filter_map(|r| r.last_year()).max();
        let min = records.iter().filter_map(|r| r.first_year()).min();
        let years = match (min, max) {
            (Some(min), Some(max)) => Some((min.min(max), max)),
            _ => None,
        };
        Self { years }
    }

    pub fn color_for(&self, country: &CountryRecord) -> &'static str {
        if country.is_birth() {
            return BIRTH_COLOR;
        }
        if country.has_lived() {
            return LIVED_COLOR;
        }
        let (Some(last), Some((min, max))) = (country.last_year(), self.years) else {
            return UNDATED_COLOR;
        };

        let scale = recency_scale();
        let n = (scale.len() - 1) as f64;
        if max == min {
            return scale[0];
        }
        let step = (n / f64::from(max - min) * f64::from(last - min)).ceil();
        let index = (n - step).clamp(0.0, n) as usize;
        scale[index]
    }
}

/// Short description shown next to a country: "born", "lived, 1990-2015", "visited, 2016, 2019"
pub fn status(country: &CountryRecord) -> String {
    let mut parts = Vec::new();
    if country.is_birth() {
        parts.push("born".to_string());
    }
    match country.lived() {
        Some((from, to)) => parts.push(format!("lived, {}-{}", from, to)),
        None => {
            parts.push("visited".to_string());
            let years = country.years();
            if !years.is_empty() {
                let years: Vec<String> = years.iter().map(i32::to_string).collect();
                parts.push(years.join(", "));
            }
        }
    }
    parts.join(", ")
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub code: String,
    pub name: String,
    pub color: &'static str,
    pub status: String,
    last_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Legend {
    pub born: Option<LegendEntry>,
    pub lived: Vec<LegendEntry>,
    pub visited: Vec<LegendEntry>,
}

impl Legend {
    pub fn build(metadata: &MetadataTable) -> Self {
        let scale = ColorScale::from_records(metadata.values());
        let entry = |code: &String, country: &CountryRecord| LegendEntry {
            code: code.clone(),
            name: country.name().to_string(),
            color: scale.color_for(country),
            status: status(country),
            last_year: country.last_year(),
        };

        let mut legend = Legend::default();
        for (code, country) in metadata {
            if country.is_birth() {
                if legend.born.is_none() {
                    legend.born = Some(entry(code, country));
                }
            } else if country.has_lived() {
                legend.lived.push(entry(code, country));
            } else {
                legend.visited.push(entry(code, country));
            }
        }

        legend.lived.sort_by(by_recency);
        legend.visited.sort_by(by_recency);
        legend
    }

    pub fn groups(&self) -> [(&'static str, Vec<&LegendEntry>); 3] {
        [
            ("Born", self.born.iter().collect()),
            ("Lived", self.lived.iter().collect()),
            ("Visited", self.visited.iter().collect()),
        ]
    }
}

/// Latest visit first, undated last, then by name
fn by_recency(a: &LegendEntry, b: &LegendEntry) -> std::cmp::Ordering {
    b.last_year
        .cmp(&a.last_year)
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> MetadataTable {
        serde_json::from_value(json!({
            "RU": {"name": "Russia", "birth": true, "lived": [1990, 2015]},
            "DE": {"name": "Germany", "lived": [2015, 2020], "years": [2013]},
            "FR": {"name": "France", "years": [2010, 2020]},
            "IT": {"name": "Italy", "years": [2015]},
            "ES": {"name": "Spain", "years": [2010]},
            "PT": {"name": "Portugal", "years": [2020]},
            "IS": {"name": "Iceland"}
        }))
        .unwrap()
    }

    #[test]
    fn test_year_range() {
        let scale = ColorScale::from_records(metadata().values());
        assert_eq!(scale.years, Some((2010, 2020)));
    }

    #[test]
    fn test_sentinel_colors() {
        let metadata = metadata();
        let scale = ColorScale::from_records(metadata.values());

        assert_eq!(scale.color_for(&metadata["RU"]), BIRTH_COLOR);
        assert_eq!(scale.color_for(&metadata["DE"]), LIVED_COLOR);
        assert_eq!(scale.color_for(&metadata["IS"]), UNDATED_COLOR);
    }

    #[test]
    fn test_recency_colors() {
        let metadata = metadata();
        let scale = ColorScale::from_records(metadata.values());

        // n = 5: latest year maps to the darkest scale colour, earliest to the lightest
        assert_eq!(scale.color_for(&metadata["FR"]), "#E31A1C");
        assert_eq!(scale.color_for(&metadata["PT"]), "#E31A1C");
        assert_eq!(scale.color_for(&metadata["ES"]), "#FFEDA0");
        // 5 - ceil(5 / 10 * 5) = 2
        assert_eq!(scale.color_for(&metadata["IT"]), "#FD8D3C");
    }

    #[test]
    fn test_single_year_uses_most_recent_color() {
        let metadata: MetadataTable = serde_json::from_value(json!({
            "FR": {"name": "France", "years": [2019]},
            "IT": {"name": "Italy", "years": [2019]}
        }))
        .unwrap();
        let scale = ColorScale::from_records(metadata.values());
        assert_eq!(scale.color_for(&metadata["FR"]), "#E31A1C");
    }

    #[test]
    fn test_status() {
        let metadata = metadata();
        assert_eq!(status(&metadata["RU"]), "born, lived, 1990-2015");
        assert_eq!(status(&metadata["DE"]), "lived, 2015-2020");
        assert_eq!(status(&metadata["FR"]), "visited, 2010, 2020");
        assert_eq!(status(&metadata["IS"]), "visited");
    }

    #[test]
    fn test_legend_groups() {
        let legend = Legend::build(&metadata());

        assert_eq!(legend.born.as_ref().map(|e| e.code.as_str()), Some("RU"));
        let lived: Vec<&str> = legend.lived.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(lived, vec!["Germany"]);
        let visited: Vec<&str> = legend.visited.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(visited, vec!["France", "Portugal", "Italy", "Spain", "Iceland"]);
    }
}
