pub mod city;
pub mod country;
pub mod geojson;

pub use city::{CityCoordinate, CityRef, ResolvedCity};
pub use country::{CountryRecord, MetadataTable};
pub use geojson::{Feature, FeatureCollection};
