//! travelmap - Generate country and city GeoJSON layers for a personal travel map

pub mod api;
pub mod config;
pub mod domain;
pub mod geometry;
pub mod layers;
pub mod legend;
