//! XML-Import für Stationeers-Weltdateien.

pub mod world;

pub use world::{parse_world_document, RegionSet, StartLocation, WorldDocument};
