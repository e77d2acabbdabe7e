//! Stationeers Map Data.
//!
//! Erzeugt aus den Welt-Dateien von Stationeers die Kartendaten für das
//! Web-Frontend: Regionen als TopoJSON (mining, poi, names), Startpunkte
//! und eine Terrain-Vorschau.

pub mod options;
pub mod output;
pub mod runner;
pub mod terrain;
pub mod world;
pub mod xml;

pub use options::{BuilderOptions, WorldEntry};
pub use output::WorldOutput;
pub use runner::{report_outcomes, run_worlds, WorldOutcome};
pub use world::{build_world, build_world_output, LayerKind, WorldReport, WorldSettings};
pub use xml::{parse_world_document, WorldDocument};
