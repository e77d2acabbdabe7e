//! `region_topology` — Regionskarten aus Paletten-Rastern.
//!
//! Wandelt die Regions-Layer einer Welt (Farbraster + Regions-Katalog)
//! in eine gemeinsame Kanten-Topologie um:
//! - Label-Raster aus exakten Farben
//! - Vektorisierung der Label-Flächen zu Polygonen
//! - Zuordnung zu benannten Regionen über die Palette
//! - Normalisierung aller Layer auf das Einheitsquadrat
//! - TopoJSON-Topologie mit gemeinsamen Arcs über alle Layer
//!
//! # Beispiel
//! ```no_run
//! use region_topology::{build_world_regions, LayerSource, RegionDefinition, DEFAULT_TOLERANCE};
//!
//! let image = image::open("mining.png")?.to_rgb8();
//! let layer = LayerSource {
//!     name: "mining".into(),
//!     image,
//!     regions: vec![RegionDefinition::new("MiningIron", [200, 10, 10])],
//!     retain_unmatched: true,
//! };
//! let topology = build_world_regions(vec![layer], DEFAULT_TOLERANCE)?;
//! println!("{} Arcs", topology.arcs.len());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod geometry;
pub mod labels;
pub mod normalize;
pub mod palette;
pub mod resolve;
pub mod spatial;
pub mod topology;
pub mod vectorize;

use anyhow::{Context, Result};
use image::RgbImage;
use rayon::prelude::*;

pub use geometry::{Geometry, Polygon, Ring};
pub use labels::{LabelColors, LabelRaster};
pub use normalize::{NormalizedWorld, WorldBounds, normalize_world};
pub use palette::{PaletteTable, RegionDefinition, Rgb, color_hex, normalize_names};
pub use resolve::{RegionLayer, ResolvedFeature, resolve_features};
pub use topology::{
    ArcRef, DEFAULT_TOLERANCE, FeatureProperties, GeometryCollection, TopoGeometry, Topology,
    WorldTopology, build_topology,
};
pub use vectorize::{RawFeature, vectorize};

/// Eingabe eines Regions-Layers.
#[derive(Debug, Clone)]
pub struct LayerSource {
    /// Layer-Name, wird zum Objekt-Namen in der Topologie
    pub name: String,
    /// Farbraster des Layers
    pub image: RgbImage,
    /// Regions-Katalog in Dokument-Reihenfolge
    pub regions: Vec<RegionDefinition>,
    /// Flächen ohne Katalog-Farbe behalten
    pub retain_unmatched: bool,
}

/// Label-Raster, Vektorisierung und Zuordnung für einen Layer.
pub fn extract_layer(source: &LayerSource) -> Result<RegionLayer> {
    let palette = PaletteTable::from_definitions(&source.regions);
    let raster = LabelRaster::from_image(&source.image)
        .with_context(|| format!("Layer '{}': Label-Raster", source.name))?;
    log::info!(
        "Layer '{}': {}x{} Pixel, {} Farben, {} Katalog-Regionen",
        source.name,
        raster.width(),
        raster.height(),
        raster.colors().len(),
        palette.len()
    );

    let raw = vectorize(&raster);
    let features = resolve_features(raw, raster.colors(), &palette, source.retain_unmatched)
        .with_context(|| format!("Layer '{}': Zuordnung", source.name))?;

    log::info!("Layer '{}': {} Features", source.name, features.len());
    Ok(RegionLayer {
        name: source.name.clone(),
        features,
    })
}

/// Kompletter Regions-Ablauf einer Welt.
///
/// Die Layer laufen parallel bis zur Zuordnung; Normalisierung und
/// Topologie warten auf alle Layer, weil beide Layer-übergreifend arbeiten.
pub fn build_world_regions(layers: Vec<LayerSource>, tolerance: f64) -> Result<WorldTopology> {
    let resolved = layers
        .par_iter()
        .map(extract_layer)
        .collect::<Result<Vec<_>>>()?;

    let world = normalize_world(resolved)?;
    build_topology(&world, tolerance)
}
