//! Zuordnung vektorisierter Flächen zu benannten Regionen.

use anyhow::{Result, anyhow};

use crate::geometry::Geometry;
use crate::labels::LabelColors;
use crate::palette::{PaletteTable, Rgb, color_hex};
use crate::vectorize::RawFeature;

/// Feature mit Name und Farbe.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFeature {
    /// Label aus dem Label-Raster
    pub label: u32,
    /// Anzeigename (`None` für beibehaltene Flächen ohne Katalog-Eintrag)
    pub name: Option<String>,
    /// Originalfarbe des Labels
    pub color: Rgb,
    /// Farbe als `#rrggbb`
    pub color_hex: String,
    pub geometry: Geometry,
}

/// Alle Features eines Regions-Layers.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionLayer {
    /// Layer-Name (`mining`, `poi`, `names`)
    pub name: String,
    pub features: Vec<ResolvedFeature>,
}

/// Ordnet Features über ihre Label-Farbe dem Regions-Katalog zu.
///
/// Features ohne Katalog-Eintrag werden verworfen, außer `retain_unmatched`
/// ist gesetzt. Leere Geometrien werden immer verworfen.
/// Die Reihenfolge der Eingabe bleibt erhalten.
pub fn resolve_features(
    features: Vec<RawFeature>,
    colors: &LabelColors,
    palette: &PaletteTable,
    retain_unmatched: bool,
) -> Result<Vec<ResolvedFeature>> {
    let mut resolved = Vec::with_capacity(features.len());
    let mut dropped = 0usize;

    for feature in features {
        let color = colors
            .get(feature.label)
            .ok_or_else(|| anyhow!("Label {} hat keine Farbe", feature.label))?;

        if feature.geometry.is_empty() {
            log::warn!(
                "Label {} ({}) ohne Geometrie übersprungen",
                feature.label,
                color_hex(color)
            );
            continue;
        }

        let name = palette.name_for(color).map(str::to_string);
        if name.is_none() && !retain_unmatched {
            dropped += 1;
            continue;
        }

        resolved.push(ResolvedFeature {
            label: feature.label,
            name,
            color,
            color_hex: color_hex(color),
            geometry: feature.geometry,
        });
    }

    log::debug!(
        "{} Features zugeordnet, {} ohne Katalog-Eintrag verworfen",
        resolved.len(),
        dropped
    );

    Ok(resolved)
}
