//! Normalisierung aller Layer einer Welt auf das Einheitsquadrat.
//!
//! Die Bounding-Box wird immer über alle Layer gemeinsam berechnet,
//! sonst wären die Layer nach der Normalisierung gegeneinander verschoben.

use anyhow::{Result, bail, ensure};
use glam::DVec2;

use crate::resolve::RegionLayer;

/// Gemeinsame Bounding-Box aller Layer einer Welt (Raster-Koordinaten).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    /// Minimale X-Koordinate (links)
    pub min_x: f64,
    /// Maximale X-Koordinate (rechts)
    pub max_x: f64,
    /// Minimale Y-Koordinate (oben im Raster)
    pub min_y: f64,
    /// Maximale Y-Koordinate (unten im Raster)
    pub max_y: f64,
}

impl WorldBounds {
    /// Bounding-Box über beliebig viele Punkte.
    ///
    /// # Fehler
    /// Keine Punkte vorhanden.
    pub fn from_points(points: impl IntoIterator<Item = DVec2>) -> Result<Self> {
        let mut points = points.into_iter();
        let Some(first) = points.next() else {
            bail!("Welt ohne Geometrie: Bounding-Box nicht bestimmbar");
        };

        let mut bounds = Self {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        for p in points {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        Ok(bounds)
    }

    /// Bounding-Box über alle Eckpunkte aller Features aller Layer.
    pub fn from_layers(layers: &[RegionLayer]) -> Result<Self> {
        Self::from_points(
            layers
                .iter()
                .flat_map(|layer| layer.features.iter())
                .flat_map(|feature| feature.geometry.vertices()),
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Bildet einen Punkt auf `[0,1] x [0,1]` ab, Y invertiert.
    pub fn normalize(&self, p: DVec2) -> DVec2 {
        DVec2::new(
            (p.x - self.min_x) / self.width(),
            1.0 - (p.y - self.min_y) / self.height(),
        )
    }
}

/// Alle Layer einer Welt im Einheitsquadrat.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedWorld {
    /// Box, relativ zu der normalisiert wurde
    pub bounds: WorldBounds,
    pub layers: Vec<RegionLayer>,
}

/// Normalisiert alle Layer einer Welt mit einer gemeinsamen Box.
///
/// # Fehler
/// Keine Geometrie in allen Layern zusammen, oder degenerierte Ausdehnung
/// (Breite oder Höhe 0).
pub fn normalize_world(layers: Vec<RegionLayer>) -> Result<NormalizedWorld> {
    let bounds = WorldBounds::from_layers(&layers)?;
    ensure!(
        bounds.width() > 0.0 && bounds.height() > 0.0,
        "Degenerierte Welt-Ausdehnung: x {}..{}, y {}..{}",
        bounds.min_x,
        bounds.max_x,
        bounds.min_y,
        bounds.max_y
    );

    log::info!(
        "Welt-Box: x {}..{}, y {}..{} ({} Layer)",
        bounds.min_x,
        bounds.max_x,
        bounds.min_y,
        bounds.max_y,
        layers.len()
    );

    let layers = layers
        .into_iter()
        .map(|mut layer| {
            for feature in &mut layer.features {
                feature.geometry = feature.geometry.map_points(|p| bounds.normalize(p));
            }
            layer
        })
        .collect();

    Ok(NormalizedWorld { bounds, layers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, Polygon};
    use crate::resolve::ResolvedFeature;
    use approx::assert_relative_eq;

    fn layer(name: &str, rings: &[[(f64, f64); 4]]) -> RegionLayer {
        RegionLayer {
            name: name.to_string(),
            features: rings
                .iter()
                .enumerate()
                .map(|(i, ring)| ResolvedFeature {
                    label: i as u32 + 1,
                    name: Some(format!("R{}", i)),
                    color: [i as u8, 0, 0],
                    color_hex: String::new(),
                    geometry: Geometry::Polygon(Polygon::new(
                        ring.iter().map(|&(x, y)| DVec2::new(x, y)).collect(),
                    )),
                })
                .collect(),
        }
    }

    #[test]
    fn test_corners_map_with_flipped_y() {
        let bounds = WorldBounds {
            min_x: 0.0,
            max_x: 10.0,
            min_y: 0.0,
            max_y: 20.0,
        };
        assert_eq!(bounds.normalize(DVec2::new(10.0, 0.0)), DVec2::new(1.0, 1.0));
        assert_eq!(bounds.normalize(DVec2::new(0.0, 20.0)), DVec2::new(0.0, 0.0));
        let mid = bounds.normalize(DVec2::new(5.0, 5.0));
        assert_relative_eq!(mid.x, 0.5);
        assert_relative_eq!(mid.y, 0.75);
    }

    #[test]
    fn test_box_spans_all_layers() {
        let mining = layer("mining", &[[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]]);
        let names = layer("names", &[[(4.0, 4.0), (10.0, 4.0), (10.0, 20.0), (4.0, 20.0)]]);

        let world = normalize_world(vec![mining, names]).unwrap();
        assert_eq!(
            world.bounds,
            WorldBounds {
                min_x: 0.0,
                max_x: 10.0,
                min_y: 0.0,
                max_y: 20.0
            }
        );

        // Gemeinsame Ecke (4,4) liegt in beiden Layern auf demselben Punkt
        let shared_mining = world.layers[0].features[0].geometry.polygons()[0].exterior[2];
        let shared_names = world.layers[1].features[0].geometry.polygons()[0].exterior[0];
        assert_eq!(shared_mining, shared_names);
        assert_relative_eq!(shared_mining.x, 0.4);
        assert_relative_eq!(shared_mining.y, 0.8);
    }

    #[test]
    fn test_no_geometry_fails() {
        let err = normalize_world(vec![layer("poi", &[])]).expect_err("leere Welt");
        assert!(err.to_string().contains("ohne Geometrie"));
    }

    #[test]
    fn test_degenerate_extent_fails() {
        let flat = layer("poi", &[[(0.0, 3.0), (5.0, 3.0), (2.0, 3.0), (1.0, 3.0)]]);
        let err = normalize_world(vec![flat]).expect_err("flache Welt");
        assert!(err.to_string().contains("Degenerierte"));
    }
}
