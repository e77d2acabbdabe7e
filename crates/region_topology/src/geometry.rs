//! Polygon-Typen für Regionen.
//!
//! Ringe werden offen gespeichert (ohne wiederholten Schlusspunkt).
//! Im Raster-Koordinatensystem (y nach unten) haben Außenringe eine
//! positive, Löcher eine negative Shoelace-Fläche.

use glam::DVec2;

/// Offener Ring, der letzte Punkt schließt implizit zum ersten.
pub type Ring = Vec<DVec2>;

/// Polygon mit Außenring und optionalen Löchern.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

impl Polygon {
    pub fn new(exterior: Ring) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    /// Alle Ringe, Außenring zuerst.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    /// Fläche (Außenring minus Löcher), immer >= 0 für gültige Polygone.
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| signed_area(h).abs()).sum();
        signed_area(&self.exterior).abs() - holes
    }

    fn map_points(&self, f: &impl Fn(DVec2) -> DVec2) -> Self {
        Self {
            exterior: self.exterior.iter().map(|&p| f(p)).collect(),
            holes: self
                .holes
                .iter()
                .map(|h| h.iter().map(|&p| f(p)).collect())
                .collect(),
        }
    }
}

/// Geometrie eines Features.
///
/// Ein leeres `MultiPolygon` steht für ein Label, das nicht
/// vektorisiert werden konnte.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    /// `Polygon` für genau ein Polygon, sonst `MultiPolygon`.
    pub fn from_polygons(mut polygons: Vec<Polygon>) -> Self {
        if polygons.len() == 1 {
            Geometry::Polygon(polygons.remove(0))
        } else {
            Geometry::MultiPolygon(polygons)
        }
    }

    pub fn empty() -> Self {
        Geometry::MultiPolygon(Vec::new())
    }

    pub fn polygons(&self) -> &[Polygon] {
        match self {
            Geometry::Polygon(polygon) => std::slice::from_ref(polygon),
            Geometry::MultiPolygon(polygons) => polygons,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Geometry::MultiPolygon(_))
    }

    pub fn is_empty(&self) -> bool {
        self.polygons().is_empty()
    }

    pub fn area(&self) -> f64 {
        self.polygons().iter().map(Polygon::area).sum()
    }

    /// Alle Eckpunkte aller Ringe.
    pub fn vertices(&self) -> impl Iterator<Item = DVec2> + '_ {
        self.polygons()
            .iter()
            .flat_map(|polygon| polygon.rings())
            .flat_map(|ring| ring.iter().copied())
    }

    /// Transformiert jeden Eckpunkt.
    pub fn map_points(&self, f: impl Fn(DVec2) -> DVec2) -> Self {
        match self {
            Geometry::Polygon(polygon) => Geometry::Polygon(polygon.map_points(&f)),
            Geometry::MultiPolygon(polygons) => {
                Geometry::MultiPolygon(polygons.iter().map(|p| p.map_points(&f)).collect())
            }
        }
    }
}

/// Shoelace-Fläche eines offenen Rings (vorzeichenbehaftet).
pub fn signed_area(ring: &[DVec2]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}
