//! Vektorisierung: Label-Raster → Polygone.
//!
//! Die Grenzen zwischen unterschiedlich gelabelten Pixeln werden auf dem
//! Eckpunkt-Gitter (`(W+1) x (H+1)`) als gerichtete Kanten erfasst. Jede
//! Kante hat ihr Pixel rechts (Bildschirm-Koordinaten, y nach unten).
//! Das Verfolgen der Kanten ergibt geschlossene Ringe: Außenringe mit
//! positiver, Löcher mit negativer Fläche.
//!
//! Zusammenhang ist 4er-Nachbarschaft. An Sattelpunkten (diagonal
//! berührende Pixel gleicher Farbe) wird immer rechts abgebogen, damit
//! diagonale Pixel getrennte Polygone bleiben.
//!
//! Kollineare Rasterpunkte werden entfernt. Ein Punkt bleibt erhalten, wenn
//! auf der Gegenseite der Kante das Label wechselt, damit gemeinsame Grenzen
//! auf beiden Seiten dieselben Eckpunkte haben.

use anyhow::{Result, bail};
use glam::DVec2;
use std::collections::{HashMap, HashSet};

use crate::geometry::{Geometry, Polygon, Ring, signed_area};
use crate::labels::LabelRaster;

/// Vektorisierte Fläche eines Labels (alle Zusammenhangskomponenten).
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    /// Label aus dem Label-Raster (>= 1)
    pub label: u32,
    /// Polygon oder MultiPolygon in Raster-Koordinaten
    pub geometry: Geometry,
}

// Richtungen auf dem Eckpunkt-Gitter, im Uhrzeigersinn (y nach unten)
const EAST: u8 = 0;
const SOUTH: u8 = 1;
const WEST: u8 = 2;
const NORTH: u8 = 3;

/// Schritt pro Richtung.
const STEPS: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
/// Start-Eckpunkt → Pixel rechts der Kante.
const OWNER_OFFSETS: [(i64, i64); 4] = [(0, 0), (-1, 0), (-1, -1), (0, -1)];
/// Pixel rechts → Pixel links der Kante.
const LEFT_OFFSETS: [(i64, i64); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

const UNASSIGNED: u32 = u32::MAX;

/// Vektorisiert alle Labels eines Rasters.
///
/// Liefert genau ein Feature pro Label `1..=K` in Label-Reihenfolge.
/// Labels, deren Ränder sich nicht sauber schließen lassen, bekommen
/// eine leere Geometrie statt den ganzen Layer abzubrechen.
pub fn vectorize(raster: &LabelRaster) -> Vec<RawFeature> {
    let components = label_components(raster);
    let width = raster.width() as usize;
    let label_count = raster.colors().len();

    let mut grid = EdgeGrid::new(raster);
    let mut polygons_by_label: Vec<Vec<Polygon>> = vec![Vec::new(); label_count + 1];
    let mut polygon_of_component: HashMap<u32, (u32, usize)> = HashMap::new();
    let mut holes: Vec<(u32, u32, Ring)> = Vec::new();
    let mut failed: HashSet<u32> = HashSet::new();

    for index in 0..grid.edges.len() {
        for dir in [EAST, SOUTH, WEST, NORTH] {
            if !grid.has_edge(index, dir) || grid.is_used(index, dir) {
                continue;
            }

            let (ox, oy) = grid.owner(index, dir);
            let label = raster.get(ox as u32, oy as u32);
            let component = components[oy as usize * width + ox as usize];

            let edges = match grid.trace(index, dir, label) {
                Ok(edges) => edges,
                Err(e) => {
                    log::warn!("Label {} nicht vektorisierbar: {:#}", label, e);
                    failed.insert(label);
                    continue;
                }
            };

            let ring = grid.corners(&edges);
            let area = signed_area(&ring);
            if area > 0.0 {
                let polygons = &mut polygons_by_label[label as usize];
                if polygon_of_component.contains_key(&component) {
                    log::warn!(
                        "Komponente {} von Label {} hat mehrere Außenringe",
                        component,
                        label
                    );
                } else {
                    polygon_of_component.insert(component, (label, polygons.len()));
                }
                polygons.push(Polygon::new(ring));
            } else if area < 0.0 {
                holes.push((component, label, ring));
            } else {
                log::warn!("Ring ohne Fläche bei Label {}", label);
                failed.insert(label);
            }
        }
    }

    for (component, label, ring) in holes {
        match polygon_of_component.get(&component) {
            Some(&(owner_label, polygon_index)) => {
                polygons_by_label[owner_label as usize][polygon_index]
                    .holes
                    .push(ring);
            }
            None => {
                log::warn!("Loch ohne Außenring bei Label {}", label);
                failed.insert(label);
            }
        }
    }

    let features: Vec<RawFeature> = raster
        .colors()
        .iter()
        .map(|(label, _)| {
            let polygons = std::mem::take(&mut polygons_by_label[label as usize]);
            let geometry = if failed.contains(&label) || polygons.is_empty() {
                Geometry::empty()
            } else {
                Geometry::from_polygons(polygons)
            };
            RawFeature { label, geometry }
        })
        .collect();

    log::debug!(
        "{} Labels vektorisiert, {} Komponenten, {} fehlgeschlagen",
        features.len(),
        polygon_of_component.len(),
        failed.len()
    );

    features
}

/// Zusammenhangskomponenten (4er-Nachbarschaft) per Flood-Fill.
fn label_components(raster: &LabelRaster) -> Vec<u32> {
    let width = raster.width() as usize;
    let height = raster.height() as usize;
    let labels = raster.labels();

    let mut components = vec![UNASSIGNED; width * height];
    let mut next_component = 0u32;
    let mut stack = Vec::new();

    for start in 0..labels.len() {
        if components[start] != UNASSIGNED {
            continue;
        }
        let label = labels[start];
        components[start] = next_component;
        stack.push(start);

        while let Some(i) = stack.pop() {
            let (x, y) = (i % width, i / width);
            let neighbours = [
                (x > 0).then(|| i - 1),
                (x + 1 < width).then(|| i + 1),
                (y > 0).then(|| i - width),
                (y + 1 < height).then(|| i + width),
            ];
            for n in neighbours.into_iter().flatten() {
                if components[n] == UNASSIGNED && labels[n] == label {
                    components[n] = next_component;
                    stack.push(n);
                }
            }
        }

        next_component += 1;
    }

    components
}

/// Gerichtete Grenzkanten auf dem Eckpunkt-Gitter (Bitmaske pro Eckpunkt).
struct EdgeGrid<'a> {
    raster: &'a LabelRaster,
    stride: usize,
    edges: Vec<u8>,
    used: Vec<u8>,
}

impl<'a> EdgeGrid<'a> {
    fn new(raster: &'a LabelRaster) -> Self {
        let width = raster.width() as usize;
        let height = raster.height() as usize;
        let stride = width + 1;
        let mut edges = vec![0u8; stride * (height + 1)];

        for y in 0..height {
            for x in 0..width {
                let label = raster.get(x as u32, y as u32);
                let differs = |dx: i64, dy: i64| {
                    raster.get_checked(x as i64 + dx, y as i64 + dy) != Some(label)
                };

                if differs(0, -1) {
                    edges[y * stride + x] |= 1 << EAST;
                }
                if differs(1, 0) {
                    edges[y * stride + x + 1] |= 1 << SOUTH;
                }
                if differs(0, 1) {
                    edges[(y + 1) * stride + x + 1] |= 1 << WEST;
                }
                if differs(-1, 0) {
                    edges[(y + 1) * stride + x] |= 1 << NORTH;
                }
            }
        }

        let used = vec![0u8; edges.len()];
        Self {
            raster,
            stride,
            edges,
            used,
        }
    }

    fn vertex(&self, index: usize) -> (i64, i64) {
        ((index % self.stride) as i64, (index / self.stride) as i64)
    }

    fn index(&self, x: i64, y: i64) -> usize {
        y as usize * self.stride + x as usize
    }

    fn has_edge(&self, index: usize, dir: u8) -> bool {
        self.edges[index] & (1 << dir) != 0
    }

    fn is_used(&self, index: usize, dir: u8) -> bool {
        self.used[index] & (1 << dir) != 0
    }

    /// Pixel rechts der Kante.
    fn owner(&self, index: usize, dir: u8) -> (i64, i64) {
        let (x, y) = self.vertex(index);
        let (dx, dy) = OWNER_OFFSETS[dir as usize];
        (x + dx, y + dy)
    }

    fn owner_label(&self, index: usize, dir: u8) -> Option<u32> {
        let (x, y) = self.owner(index, dir);
        self.raster.get_checked(x, y)
    }

    /// Label links der Kante (`None` außerhalb des Rasters).
    fn left_label(&self, index: usize, dir: u8) -> Option<u32> {
        let (x, y) = self.owner(index, dir);
        let (dx, dy) = LEFT_OFFSETS[dir as usize];
        self.raster.get_checked(x + dx, y + dy)
    }

    /// Nächste Kante desselben Labels: rechts, geradeaus, links.
    fn next_edge(&self, index: usize, incoming: u8, label: u32) -> Option<u8> {
        [(incoming + 1) % 4, incoming, (incoming + 3) % 4]
            .into_iter()
            .find(|&dir| self.has_edge(index, dir) && self.owner_label(index, dir) == Some(label))
    }

    /// Verfolgt einen Ring ab einer Startkante bis zurück zur Startkante.
    fn trace(&mut self, start: usize, start_dir: u8, label: u32) -> Result<Vec<(usize, u8)>> {
        let mut ring = Vec::new();
        let (mut index, mut dir) = (start, start_dir);

        loop {
            if self.is_used(index, dir) {
                let (x, y) = self.vertex(index);
                bail!("Kante bei ({}, {}) wird doppelt durchlaufen", x, y);
            }
            self.used[index] |= 1 << dir;
            ring.push((index, dir));

            let (x, y) = self.vertex(index);
            let (dx, dy) = STEPS[dir as usize];
            let next = self.index(x + dx, y + dy);

            let Some(next_dir) = self.next_edge(next, dir, label) else {
                bail!("Rand bricht bei ({}, {}) ab", x + dx, y + dy);
            };
            if next == start && next_dir == start_dir {
                break;
            }
            index = next;
            dir = next_dir;
        }

        Ok(ring)
    }

    /// Reduziert einen Kantenzug auf seine Eckpunkte.
    fn corners(&self, edges: &[(usize, u8)]) -> Ring {
        let n = edges.len();
        (0..n)
            .filter(|&i| {
                let (prev_index, prev_dir) = edges[(i + n - 1) % n];
                let (index, dir) = edges[i];
                prev_dir != dir
                    || self.left_label(prev_index, prev_dir) != self.left_label(index, dir)
            })
            .map(|i| {
                let (x, y) = self.vertex(edges[i].0);
                DVec2::new(x as f64, y as f64)
            })
            .collect()
    }
}
