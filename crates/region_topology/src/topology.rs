//! Topologie mit gemeinsamen Kanten (TopoJSON).
//!
//! Ablauf über alle Layer einer Welt gemeinsam:
//! 1. Eckpunkte auf ein Toleranz-Gitter snappen (gleiche Zelle = gleicher Punkt)
//! 2. Strecken an Eckpunkten aufteilen, die auf ihnen liegen (Noding)
//! 3. Knotenpunkte bestimmen: Eckpunkte mit mehr als zwei Nachbarn
//! 4. Ringe an Knotenpunkten in Pfade zerlegen; identische Pfade
//!    (auch rückwärts) werden zu einem Arc
//! 5. Jeden Ring aus seinen Arcs rekonstruieren und gegenprüfen

use anyhow::{Context, Result, anyhow, bail, ensure};
use glam::DVec2;
use indexmap::IndexMap;
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use std::collections::HashMap;

use crate::geometry::Ring;
use crate::normalize::NormalizedWorld;
use crate::palette::Rgb;
use crate::resolve::{RegionLayer, ResolvedFeature};
use crate::spatial::VertexGrid;

/// Standard-Toleranz im Einheitsquadrat.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Verweis auf einen Arc, optional rückwärts durchlaufen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArcRef {
    pub index: usize,
    pub reversed: bool,
}

impl ArcRef {
    pub fn forward(index: usize) -> Self {
        Self {
            index,
            reversed: false,
        }
    }

    pub fn backward(index: usize) -> Self {
        Self {
            index,
            reversed: true,
        }
    }

    /// TopoJSON-Kodierung: `i` vorwärts, `!i` (= `-i - 1`) rückwärts.
    pub fn encode(self) -> i64 {
        if self.reversed {
            !(self.index as i64)
        } else {
            self.index as i64
        }
    }

    pub fn decode(value: i64) -> Self {
        if value < 0 {
            Self::backward(!value as usize)
        } else {
            Self::forward(value as usize)
        }
    }
}

impl Serialize for ArcRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.encode())
    }
}

/// Eigenschaften eines Features in der Ausgabe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub rgb: Rgb,
    pub color_hex: String,
}

impl FeatureProperties {
    fn from_feature(feature: &ResolvedFeature) -> Self {
        Self {
            name: feature.name.clone(),
            rgb: feature.color,
            color_hex: feature.color_hex.clone(),
        }
    }
}

/// Geometrie eines Features mit Arc-Verweisen statt Koordinaten.
#[derive(Debug, Clone, PartialEq)]
pub struct TopoGeometry {
    /// Polygone → Ringe (Außenring zuerst) → Arc-Verweise
    pub polygons: Vec<Vec<Vec<ArcRef>>>,
    /// `MultiPolygon` statt `Polygon`
    pub multi: bool,
    pub properties: FeatureProperties,
}

impl TopoGeometry {
    /// Alle Arc-Verweise aller Ringe.
    pub fn arc_refs(&self) -> impl Iterator<Item = ArcRef> + '_ {
        self.polygons.iter().flatten().flatten().copied()
    }

    fn remap_arcs(&self, remap: &mut impl FnMut(usize) -> usize) -> Self {
        let polygons = self
            .polygons
            .iter()
            .map(|rings| {
                rings
                    .iter()
                    .map(|refs| {
                        refs.iter()
                            .map(|r| ArcRef {
                                index: remap(r.index),
                                reversed: r.reversed,
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Self {
            polygons,
            multi: self.multi,
            properties: self.properties.clone(),
        }
    }
}

impl Serialize for TopoGeometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TopoGeometry", 3)?;
        if self.multi {
            state.serialize_field("type", "MultiPolygon")?;
            state.serialize_field("arcs", &self.polygons)?;
        } else {
            let rings: &[Vec<ArcRef>] = self.polygons.first().map(Vec::as_slice).unwrap_or(&[]);
            state.serialize_field("type", "Polygon")?;
            state.serialize_field("arcs", rings)?;
        }
        state.serialize_field("properties", &self.properties)?;
        state.end()
    }
}

/// TopoJSON `GeometryCollection`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub geometries: Vec<TopoGeometry>,
}

impl GeometryCollection {
    pub fn new(geometries: Vec<TopoGeometry>) -> Self {
        Self {
            kind: "GeometryCollection",
            geometries,
        }
    }
}

/// TopoJSON-Objekt eines Layers (unquantisiert).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topology {
    #[serde(rename = "type")]
    kind: &'static str,
    /// `[min_x, min_y, max_x, max_y]` über alle Arcs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    pub arcs: Vec<Vec<DVec2>>,
    pub objects: IndexMap<String, GeometryCollection>,
}

impl Topology {
    /// Rekonstruiert einen Ring aus seinen Arc-Verweisen.
    pub fn replay_ring(&self, refs: &[ArcRef]) -> Result<Ring> {
        replay_ring(&self.arcs, refs)
    }
}

/// Gemeinsame Topologie aller Layer einer Welt.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldTopology {
    /// Arcs als Punktfolgen im Einheitsquadrat
    pub arcs: Vec<Vec<DVec2>>,
    /// Layer-Name → Geometrien (Reihenfolge wie die Features)
    pub layers: IndexMap<String, Vec<TopoGeometry>>,
}

impl WorldTopology {
    /// Rekonstruiert einen Ring aus seinen Arc-Verweisen.
    pub fn replay_ring(&self, refs: &[ArcRef]) -> Result<Ring> {
        replay_ring(&self.arcs, refs)
    }

    /// Eigenständige Topologie eines Layers.
    ///
    /// Enthält nur die Arcs, die der Layer referenziert (neu nummeriert in
    /// Reihenfolge der ersten Verwendung). Die Schnittpunkte der Arcs bleiben
    /// die der gemeinsamen Topologie, damit Layer-Grenzen deckungsgleich sind.
    pub fn layer_topology(&self, name: &str) -> Option<Topology> {
        let geometries = self.layers.get(name)?;

        let mut remap: HashMap<usize, usize> = HashMap::new();
        let mut arcs: Vec<Vec<DVec2>> = Vec::new();
        let geometries: Vec<TopoGeometry> = geometries
            .iter()
            .map(|geometry| {
                geometry.remap_arcs(&mut |index| {
                    *remap.entry(index).or_insert_with(|| {
                        arcs.push(self.arcs[index].clone());
                        arcs.len() - 1
                    })
                })
            })
            .collect();

        let bbox = arcs.iter().flatten().fold(None, |bbox, p| {
            let [min_x, min_y, max_x, max_y] = bbox.unwrap_or([p.x, p.y, p.x, p.y]);
            Some([min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y)])
        });

        let mut objects = IndexMap::new();
        objects.insert(name.to_string(), GeometryCollection::new(geometries));

        Some(Topology {
            kind: "Topology",
            bbox,
            arcs,
            objects,
        })
    }

    /// Zerlegt in eine Topologie pro Layer (Layer-Reihenfolge bleibt erhalten).
    pub fn into_layer_topologies(self) -> IndexMap<String, Topology> {
        self.layers
            .keys()
            .filter_map(|name| Some((name.clone(), self.layer_topology(name)?)))
            .collect()
    }
}

/// Baut die gemeinsame Topologie aller Layer einer normalisierten Welt.
///
/// # Fehler
/// Ring kollabiert unter der Toleranz oder lässt sich nicht aus ganzen
/// Arcs rekonstruieren. Die Meldung nennt Layer, Label und Farbe.
pub fn build_topology(world: &NormalizedWorld, tolerance: f64) -> Result<WorldTopology> {
    ensure!(
        tolerance.is_finite() && tolerance > 0.0,
        "Ungültige Topologie-Toleranz: {}",
        tolerance
    );

    // 1. Snapping
    let mut snapper = Snapper::new(tolerance);
    let mut rings: Vec<Vec<u32>> = Vec::new();
    let mut ring_owners: Vec<String> = Vec::new();
    let mut slots: Vec<FeatureSlot> = Vec::new();

    for (layer_index, layer) in world.layers.iter().enumerate() {
        for feature in &layer.features {
            let owner = describe_feature(layer, feature);
            let mut polygons = Vec::new();
            for polygon in feature.geometry.polygons() {
                let mut ring_indices = Vec::new();
                for ring in polygon.rings() {
                    let ids = snapper.snap_ring(ring);
                    ensure!(
                        ids.len() >= 3,
                        "{}: Ring kollabiert bei Toleranz {} ({} von {} Punkten übrig)",
                        owner,
                        tolerance,
                        ids.len(),
                        ring.len()
                    );
                    ring_indices.push(rings.len());
                    rings.push(ids);
                    ring_owners.push(owner.clone());
                }
                polygons.push(ring_indices);
            }
            slots.push(FeatureSlot {
                layer_index,
                polygons,
                multi: feature.geometry.is_multi(),
                properties: FeatureProperties::from_feature(feature),
            });
        }
    }

    let positions = snapper.positions;

    // 2. Noding
    let grid = VertexGrid::with_auto_cell_size(positions, tolerance * 4.0);
    for ring in &mut rings {
        *ring = node_ring(ring, &grid, tolerance);
    }

    // 3. Knotenpunkte
    let junctions = find_junctions(&rings, grid.len());

    // 4. Arcs
    let mut arc_ids: Vec<Vec<u32>> = Vec::new();
    let mut arc_index: HashMap<Vec<u32>, usize> = HashMap::new();
    let ring_refs: Vec<Vec<ArcRef>> = rings
        .iter()
        .map(|ring| cut_ring(ring, &junctions, &mut arc_index, &mut arc_ids))
        .collect();

    // 5. Gegenprüfung
    for ((ring, refs), owner) in rings.iter().zip(&ring_refs).zip(&ring_owners) {
        let replayed = replay_ids(&arc_ids, refs)
            .with_context(|| format!("{}: Ring lässt sich nicht aus Arcs zusammensetzen", owner))?;
        if !same_cycle(ring, &replayed) {
            bail!(
                "{}: Ring weicht nach Zerlegung in {} Arcs vom Original ab",
                owner,
                refs.len()
            );
        }
    }

    let arcs: Vec<Vec<DVec2>> = arc_ids
        .iter()
        .map(|ids| ids.iter().map(|&id| grid.position(id)).collect())
        .collect();

    let mut layers: IndexMap<String, Vec<TopoGeometry>> = world
        .layers
        .iter()
        .map(|layer| (layer.name.clone(), Vec::new()))
        .collect();
    for slot in slots {
        let polygons = slot
            .polygons
            .iter()
            .map(|ring_indices| ring_indices.iter().map(|&i| ring_refs[i].clone()).collect())
            .collect();
        let geometry = TopoGeometry {
            polygons,
            multi: slot.multi,
            properties: slot.properties,
        };
        if let Some((_, geometries)) = layers.get_index_mut(slot.layer_index) {
            geometries.push(geometry);
        }
    }

    log::info!(
        "Topologie: {} Ringe, {} Punkte, {} Arcs",
        rings.len(),
        grid.len(),
        arcs.len()
    );

    Ok(WorldTopology { arcs, layers })
}

/// Zwischenstand eines Features bis die Arcs feststehen.
struct FeatureSlot {
    layer_index: usize,
    /// Polygone → Indizes in die Ring-Liste
    polygons: Vec<Vec<usize>>,
    multi: bool,
    properties: FeatureProperties,
}

fn describe_feature(layer: &RegionLayer, feature: &ResolvedFeature) -> String {
    match &feature.name {
        Some(name) => format!(
            "Layer '{}', Label {} ({}, '{}')",
            layer.name, feature.label, feature.color_hex, name
        ),
        None => format!(
            "Layer '{}', Label {} ({})",
            layer.name, feature.label, feature.color_hex
        ),
    }
}

/// Vergibt Punkt-IDs über ein Gitter mit Kantenlänge = Toleranz.
struct Snapper {
    inv_tolerance: f64,
    keys: HashMap<(i64, i64), u32>,
    positions: Vec<DVec2>,
}

impl Snapper {
    fn new(tolerance: f64) -> Self {
        Self {
            inv_tolerance: 1.0 / tolerance,
            keys: HashMap::new(),
            positions: Vec::new(),
        }
    }

    fn snap(&mut self, p: DVec2) -> u32 {
        let key = (
            (p.x * self.inv_tolerance).round() as i64,
            (p.y * self.inv_tolerance).round() as i64,
        );
        *self.keys.entry(key).or_insert_with(|| {
            self.positions.push(p);
            (self.positions.len() - 1) as u32
        })
    }

    /// Snappt einen Ring; aufeinanderfolgende Duplikate fallen weg.
    fn snap_ring(&mut self, ring: &[DVec2]) -> Vec<u32> {
        let mut ids: Vec<u32> = Vec::with_capacity(ring.len());
        for &p in ring {
            let id = self.snap(p);
            if ids.last() != Some(&id) {
                ids.push(id);
            }
        }
        while ids.len() > 1 && ids.first() == ids.last() {
            ids.pop();
        }
        ids
    }
}

/// Fügt Punkte ein, die auf den Strecken des Rings liegen.
fn node_ring(ring: &[u32], grid: &VertexGrid, tolerance: f64) -> Vec<u32> {
    let mut noded = Vec::with_capacity(ring.len());
    for (i, &a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        noded.push(a);
        for id in grid.on_segment(grid.position(a), grid.position(b), tolerance) {
            if id != b && noded.last() != Some(&id) {
                noded.push(id);
            }
        }
    }
    noded
}

/// Punkte mit mehr als zwei verschiedenen Nachbarn über alle Ringe.
fn find_junctions(rings: &[Vec<u32>], point_count: usize) -> Vec<bool> {
    let mut neighbours: Vec<Vec<u32>> = vec![Vec::new(); point_count];
    for ring in rings {
        for (i, &a) in ring.iter().enumerate() {
            let b = ring[(i + 1) % ring.len()];
            for (from, to) in [(a, b), (b, a)] {
                let list = &mut neighbours[from as usize];
                if !list.contains(&to) {
                    list.push(to);
                }
            }
        }
    }
    neighbours.iter().map(|n| n.len() > 2).collect()
}

/// Zerlegt einen Ring an Knotenpunkten in Arcs.
fn cut_ring(
    ring: &[u32],
    junctions: &[bool],
    arc_index: &mut HashMap<Vec<u32>, usize>,
    arcs: &mut Vec<Vec<u32>>,
) -> Vec<ArcRef> {
    let n = ring.len();
    let Some(start) = (0..n).find(|&i| junctions[ring[i] as usize]) else {
        let (path, reversed) = closed_path(ring);
        return vec![intern_arc(path, reversed, arc_index, arcs)];
    };

    let mut refs = Vec::new();
    let mut path = vec![ring[start]];
    for step in 1..=n {
        let id = ring[(start + step) % n];
        path.push(id);
        if junctions[id as usize] {
            let finished = std::mem::replace(&mut path, vec![id]);
            refs.push(intern_open_path(finished, arc_index, arcs));
        }
    }
    refs
}

/// Kanonische Form eines offenen Pfads: lexikographisch kleinere Richtung.
fn intern_open_path(
    path: Vec<u32>,
    arc_index: &mut HashMap<Vec<u32>, usize>,
    arcs: &mut Vec<Vec<u32>>,
) -> ArcRef {
    let reversed: Vec<u32> = path.iter().rev().copied().collect();
    if reversed < path {
        intern_arc(reversed, true, arc_index, arcs)
    } else {
        intern_arc(path, false, arc_index, arcs)
    }
}

/// Kanonische Form eines Rings ohne Knotenpunkte.
///
/// Beginnt beim kleinsten Punkt, Richtung lexikographisch kleiner,
/// Schlusspunkt wiederholt. `true` wenn gegen die Ringrichtung gespeichert.
fn closed_path(ring: &[u32]) -> (Vec<u32>, bool) {
    let n = ring.len();
    let m = (0..n).min_by_key(|&i| ring[i]).unwrap_or(0);
    let forward: Vec<u32> = (0..=n).map(|k| ring[(m + k) % n]).collect();
    let backward: Vec<u32> = (0..=n).map(|k| ring[(m + n - k % n) % n]).collect();
    if backward < forward {
        (backward, true)
    } else {
        (forward, false)
    }
}

fn intern_arc(
    path: Vec<u32>,
    reversed: bool,
    arc_index: &mut HashMap<Vec<u32>, usize>,
    arcs: &mut Vec<Vec<u32>>,
) -> ArcRef {
    let index = *arc_index.entry(path).or_insert_with_key(|path| {
        arcs.push(path.clone());
        arcs.len() - 1
    });
    ArcRef { index, reversed }
}

/// Setzt Arc-Punktfolgen zu einem offenen Ring zusammen.
fn replay<T: Copy + PartialEq>(arcs: &[Vec<T>], refs: &[ArcRef]) -> Result<Vec<T>> {
    let mut ring: Vec<T> = Vec::new();
    for r in refs {
        let arc = arcs
            .get(r.index)
            .ok_or_else(|| anyhow!("Arc {} existiert nicht", r.index))?;
        let points: Vec<T> = if r.reversed {
            arc.iter().rev().copied().collect()
        } else {
            arc.clone()
        };
        let Some((&first, rest)) = points.split_first() else {
            bail!("Arc {} ist leer", r.index);
        };
        match ring.last() {
            Some(&last) if last != first => bail!("Arc {} schließt nicht an", r.index),
            Some(_) => ring.extend_from_slice(rest),
            None => ring.extend_from_slice(&points),
        }
    }

    ensure!(ring.len() >= 2, "Ring aus {} Arcs zu kurz", refs.len());
    if ring.first() != ring.last() {
        bail!("Ring aus {} Arcs ist nicht geschlossen", refs.len());
    }
    ring.pop();
    Ok(ring)
}

fn replay_ids(arcs: &[Vec<u32>], refs: &[ArcRef]) -> Result<Vec<u32>> {
    replay(arcs, refs)
}

fn replay_ring(arcs: &[Vec<DVec2>], refs: &[ArcRef]) -> Result<Ring> {
    replay(arcs, refs)
}

/// Gleiche Punktfolge bis auf Rotation.
fn same_cycle(a: &[u32], b: &[u32]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a.is_empty() {
        return true;
    }
    (0..b.len())
        .filter(|&offset| b[offset] == a[0])
        .any(|offset| (0..a.len()).all(|i| a[i] == b[(offset + i) % b.len()]))
}
