//! Spatial-Hash über die Eckpunkte einer Topologie.
//!
//! Ein gleichmäßiges Zellgitter statt KD-Tree: Raster-Eckpunkte teilen sich
//! massenhaft dieselbe X- bzw. Y-Koordinate.

use glam::DVec2;
use std::collections::HashMap;

/// Read-only Index über alle Eckpunkte (ID = Position im Vektor).
#[derive(Debug, Clone)]
pub struct VertexGrid {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<u32>>,
    positions: Vec<DVec2>,
}

impl VertexGrid {
    /// Baut den Index mit fester Zellgröße.
    pub fn new(positions: Vec<DVec2>, cell_size: f64) -> Self {
        let mut grid = Self {
            cell_size,
            cells: HashMap::new(),
            positions: Vec::new(),
        };
        for (id, &p) in positions.iter().enumerate() {
            let cell = grid.cell_of(p);
            grid.cells.entry(cell).or_default().push(id as u32);
        }
        grid.positions = positions;
        grid
    }

    /// Wählt die Zellgröße so, dass im Mittel etwa ein Punkt pro Zelle liegt.
    ///
    /// `min_cell_size` verhindert Zellen kleiner als die Snapping-Toleranz.
    pub fn with_auto_cell_size(positions: Vec<DVec2>, min_cell_size: f64) -> Self {
        let (min, max) = positions.iter().fold(
            (DVec2::splat(f64::MAX), DVec2::splat(f64::MIN)),
            |(min, max), &p| (min.min(p), max.max(p)),
        );
        let extent = (max - min).max_element().max(0.0);
        let per_axis = (positions.len() as f64).sqrt().max(1.0);
        let cell_size = (extent / per_axis).max(min_cell_size);
        Self::new(positions, cell_size)
    }

    /// Gibt die Anzahl indexierter Punkte zurück.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Gibt `true` zurück, wenn keine Punkte im Index liegen.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, id: u32) -> DVec2 {
        self.positions[id as usize]
    }

    fn cell_of(&self, p: DVec2) -> (i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }

    /// Findet alle Punkte innerhalb eines axis-aligned Rechtecks (inkl. Rand).
    ///
    /// Reihenfolge: Zellen zeilenweise, innerhalb einer Zelle nach ID.
    pub fn within_rect(&self, min: DVec2, max: DVec2) -> Vec<u32> {
        if self.is_empty() {
            return Vec::new();
        }

        let (cx0, cy0) = self.cell_of(min);
        let (cx1, cy1) = self.cell_of(max);
        let mut hits = Vec::new();

        for cy in cy0..=cy1 {
            for cx in cx0..=cx1 {
                let Some(ids) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                hits.extend(ids.iter().copied().filter(|&id| {
                    let p = self.positions[id as usize];
                    p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
                }));
            }
        }

        hits
    }

    /// Punkte im Inneren der Strecke `a`–`b` (Abstand <= `tolerance`),
    /// sortiert nach Abstand von `a`. Die Endpunkte selbst zählen nicht.
    pub fn on_segment(&self, a: DVec2, b: DVec2, tolerance: f64) -> Vec<u32> {
        let d = b - a;
        let length = d.length();
        if length <= tolerance {
            return Vec::new();
        }

        let margin = DVec2::splat(tolerance);
        let mut hits: Vec<(f64, u32)> = self
            .within_rect(a.min(b) - margin, a.max(b) + margin)
            .into_iter()
            .filter_map(|id| {
                let p = self.positions[id as usize];
                let along = (p - a).dot(d) / length;
                if along <= tolerance || along >= length - tolerance {
                    return None;
                }
                let projected = a + d * (along / length);
                (p.distance(projected) <= tolerance).then_some((along, id))
            })
            .collect();

        hits.sort_by(|x, y| x.0.total_cmp(&y.0));
        hits.into_iter().map(|(_, id)| id).collect()
    }
}
