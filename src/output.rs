//! JSON-Ausgabe einer Welt.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use region_topology::Topology;
use serde::Serialize;
use std::path::Path;

/// Kartendaten einer Welt, so wie sie das Web-Frontend lädt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldOutput {
    /// Startpunkt-Name → `[x, y]` in Welt-Koordinaten
    pub start_locations: IndexMap<String, [f64; 2]>,
    pub mining: Topology,
    pub poi: Topology,
    pub names: Topology,
}

impl WorldOutput {
    /// Layer in Ausgabe-Reihenfolge.
    pub fn layers(&self) -> [(&'static str, &Topology); 3] {
        [
            ("mining", &self.mining),
            ("poi", &self.poi),
            ("names", &self.names),
        ]
    }

    /// Anzahl Geometrien pro Layer (mining, poi, names).
    pub fn feature_counts(&self) -> [usize; 3] {
        self.layers().map(|(name, topology)| {
            topology
                .objects
                .get(name)
                .map_or(0, |collection| collection.geometries.len())
        })
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Schreibt die Welt als JSON-Datei, legt fehlende Verzeichnisse an.
    pub fn write_json(&self, path: &Path, pretty: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Verzeichnis nicht anlegbar: {}", parent.display()))?;
        }
        let json = self.to_json(pretty)?;
        std::fs::write(path, &json)
            .with_context(|| format!("JSON nicht schreibbar: {}", path.display()))?;
        log::info!("Geschrieben: {} ({} Bytes)", path.display(), json.len());
        Ok(())
    }
}
