//! Aufbau der Kartendaten einer Welt.
//!
//! Verbindet Welt-XML, Regions-Texturen und die Regionen-Pipeline
//! zu einem [`WorldOutput`].

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use indexmap::IndexMap;
use region_topology::{build_world_regions, normalize_names, LayerSource, Topology};
use std::path::{Path, PathBuf};

use crate::options::{BuilderOptions, WorldEntry};
use crate::output::WorldOutput;
use crate::terrain;
use crate::xml::{parse_world_document, RegionSet, StartLocation, WorldDocument};

/// Die drei Regions-Layer einer Welt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Mining,
    Poi,
    Names,
}

impl LayerKind {
    /// Alle Layer in Ausgabe-Reihenfolge.
    pub const ALL: [LayerKind; 3] = [LayerKind::Mining, LayerKind::Poi, LayerKind::Names];

    /// Name des Layers in der Ausgabe.
    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Mining => "mining",
            LayerKind::Poi => "poi",
            LayerKind::Names => "names",
        }
    }

    /// Ordnet ein `RegionSet` über seine Id einem Layer zu.
    ///
    /// Prüft in der Reihenfolge `mining`, `poi`, `named` (ohne Groß-/Kleinschreibung).
    pub fn classify(region_set_id: &str) -> Option<Self> {
        let id = region_set_id.to_lowercase();
        if id.contains("mining") {
            Some(LayerKind::Mining)
        } else if id.contains("poi") {
            Some(LayerKind::Poi)
        } else if id.contains("named") {
            Some(LayerKind::Names)
        } else {
            None
        }
    }
}

/// Einstellungen für den Aufbau einer Welt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldSettings {
    /// Snapping-Toleranz der Topologie im Einheitsquadrat
    pub tolerance: f64,
    /// Flächen ohne Katalog-Farbe im Mining-Layer behalten
    pub retain_unmatched_mining: bool,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            tolerance: region_topology::DEFAULT_TOLERANCE,
            retain_unmatched_mining: true,
        }
    }
}

impl From<&BuilderOptions> for WorldSettings {
    fn from(options: &BuilderOptions) -> Self {
        Self {
            tolerance: options.topology_tolerance,
            retain_unmatched_mining: options.retain_unmatched_mining,
        }
    }
}

/// Wählt pro Layer das `RegionSet` mit Textur.
///
/// Bei mehreren passenden Sets gewinnt das letzte im Dokument.
///
/// # Fehler
/// Ein Layer hat kein passendes `RegionSet`.
pub fn select_layers(document: &WorldDocument) -> Result<IndexMap<LayerKind, &RegionSet>> {
    let mut found: IndexMap<LayerKind, &RegionSet> = IndexMap::new();
    for set in &document.region_sets {
        if set.texture_path.is_none() {
            log::debug!("RegionSet '{}' ohne Texture übersprungen", set.id);
            continue;
        }
        match LayerKind::classify(&set.id) {
            Some(kind) => {
                found.insert(kind, set);
            }
            None => log::debug!("RegionSet '{}' keinem Layer zugeordnet", set.id),
        }
    }

    LayerKind::ALL
        .iter()
        .map(|&kind| {
            let set = found.get(&kind).copied().ok_or_else(|| {
                anyhow!(
                    "Kein RegionSet mit Texture für Layer '{}' in der Welt-XML",
                    kind.name()
                )
            })?;
            Ok((kind, set))
        })
        .collect()
}

/// Startpunkte mit normalisierten Namen in Dokument-Reihenfolge.
///
/// Doppelte Namen: der spätere Wert gewinnt, die Position des ersten bleibt.
pub fn start_locations(locations: &[StartLocation]) -> IndexMap<String, [f64; 2]> {
    let ids: Vec<&str> = locations.iter().map(|l| l.id.as_str()).collect();
    normalize_names(&ids)
        .into_iter()
        .zip(locations)
        .map(|(name, location)| (name, [location.x, location.y]))
        .collect()
}

/// Baut die Kartendaten aus einem geparsten Dokument.
///
/// `load_texture` bekommt den `Texture Path` aus der XML und liefert das Raster.
pub fn build_world_output(
    document: &WorldDocument,
    settings: &WorldSettings,
    load_texture: impl Fn(&str) -> Result<RgbImage>,
) -> Result<WorldOutput> {
    let layers = select_layers(document)?;

    let mut sources = Vec::with_capacity(layers.len());
    for (&kind, set) in &layers {
        let path = set.texture_path.as_deref().unwrap_or_default();
        let image = load_texture(path)
            .with_context(|| format!("Textur für Layer '{}' ({})", kind.name(), path))?;
        sources.push(LayerSource {
            name: kind.name().to_string(),
            image,
            regions: set.regions.clone(),
            retain_unmatched: kind == LayerKind::Mining && settings.retain_unmatched_mining,
        });
    }

    let mut topologies = build_world_regions(sources, settings.tolerance)?.into_layer_topologies();
    let mut take = |kind: LayerKind| -> Result<Topology> {
        topologies
            .shift_remove(kind.name())
            .ok_or_else(|| anyhow!("Topologie für Layer '{}' fehlt", kind.name()))
    };

    Ok(WorldOutput {
        start_locations: start_locations(&document.start_locations),
        mining: take(LayerKind::Mining)?,
        poi: take(LayerKind::Poi)?,
        names: take(LayerKind::Names)?,
    })
}

/// Geschriebene Dateien einer Welt.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldReport {
    pub name: String,
    pub json_path: PathBuf,
    pub terrain_path: Option<PathBuf>,
    pub start_location_count: usize,
    /// Features pro Layer (mining, poi, names)
    pub feature_counts: [usize; 3],
}

/// Verzeichnis, gegen das Textur-Pfade aufgelöst werden (drei Ebenen über der XML).
pub fn asset_root(xml_path: &Path) -> Result<PathBuf> {
    xml_path
        .ancestors()
        .nth(3)
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("Kein Asset-Verzeichnis über {}", xml_path.display()))
}

/// Liest eine Welt von der Platte und schreibt JSON (und Terrain).
pub fn build_world(
    entry: &WorldEntry,
    base_dir: &Path,
    options: &BuilderOptions,
    pretty: bool,
) -> Result<WorldReport> {
    let xml_path = base_dir.join(&entry.dir).join(&entry.xml);
    log::info!("Welt '{}': lese {}", entry.name, xml_path.display());

    let content = std::fs::read_to_string(&xml_path)
        .with_context(|| format!("Welt-XML nicht lesbar: {}", xml_path.display()))?;
    let document = parse_world_document(&content)
        .with_context(|| format!("Welt-XML fehlerhaft: {}", xml_path.display()))?;
    let root = asset_root(&xml_path)?;

    let terrain_path = if options.write_terrain {
        let normal = document.normal_map_path.as_deref().ok_or_else(|| {
            anyhow!("Kein Normal Path unter MaterialSettings/Macro in der Welt-XML")
        })?;
        let normal = entry.rewrite_normal_path(normal);
        let target = options
            .output_dir
            .join(format!("{}_terrain.webp", entry.output_stem()));
        terrain::write_terrain(&root.join(&normal), &target, options.terrain_downscale)?;
        Some(target)
    } else {
        None
    };

    let output = build_world_output(&document, &WorldSettings::from(options), |path| {
        let full = root.join(path);
        let image = image::open(&full)
            .with_context(|| format!("Bild nicht lesbar: {}", full.display()))?;
        Ok(image.to_rgb8())
    })
    .with_context(|| format!("Welt '{}'", entry.name))?;

    let json_path = options
        .output_dir
        .join(format!("{}.json", entry.output_stem()));
    output.write_json(&json_path, pretty)?;

    Ok(WorldReport {
        name: entry.name.clone(),
        json_path,
        terrain_path,
        start_location_count: output.start_locations.len(),
        feature_counts: output.feature_counts(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(id: &str, texture: Option<&str>) -> RegionSet {
        RegionSet {
            id: id.to_string(),
            texture_path: texture.map(str::to_string),
            regions: Vec::new(),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(LayerKind::classify("MarsMiningRegions"), Some(LayerKind::Mining));
        assert_eq!(LayerKind::classify("EuropaPOI"), Some(LayerKind::Poi));
        assert_eq!(LayerKind::classify("LunarNamedRegions"), Some(LayerKind::Names));
        // mining hat Vorrang
        assert_eq!(LayerKind::classify("MiningPoiNamed"), Some(LayerKind::Mining));
        assert_eq!(LayerKind::classify("Biomes"), None);
    }

    #[test]
    fn test_select_layers_last_wins_and_needs_texture() {
        let document = WorldDocument {
            region_sets: vec![
                set("MiningOld", Some("old.png")),
                set("PoiRegions", Some("poi.png")),
                set("NamedRegions", Some("names.png")),
                set("MiningNew", Some("new.png")),
                set("MiningNoTexture", None),
            ],
            ..Default::default()
        };
        let layers = select_layers(&document).unwrap();
        let order: Vec<LayerKind> = layers.keys().copied().collect();
        assert_eq!(order, LayerKind::ALL.to_vec());
        assert_eq!(layers[&LayerKind::Mining].id, "MiningNew");
    }

    #[test]
    fn test_select_layers_missing_layer() {
        let document = WorldDocument {
            region_sets: vec![set("MiningRegions", Some("m.png")), set("PoiRegions", None)],
            ..Default::default()
        };
        let err = select_layers(&document).unwrap_err();
        assert!(err.to_string().contains("'poi'"));
    }

    #[test]
    fn test_start_locations_normalized() {
        let locations = vec![
            StartLocation {
                id: "MarsSpawnCraterVesper".into(),
                x: 1.0,
                y: 2.0,
            },
            StartLocation {
                id: "MarsSpawnGulletValley".into(),
                x: 3.0,
                y: 4.0,
            },
        ];
        let map = start_locations(&locations);
        let names: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Crater Vesper", "Gullet Valley"]);
        assert_eq!(map["Gullet Valley"], [3.0, 4.0]);
    }

    #[test]
    fn test_start_locations_duplicate_keeps_first_position() {
        let locations = vec![
            StartLocation {
                id: "SpawnA".into(),
                x: 1.0,
                y: 1.0,
            },
            StartLocation {
                id: "SpawnB".into(),
                x: 2.0,
                y: 2.0,
            },
            StartLocation {
                id: "SpawnA".into(),
                x: 3.0,
                y: 3.0,
            },
        ];
        let map = start_locations(&locations);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get_index(0), Some((&"A".to_string(), &[3.0, 3.0])));
    }

    #[test]
    fn test_asset_root() {
        let root = asset_root(Path::new("/games/Worlds/Mars2/Mars2.xml")).unwrap();
        assert_eq!(root, PathBuf::from("/games"));
        assert!(asset_root(Path::new("Mars2.xml")).is_err());
    }
}
