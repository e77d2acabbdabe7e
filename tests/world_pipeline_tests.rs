/// Integration-Tests: Welt-XML + Texturen → Kartendaten
use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use stationeers_map_data::options::WorldEntry;
use stationeers_map_data::{
    build_world, build_world_output, parse_world_document, BuilderOptions, WorldSettings,
};
use std::path::{Path, PathBuf};

const IRON: [u8; 3] = [200, 10, 10];
const GOLD: [u8; 3] = [220, 200, 0];
const WRECK: [u8; 3] = [0, 255, 0];
const CRATER: [u8; 3] = [0, 120, 255];
const BLACK: [u8; 3] = [0, 0, 0];
const WHITE: [u8; 3] = [255, 255, 255];

fn mining_texture() -> RgbImage {
    RgbImage::from_fn(8, 8, |x, y| {
        Rgb(match (x < 4, y < 4) {
            (true, true) => IRON,
            (false, true) => GOLD,
            _ => BLACK,
        })
    })
}

fn poi_texture() -> RgbImage {
    RgbImage::from_fn(8, 8, |x, y| {
        Rgb(if (3..5).contains(&x) && (3..5).contains(&y) {
            WRECK
        } else {
            WHITE
        })
    })
}

fn names_texture() -> RgbImage {
    RgbImage::from_fn(8, 8, |x, _| Rgb(if x < 4 { CRATER } else { BLACK }))
}

fn load_texture(path: &str) -> Result<RgbImage> {
    if path.ends_with("mining_regions.png") {
        Ok(mining_texture())
    } else if path.ends_with("poi_regions.png") {
        Ok(poi_texture())
    } else if path.ends_with("named_regions.png") {
        Ok(names_texture())
    } else {
        Err(anyhow!("unbekannte Textur {}", path))
    }
}

#[test]
fn test_world_output_layers_and_start_locations() {
    let xml = include_str!("fixtures/world_minimal.xml");
    let document = parse_world_document(xml).unwrap();
    let output = build_world_output(&document, &WorldSettings::default(), load_texture).unwrap();

    // Eine Position pro unterschiedlicher Spawn-Id
    assert_eq!(output.start_locations.len(), 3);
    let names: Vec<&str> = output.start_locations.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Crater Vesper", "Gullet Valley", "Death Valley"]);
    assert_eq!(output.start_locations["Crater Vesper"], [-100.0, 90.0]);

    let named = |layer: &str| -> Vec<String> {
        let topology = match layer {
            "mining" => &output.mining,
            "poi" => &output.poi,
            _ => &output.names,
        };
        topology.objects[layer]
            .geometries
            .iter()
            .filter_map(|g| g.properties.name.clone())
            .collect()
    };
    assert_eq!(named("mining"), vec!["Iron", "Gold"]);
    assert_eq!(named("poi"), vec!["Wreck"]);
    assert_eq!(named("names"), vec!["Big Crater"]);

    // Schwarzer Hintergrund bleibt im Mining-Layer als unbenannte Fläche
    assert_eq!(output.feature_counts(), [3, 1, 1]);

    for (name, topology) in output.layers() {
        assert!(!topology.arcs.is_empty(), "Layer {} ohne Arcs", name);
        for geometry in &topology.objects[name].geometries {
            for r in geometry.arc_refs() {
                assert!(r.index < topology.arcs.len());
            }
        }
        for point in topology.arcs.iter().flatten() {
            assert!((0.0..=1.0).contains(&point.x) && (0.0..=1.0).contains(&point.y));
        }
    }
}

#[test]
fn test_world_output_json_layout() {
    let xml = include_str!("fixtures/world_minimal.xml");
    let document = parse_world_document(xml).unwrap();
    let output = build_world_output(&document, &WorldSettings::default(), load_texture).unwrap();

    let json: serde_json::Value = serde_json::from_str(&output.to_json(false).unwrap()).unwrap();
    let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["start_locations", "mining", "poi", "names"]);

    assert_eq!(json["mining"]["type"], "Topology");
    assert_eq!(json["poi"]["objects"]["poi"]["type"], "GeometryCollection");
    let wreck = &json["poi"]["objects"]["poi"]["geometries"][0];
    assert_eq!(wreck["type"], "Polygon");
    assert_eq!(wreck["properties"]["name"], "Wreck");
    assert_eq!(wreck["properties"]["color_hex"], "#00ff00");
    assert_eq!(wreck["properties"]["rgb"], serde_json::json!([0, 255, 0]));
    assert_eq!(json["start_locations"]["Gullet Valley"], serde_json::json!([300.0, -42.25]));
}

#[test]
fn test_unmatched_mining_dropped_when_disabled() {
    let xml = include_str!("fixtures/world_minimal.xml");
    let document = parse_world_document(xml).unwrap();
    let settings = WorldSettings {
        retain_unmatched_mining: false,
        ..Default::default()
    };
    let output = build_world_output(&document, &settings, load_texture).unwrap();
    assert_eq!(output.feature_counts(), [2, 1, 1]);
}

#[test]
fn test_missing_names_layer_fails() {
    let xml = include_str!("fixtures/world_minimal.xml")
        .replace("TestNamedRegions", "TestLabels");
    let document = parse_world_document(&xml).unwrap();
    let err = build_world_output(&document, &WorldSettings::default(), load_texture)
        .expect_err("names-Layer fehlt");
    assert!(err.to_string().contains("'names'"));
}

#[test]
fn test_texture_error_names_layer() {
    let xml = include_str!("fixtures/world_minimal.xml");
    let document = parse_world_document(xml).unwrap();
    let err = build_world_output(&document, &WorldSettings::default(), |path| {
        if path.contains("poi") {
            Err(anyhow!("kaputt"))
        } else {
            load_texture(path)
        }
    })
    .expect_err("poi-Textur fehlt");
    assert!(format!("{:#}", err).contains("Layer 'poi'"));
}

// ── Dateibasiert ────────────────────────────────────────────────────

/// Legt eine Stationeers-artige Verzeichnisstruktur an:
/// `<root>/Worlds/Testworld/Testworld.xml` + Texturen unter `<root>/Worlds/Testworld/Textures`.
fn write_world_tree(root: &Path) -> PathBuf {
    let world_dir = root.join("Worlds").join("Testworld");
    let textures = world_dir.join("Textures");
    std::fs::create_dir_all(&textures).unwrap();

    std::fs::write(
        world_dir.join("Testworld.xml"),
        include_str!("fixtures/world_minimal.xml"),
    )
    .unwrap();
    mining_texture()
        .save(textures.join("mining_regions.png"))
        .unwrap();
    poi_texture().save(textures.join("poi_regions.png")).unwrap();
    names_texture()
        .save(textures.join("named_regions.png"))
        .unwrap();
    RgbImage::from_fn(16, 16, |x, y| Rgb([x as u8 * 16, y as u8 * 16, 128]))
        .save(textures.join("normal.png"))
        .unwrap();

    root.join("Worlds")
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "stationeers_map_data_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_build_world_writes_files() {
    let root = scratch_dir("build_world");
    let base_dir = write_world_tree(&root);

    let options = BuilderOptions {
        output_dir: root.join("out"),
        ..Default::default()
    };
    let entry = WorldEntry::new("Testworld", "Testworld", "Testworld.xml");
    let report = build_world(&entry, &base_dir, &options, true).unwrap();

    assert_eq!(report.json_path, root.join("out").join("testworld.json"));
    assert_eq!(
        report.terrain_path,
        Some(root.join("out").join("testworld_terrain.webp"))
    );
    assert_eq!(report.start_location_count, 3);
    assert_eq!(report.feature_counts, [3, 1, 1]);

    let content = std::fs::read_to_string(&report.json_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(json["names"]["arcs"].as_array().is_some_and(|a| !a.is_empty()));

    let terrain = image::open(root.join("out").join("testworld_terrain.webp")).unwrap();
    assert_eq!((terrain.width(), terrain.height()), (4, 4));

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn test_build_world_missing_texture_fails() {
    let root = scratch_dir("missing_texture");
    let base_dir = write_world_tree(&root);
    std::fs::remove_file(
        base_dir
            .join("Testworld")
            .join("Textures")
            .join("poi_regions.png"),
    )
    .unwrap();

    let options = BuilderOptions {
        output_dir: root.join("out"),
        write_terrain: false,
        ..Default::default()
    };
    let entry = WorldEntry::new("Testworld", "Testworld", "Testworld.xml");
    let err = build_world(&entry, &base_dir, &options, false).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Testworld"), "{}", message);
    assert!(message.contains("poi_regions.png"), "{}", message);
    assert!(!root.join("out").join("testworld.json").exists());

    let _ = std::fs::remove_dir_all(&root);
}
