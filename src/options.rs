//! Konfiguration des Kartendaten-Builders.
//!
//! `BuilderOptions` wird als TOML gelesen; fehlende Felder fallen auf die
//! Standardwerte zurück. Die `const`-Werte sind die Defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ── Defaults ────────────────────────────────────────────────────────

/// Zielverzeichnis für JSON und Terrain-Bilder.
pub const DEFAULT_OUTPUT_DIR: &str = "js/public/data";
/// Terrain-Verkleinerung (ganzzahliger Faktor pro Achse).
pub const DEFAULT_TERRAIN_DOWNSCALE: u32 = 4;
/// Worlds-Verzeichnis einer Standard-Installation.
pub const DEFAULT_WORLDS_DIR: &str = "~/.sa/Stationeers/rocketstation_Data/StreamingAssets/Worlds";
/// Name der Optionen-Datei neben der Binary.
pub const CONFIG_FILE_NAME: &str = "stationeers_map_data.toml";

// ── Welten ──────────────────────────────────────────────────────────

/// Eine zu verarbeitende Welt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldEntry {
    /// Anzeigename, klein geschrieben auch Dateiname der Ausgabe
    pub name: String,
    /// Verzeichnis unter dem Worlds-Verzeichnis
    pub dir: String,
    /// Dateiname der Welt-XML
    pub xml: String,
    /// Ersetzung `(von, nach)` im Normal-Map-Pfad
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_path_rewrite: Option<(String, String)>,
}

impl WorldEntry {
    pub fn new(name: &str, dir: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            dir: dir.to_string(),
            xml: xml.to_string(),
            normal_path_rewrite: None,
        }
    }

    /// Dateiname der Ausgabe ohne Endung.
    pub fn output_stem(&self) -> String {
        self.name.to_lowercase()
    }

    /// Wendet die konfigurierte Ersetzung auf den Normal-Map-Pfad an.
    pub fn rewrite_normal_path(&self, path: &str) -> String {
        match &self.normal_path_rewrite {
            Some((from, to)) => path.replace(from.as_str(), to),
            None => path.to_string(),
        }
    }
}

/// Die Stock-Welten von Stationeers.
pub fn default_worlds() -> Vec<WorldEntry> {
    // Venus verweist in der XML auf die Mars-Normal-Map
    let mut venus = WorldEntry::new("Venus", "Venus", "Venus.xml");
    venus.normal_path_rewrite = Some(("Mars".to_string(), "Venus".to_string()));

    vec![
        WorldEntry::new("Europa", "Europa", "Europa.xml"),
        WorldEntry::new("Vulcan", "Vulcan", "Vulcan.xml"),
        WorldEntry::new("Mars", "Mars2", "Mars2.xml"),
        venus,
        WorldEntry::new("Mimas", "Mimas", "MimasHerschel.xml"),
        WorldEntry::new("Lunar", "Lunar", "Lunar.xml"),
    ]
}

// ── Laufzeit-Optionen (serialisierbar) ─────────────────────────────

/// Alle Builder-Optionen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuilderOptions {
    /// Zielverzeichnis
    pub output_dir: PathBuf,
    /// Snapping-Toleranz der Topologie im Einheitsquadrat
    pub topology_tolerance: f64,
    /// Verkleinerungsfaktor für das Terrain-Bild
    pub terrain_downscale: u32,
    /// Mining-Flächen ohne Katalog-Farbe behalten
    pub retain_unmatched_mining: bool,
    /// Terrain-Bild erzeugen
    pub write_terrain: bool,
    /// Zu verarbeitende Welten in Reihenfolge
    pub worlds: Vec<WorldEntry>,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            topology_tolerance: region_topology::DEFAULT_TOLERANCE,
            terrain_downscale: DEFAULT_TERRAIN_DOWNSCALE,
            retain_unmatched_mining: true,
            write_terrain: true,
            worlds: default_worlds(),
        }
    }
}

impl BuilderOptions {
    /// Lädt Optionen aus einer TOML-Datei, Fallback auf Standardwerte.
    pub fn load_from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(opts) => {
                    log::info!("Optionen geladen aus: {}", path.display());
                    opts
                }
                Err(e) => {
                    log::warn!("Optionen-Datei fehlerhaft, verwende Standardwerte: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Keine Optionen-Datei gefunden, verwende Standardwerte");
                Self::default()
            }
        }
    }

    /// Ermittelt den Pfad zur Optionen-Datei neben der Binary.
    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .unwrap_or_else(|_| PathBuf::from("Stationeers-Map-Data"))
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(CONFIG_FILE_NAME)
    }

    /// Welten, deren Name in `filter` vorkommt (ohne Groß-/Kleinschreibung).
    ///
    /// Leerer Filter: alle Welten.
    pub fn selected_worlds(&self, filter: &[String]) -> Vec<&WorldEntry> {
        for name in filter {
            if !self.worlds.iter().any(|w| w.name.eq_ignore_ascii_case(name)) {
                log::warn!("Unbekannte Welt '{}' im Filter", name);
            }
        }
        self.worlds
            .iter()
            .filter(|w| {
                filter.is_empty() || filter.iter().any(|f| w.name.eq_ignore_ascii_case(f))
            })
            .collect()
    }
}

/// Ersetzt ein führendes `~` durch das Home-Verzeichnis.
pub fn expand_home(path: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_worlds() {
        let options = BuilderOptions::default();
        let names: Vec<&str> = options.worlds.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Europa", "Vulcan", "Mars", "Venus", "Mimas", "Lunar"]);
        assert_eq!(options.worlds[2].dir, "Mars2");
        assert_eq!(options.worlds[4].xml, "MimasHerschel.xml");
    }

    #[test]
    fn test_venus_normal_rewrite() {
        let options = BuilderOptions::default();
        let venus = &options.worlds[3];
        assert_eq!(
            venus.rewrite_normal_path("Worlds/Mars2/Textures/MarsNormal.png"),
            "Worlds/Venus2/Textures/VenusNormal.png"
        );
        assert_eq!(venus.output_stem(), "venus");
        assert_eq!(
            options.worlds[0].rewrite_normal_path("Europa/normal.png"),
            "Europa/normal.png"
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            output_dir = "out"
            write_terrain = false

            [[worlds]]
            name = "Mars"
            dir = "Mars2"
            xml = "Mars2.xml"
        "#;
        let options: BuilderOptions = toml::from_str(toml_str).unwrap();
        assert_eq!(options.output_dir, PathBuf::from("out"));
        assert!(!options.write_terrain);
        assert_eq!(options.worlds.len(), 1);
        assert_eq!(options.worlds[0].normal_path_rewrite, None);
        assert_eq!(options.terrain_downscale, DEFAULT_TERRAIN_DOWNSCALE);
        assert_eq!(options.topology_tolerance, region_topology::DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_defaults_survive_toml() {
        let options = BuilderOptions::default();
        let content = toml::to_string_pretty(&options).unwrap();
        let parsed: BuilderOptions = toml::from_str(&content).unwrap();
        assert_eq!(parsed, options);
    }

    #[test]
    fn test_selected_worlds() {
        let options = BuilderOptions::default();
        assert_eq!(options.selected_worlds(&[]).len(), 6);

        let filter = vec!["mars".to_string(), "LUNAR".to_string(), "Titan".to_string()];
        let names: Vec<&str> = options
            .selected_worlds(&filter)
            .iter()
            .map(|w| w.name.as_str())
            .collect();
        assert_eq!(names, vec!["Mars", "Lunar"]);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let options = BuilderOptions::load_from_file(Path::new("/nonexistent/options.toml"));
        assert_eq!(options, BuilderOptions::default());
    }

    #[test]
    fn test_expand_home_keeps_plain_paths() {
        assert_eq!(expand_home("/data/Worlds"), PathBuf::from("/data/Worlds"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
    }
}
