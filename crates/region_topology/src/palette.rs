//! Regions-Katalog und Anzeigenamen.
//!
//! Ordnet Regions-Farben (RGB) menschenlesbare Namen zu. Die Namen werden
//! aus den Katalog-IDs abgeleitet: gemeinsames Prefix aller IDs entfernen,
//! CamelCase in Wörter trennen, Whitespace trimmen.

use indexmap::IndexMap;
use std::collections::HashMap;

/// RGB-Farbwert
pub type Rgb = [u8; 3];

/// Ein Eintrag im Regions-Katalog eines Layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDefinition {
    /// Katalog-ID (z.B. `MiningRegionIron`)
    pub id: String,
    /// Exakte Farbe der Region im Raster
    pub color: Rgb,
}

impl RegionDefinition {
    pub fn new(id: impl Into<String>, color: Rgb) -> Self {
        Self {
            id: id.into(),
            color,
        }
    }
}

/// Farbe → Anzeigename für genau einen Regions-Layer.
#[derive(Debug, Clone, Default)]
pub struct PaletteTable {
    by_color: HashMap<Rgb, String>,
    by_id: IndexMap<String, String>,
}

impl PaletteTable {
    /// Baut die Tabelle aus den Katalog-Einträgen eines Layers.
    ///
    /// Bei doppelten Farben gewinnt der spätere Eintrag.
    pub fn from_definitions(definitions: &[RegionDefinition]) -> Self {
        let ids: Vec<&str> = definitions.iter().map(|d| d.id.as_str()).collect();
        let names = normalize_names(&ids);

        let mut by_color = HashMap::with_capacity(definitions.len());
        let mut by_id = IndexMap::with_capacity(definitions.len());
        for (definition, name) in definitions.iter().zip(names) {
            by_color.insert(definition.color, name.clone());
            by_id.insert(definition.id.clone(), name);
        }

        Self { by_color, by_id }
    }

    /// Anzeigename für eine Rasterfarbe.
    pub fn name_for(&self, color: Rgb) -> Option<&str> {
        self.by_color.get(&color).map(String::as_str)
    }

    /// Anzeigename für eine Katalog-ID.
    pub fn name_for_id(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// ID → Anzeigename in Katalog-Reihenfolge.
    pub fn id_names(&self) -> &IndexMap<String, String> {
        &self.by_id
    }

    pub fn len(&self) -> usize {
        self.by_color.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_color.is_empty()
    }
}

/// Leitet Anzeigenamen aus einer ID-Liste ab.
///
/// Das Ergebnis hängt von der gesamten Liste ab: das gemeinsame Prefix
/// wird über alle IDs bestimmt. Sind alle IDs identisch, sind alle Namen leer.
pub fn normalize_names<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let Some(first) = ids.first().map(AsRef::as_ref) else {
        return Vec::new();
    };

    let prefix_len = ids.iter().fold(first.len(), |len, id| {
        common_prefix_len(&first[..len], id.as_ref())
    });

    ids.iter()
        .map(|id| split_camel_case(id.as_ref()[prefix_len..].trim()))
        .collect()
}

/// Länge (in Bytes) des gemeinsamen Prefix zweier Strings.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()))
}

/// Fügt vor jedem Großbuchstaben ein Leerzeichen ein (`IronOre` → `Iron Ore`).
fn split_camel_case(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 8);
    for c in name.chars() {
        if c.is_uppercase() {
            spaced.push(' ');
        }
        spaced.push(c);
    }
    spaced.trim().to_string()
}

/// Formatiert eine Farbe als `#rrggbb`.
pub fn color_hex(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_common_prefix() {
        assert_eq!(normalize_names(&["AB_Foo", "AB_Bar"]), vec!["Foo", "Bar"]);
    }

    #[test]
    fn test_single_id_yields_empty_name() {
        assert_eq!(normalize_names(&["AB_Foo"]), vec![""]);
    }

    #[test]
    fn test_identical_ids_yield_empty_names() {
        assert_eq!(normalize_names(&["Same", "Same"]), vec!["", ""]);
    }

    #[test]
    fn test_rotation_invariant() {
        let ids = ["MiningIronOre", "MiningCopper", "MiningGold"];
        let rotated = ["MiningCopper", "MiningGold", "MiningIronOre"];
        let names = normalize_names(&ids);
        let rotated_names = normalize_names(&rotated);
        assert_eq!(names, vec!["Iron Ore", "Copper", "Gold"]);
        assert_eq!(rotated_names, vec!["Copper", "Gold", "Iron Ore"]);
    }

    #[test]
    fn test_camel_case_split() {
        // Gemeinsames Prefix ist "Region", Rest wird gespalten
        let names = normalize_names(&["RegionNorthPole", "RegionSouthBasin"]);
        assert_eq!(names, vec!["North Pole", "South Basin"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize_names::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_later_color_wins() {
        let table = PaletteTable::from_definitions(&[
            RegionDefinition::new("ZoneAlpha", [10, 20, 30]),
            RegionDefinition::new("ZoneBeta", [10, 20, 30]),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.name_for([10, 20, 30]), Some("Beta"));
        assert_eq!(table.name_for_id("ZoneAlpha"), Some("Alpha"));
        assert_eq!(table.name_for([0, 0, 0]), None);
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(color_hex([255, 0, 16]), "#ff0010");
    }
}
