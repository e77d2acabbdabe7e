//! Parser für Stationeers-Welt-XML.
//!
//! Liest nur die Knoten, die für die Kartendaten gebraucht werden:
//! `RegionSet` (Textur + Regionen), `StartLocation` (Position) und den
//! Normal-Map-Pfad unter `MaterialSettings` → `Macro` → `Normal`.

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use region_topology::RegionDefinition;
use std::collections::HashMap;

/// Ein `RegionSet` mit Textur und Regions-Katalog.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSet {
    pub id: String,
    /// Pfad der Regions-Textur relativ zum Asset-Verzeichnis
    pub texture_path: Option<String>,
    /// Regionen in Dokument-Reihenfolge
    pub regions: Vec<RegionDefinition>,
}

/// Startpunkt mit Position.
#[derive(Debug, Clone, PartialEq)]
pub struct StartLocation {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// Relevanter Inhalt einer Welt-XML.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldDocument {
    pub region_sets: Vec<RegionSet>,
    /// Nur Startpunkte mit `Position`
    pub start_locations: Vec<StartLocation>,
    /// Erster `Normal Path` unter `MaterialSettings` → `Macro`
    pub normal_map_path: Option<String>,
}

/// Parst eine Welt-XML aus einem String.
pub fn parse_world_document(xml_content: &str) -> Result<WorldDocument> {
    let mut reader = Reader::from_str(xml_content);
    reader.config_mut().trim_text(true);

    let mut parser = WorldParser::default();
    let mut buffer = Vec::new();

    loop {
        match reader.read_event_into(&mut buffer) {
            Ok(Event::Start(ref e)) => parser.open(e)?,
            Ok(Event::Empty(ref e)) => {
                parser.open(e)?;
                parser.close(e.name().as_ref());
            }
            Ok(Event::End(ref e)) => parser.close(e.name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => bail!(
                "XML-Fehler an Position {}: {}",
                reader.buffer_position(),
                e
            ),
            _ => {}
        }
        buffer.clear();
    }

    let document = parser.finish();
    log::debug!(
        "Welt-XML: {} RegionSets, {} Startpunkte, Normal-Map: {:?}",
        document.region_sets.len(),
        document.start_locations.len(),
        document.normal_map_path
    );
    Ok(document)
}

/// Zustand beim Durchlaufen der Events.
#[derive(Default)]
struct WorldParser {
    document: WorldDocument,
    /// Offenes `RegionSet` mit Verschachtelungstiefe beim Öffnen
    region_set: Option<(RegionSet, usize)>,
    /// Offene `StartLocation`: Id, Tiefe, erste Position
    start_location: Option<(String, usize, Option<(f64, f64)>)>,
    material_depth: Option<usize>,
    macro_depth: Option<usize>,
    depth: usize,
}

impl WorldParser {
    fn open(&mut self, e: &BytesStart) -> Result<()> {
        self.depth += 1;
        let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();

        match tag.as_str() {
            "RegionSet" => {
                let attrs = read_attributes(e)?;
                let id = required(&attrs, "Id", &tag)?;
                if self.region_set.is_some() {
                    log::warn!("Verschachteltes RegionSet '{}' ignoriert", id);
                } else {
                    let set = RegionSet {
                        id,
                        texture_path: None,
                        regions: Vec::new(),
                    };
                    self.region_set = Some((set, self.depth));
                }
            }
            "Texture" => {
                if let Some((set, _)) = self.region_set.as_mut() {
                    if set.texture_path.is_none() {
                        let attrs = read_attributes(e)?;
                        set.texture_path = Some(required(&attrs, "Path", &tag)?);
                    }
                }
            }
            "Region" => {
                if let Some((set, _)) = self.region_set.as_mut() {
                    let attrs = read_attributes(e)?;
                    let id = required(&attrs, "Id", &tag)?;
                    let channel = |name: &str| -> Result<u8> {
                        let value = required(&attrs, name, &tag)?;
                        value.trim().parse::<u8>().with_context(|| {
                            format!("Region '{}': ungültiger Farbwert {}='{}'", id, name, value)
                        })
                    };
                    let color = [channel("R")?, channel("G")?, channel("B")?];
                    set.regions.push(RegionDefinition::new(id, color));
                }
            }
            "StartLocation" => {
                let attrs = read_attributes(e)?;
                let id = required(&attrs, "Id", &tag)?;
                self.start_location = Some((id, self.depth, None));
            }
            "Position" => {
                if let Some((id, _, position @ None)) = self.start_location.as_mut() {
                    let attrs = read_attributes(e)?;
                    let coord = |name: &str| -> Result<f64> {
                        let value = required(&attrs, name, &tag)?;
                        value.trim().parse::<f64>().with_context(|| {
                            format!(
                                "StartLocation '{}': ungültige Koordinate {}='{}'",
                                id, name, value
                            )
                        })
                    };
                    *position = Some((coord("x")?, coord("y")?));
                }
            }
            "MaterialSettings" => {
                if self.material_depth.is_none() {
                    self.material_depth = Some(self.depth);
                }
            }
            "Macro" => {
                if self.material_depth.is_some() && self.macro_depth.is_none() {
                    self.macro_depth = Some(self.depth);
                }
            }
            "Normal" => {
                if self.macro_depth.is_some() && self.document.normal_map_path.is_none() {
                    let attrs = read_attributes(e)?;
                    self.document.normal_map_path = attrs.get("Path").cloned();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"RegionSet" if self.region_set.as_ref().is_some_and(|(_, d)| *d == self.depth) => {
                if let Some((set, _)) = self.region_set.take() {
                    self.document.region_sets.push(set);
                }
            }
            b"StartLocation"
                if self
                    .start_location
                    .as_ref()
                    .is_some_and(|(_, d, _)| *d == self.depth) =>
            {
                if let Some((id, _, position)) = self.start_location.take() {
                    match position {
                        Some((x, y)) => {
                            self.document.start_locations.push(StartLocation { id, x, y })
                        }
                        None => log::debug!("StartLocation '{}' ohne Position übersprungen", id),
                    }
                }
            }
            b"Macro" if self.macro_depth == Some(self.depth) => self.macro_depth = None,
            b"MaterialSettings" if self.material_depth == Some(self.depth) => {
                self.material_depth = None;
                self.macro_depth = None;
            }
            _ => {}
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn finish(mut self) -> WorldDocument {
        // Nicht geschlossene Elemente (abgeschnittenes Dokument) trotzdem übernehmen
        if let Some((set, _)) = self.region_set.take() {
            self.document.region_sets.push(set);
        }
        if let Some((id, _, Some((x, y)))) = self.start_location.take() {
            self.document.start_locations.push(StartLocation { id, x, y });
        }
        self.document
    }
}

fn read_attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn required(attrs: &HashMap<String, String>, key: &str, tag: &str) -> Result<String> {
    attrs
        .get(key)
        .cloned()
        .ok_or_else(|| anyhow!("<{}> ohne Attribut '{}'", tag, key))
}
