//! Label-Raster aus einem Farbbild.
//!
//! Jede im Bild vorkommende Farbe bekommt ein Label `1..=K`
//! (sortiert nach `(R, G, B)`), `0` ist für "keine Farbe" reserviert.
//! Farben müssen exakt passen, es gibt keine Toleranz.

use anyhow::{Result, ensure};
use image::RgbImage;
use std::collections::HashMap;

use crate::palette::Rgb;

/// Label → Originalfarbe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelColors {
    /// `colors[label - 1]`
    colors: Vec<Rgb>,
}

impl LabelColors {
    /// Farbe zu einem Label (`None` für 0 oder unbekannte Labels).
    pub fn get(&self, label: u32) -> Option<Rgb> {
        let index = (label as usize).checked_sub(1)?;
        self.colors.get(index).copied()
    }

    /// Anzahl vergebener Labels (`K`).
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Iteriert `(label, farbe)` in Label-Reihenfolge.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Rgb)> + '_ {
        self.colors
            .iter()
            .enumerate()
            .map(|(i, &color)| (i as u32 + 1, color))
    }
}

/// Integer-Raster mit einem Label pro Pixel, zeilenweise gespeichert.
#[derive(Debug, Clone)]
pub struct LabelRaster {
    width: u32,
    height: u32,
    labels: Vec<u32>,
    colors: LabelColors,
}

impl LabelRaster {
    /// Zählt die Farben des Bildes und vergibt die Labels.
    ///
    /// # Fehler
    /// Leeres Bild (Breite oder Höhe 0).
    pub fn from_image(image: &RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        ensure!(
            width > 0 && height > 0,
            "Leeres Regions-Raster ({}x{})",
            width,
            height
        );

        let mut colors: Vec<Rgb> = image.pixels().map(|p| p.0).collect();
        colors.sort_unstable();
        colors.dedup();

        let index: HashMap<Rgb, u32> = colors
            .iter()
            .enumerate()
            .map(|(i, &color)| (color, i as u32 + 1))
            .collect();

        // Jeder Pixel trifft genau eine der gerade gezählten Farben
        let labels: Vec<u32> = image
            .pixels()
            .map(|p| index.get(&p.0).copied().unwrap_or(0))
            .collect();

        log::debug!(
            "Label-Raster {}x{}: {} Farben",
            width,
            height,
            colors.len()
        );

        Ok(Self {
            width,
            height,
            labels,
            colors: LabelColors { colors },
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Label an Pixel `(x, y)`. Kein Bounds-Check über die Rasterbreite hinaus.
    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.labels[y as usize * self.width as usize + x as usize]
    }

    /// Label an `(x, y)` oder `None` außerhalb des Rasters.
    pub fn get_checked(&self, x: i64, y: i64) -> Option<u32> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(self.get(x as u32, y as u32))
    }

    /// Alle Labels zeilenweise.
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn colors(&self) -> &LabelColors {
        &self.colors
    }

    /// Gibt das Raster frei und behält nur die Label → Farbe Zuordnung.
    pub fn into_colors(self) -> LabelColors {
        self.colors
    }
}
