//! Terrain-Vorschau aus der Normal-Map einer Welt.
//!
//! Graustufen mit Gewichtung `0.21 R + 0.72 G + 0.07 B`, auf den vollen
//! Wertebereich gestreckt und verkleinert.

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage};
use std::path::Path;

/// Graustufen-Gewichte für R, G, B.
const LUMA_WEIGHTS: [f32; 3] = [0.21, 0.72, 0.07];

/// Erzeugt das verkleinerte Graustufen-Terrain.
///
/// Ein einfarbiges Bild ergibt ein schwarzes Terrain.
/// `downscale` teilt Breite und Höhe (ganzzahlig, mindestens 1 Pixel).
pub fn build_terrain(normals: &DynamicImage, downscale: u32) -> GrayImage {
    let rgb = normals.to_rgb8();
    let (width, height) = rgb.dimensions();

    let gray: Vec<f32> = rgb
        .pixels()
        .map(|p| {
            LUMA_WEIGHTS[0] * p[0] as f32
                + LUMA_WEIGHTS[1] * p[1] as f32
                + LUMA_WEIGHTS[2] * p[2] as f32
        })
        .collect();

    let min = gray.iter().copied().fold(f32::INFINITY, f32::min);
    let max = gray.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    let stretched: Vec<u8> = gray
        .iter()
        .map(|&g| {
            if range > 0.0 {
                ((g - min) / range * 255.0).clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect();

    let full = GrayImage::from_raw(width, height, stretched)
        .unwrap_or_else(|| GrayImage::new(width, height));

    let factor = downscale.max(1);
    if factor == 1 {
        return full;
    }
    let target_w = (width / factor).max(1);
    let target_h = (height / factor).max(1);
    image::imageops::resize(
        &full,
        target_w,
        target_h,
        image::imageops::FilterType::Lanczos3,
    )
}

/// Lädt die Normal-Map, baut das Terrain und speichert es.
///
/// Das Format folgt der Dateiendung von `target` (WebP für die Web-Ausgabe).
pub fn write_terrain(normal_map: &Path, target: &Path, downscale: u32) -> Result<()> {
    let normals = image::open(normal_map)
        .with_context(|| format!("Normal-Map nicht lesbar: {}", normal_map.display()))?;
    let terrain = build_terrain(&normals, downscale);

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Verzeichnis nicht anlegbar: {}", parent.display()))?;
    }
    let (width, height) = terrain.dimensions();
    // WebP-Encoder erwartet RGB(A)
    DynamicImage::ImageLuma8(terrain)
        .to_rgb8()
        .save(target)
        .with_context(|| format!("Terrain nicht speicherbar: {}", target.display()))?;

    log::info!(
        "Terrain gespeichert: {} ({}x{})",
        target.display(),
        width,
        height
    );
    Ok(())
}
