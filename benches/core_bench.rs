use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgb, RgbImage};
use region_topology::{
    build_world_regions, vectorize, LabelRaster, LayerSource, RegionDefinition, DEFAULT_TOLERANCE,
};
use stationeers_map_data::parse_world_document;
use std::hint::black_box;

fn bench_xml_parsing(c: &mut Criterion) {
    let xml_content = include_str!("../tests/fixtures/world_minimal.xml");

    c.bench_function("xml_parse_world_minimal", |b| {
        b.iter(|| {
            let doc = parse_world_document(black_box(xml_content)).expect("XML parse failed");
            black_box(doc.region_sets.len())
        })
    });
}

/// Synthetisches Regions-Raster: Zellen aus 16x16-Blöcken, Farben zyklisch.
fn build_synthetic_raster(size: u32, colors: u8) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        let cell = ((x / 16) * 7 + (y / 16) * 13) % colors as u32;
        let v = (cell as u8).wrapping_mul(37);
        Rgb([v, 255 - v, cell as u8])
    })
}

fn synthetic_regions(colors: u8) -> Vec<RegionDefinition> {
    (0..colors)
        .map(|cell| {
            let v = cell.wrapping_mul(37);
            RegionDefinition::new(format!("BenchRegion{}", cell), [v, 255 - v, cell])
        })
        .collect()
}

fn bench_vectorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("vectorize");

    for &size in &[256u32, 1024u32] {
        let raster = LabelRaster::from_image(&build_synthetic_raster(size, 6))
            .expect("Raster-Erzeugung fehlgeschlagen");

        group.bench_with_input(BenchmarkId::new("labels", size), &raster, |b, raster| {
            b.iter(|| black_box(vectorize(black_box(raster)).len()))
        });
    }

    group.finish();
}

fn bench_world_regions(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_regions");
    group.sample_size(10);

    for &size in &[256u32, 512u32] {
        let layers: Vec<LayerSource> = ["mining", "poi", "names"]
            .iter()
            .enumerate()
            .map(|(i, name)| LayerSource {
                name: name.to_string(),
                image: build_synthetic_raster(size, 4 + i as u8),
                regions: synthetic_regions(4 + i as u8),
                retain_unmatched: i == 0,
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("topology", size), &layers, |b, layers| {
            b.iter(|| {
                let topology = build_world_regions(black_box(layers.clone()), DEFAULT_TOLERANCE)
                    .expect("Topologie fehlgeschlagen");
                black_box(topology.arcs.len())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_xml_parsing,
    bench_vectorize,
    bench_world_regions
);
criterion_main!(benches);
