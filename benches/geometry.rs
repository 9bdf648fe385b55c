//! Benchmarks for grid geometry, hit-testing and export.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gridslice::geometry::{compute_all_slices, CropThreshold};
use gridslice::render::{export_from_image, render_slice, ExportOptions};
use gridslice::types::{GridConfig, ImageDimensions, Offset, SliceId, SlicePartition, Unit};
use gridslice::{EditingSession, MapRecord};

fn session(width: f64, height: f64, cols: u32, rows: u32) -> EditingSession {
    let record = MapRecord {
        name: "bench".to_string(),
        cell_size: 10.0,
        unit: Unit::Mm,
        dpi: 300.0,
        grid_offset: Offset::new(17.0, 9.0),
        image_dimensions: Some(ImageDimensions::new(width, height)),
        split_cols: cols,
        split_rows: rows,
        ..MapRecord::default()
    };
    EditingSession::from_record(&record)
}

// -- Geometry benchmarks --

fn bench_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");

    let config = GridConfig::new(10.0, Unit::Mm).with_dpi(300.0).with_offset(17.0, 9.0);
    let image = ImageDimensions::new(12_000.0, 9_000.0);

    group.bench_function("all_slices_2x2", |b| {
        b.iter(|| {
            compute_all_slices(
                black_box(&config),
                &image,
                SlicePartition::new(2, 2),
                CropThreshold::default(),
                1.0,
            )
        })
    });

    group.bench_function("all_slices_20x20", |b| {
        b.iter(|| {
            compute_all_slices(
                black_box(&config),
                &image,
                SlicePartition::new(20, 20),
                CropThreshold::default(),
                300.0 / 96.0,
            )
        })
    });

    group.finish();
}

// -- Hit-test benchmarks --

fn bench_hit_test(c: &mut Criterion) {
    let mut group = c.benchmark_group("hit_test");

    let session = session(12_000.0, 9_000.0, 4, 3);
    let points: Vec<Offset> = (0..100)
        .map(|i| Offset::new(i as f64 * 130.0, i as f64 * 95.0))
        .collect();

    group.bench_function("sweep_100_points", |b| {
        b.iter(|| {
            points
                .iter()
                .filter_map(|p| session.hit(black_box(*p), 0.5))
                .count()
        })
    });

    group.finish();
}

// -- Export benchmarks --

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    group.sample_size(20);

    let session = session(600.0, 400.0, 2, 1);
    let source = image::RgbaImage::from_fn(600, 400, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    let options = ExportOptions {
        dpi: 300.0,
        reference_lines: true,
        ..ExportOptions::default()
    };

    group.bench_function("render_slice_300dpi", |b| {
        b.iter(|| render_slice(&session, black_box(&source), SliceId::new(0, 0), &options).unwrap())
    });

    let dynamic = image::DynamicImage::ImageRgba8(source.clone());
    group.bench_function("export_zip_2_slices", |b| {
        b.iter(|| export_from_image(&session, black_box(&dynamic), &options).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_geometry, bench_hit_test, bench_export);
criterion_main!(benches);
