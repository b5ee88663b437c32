//! Benchmarks for the compositing stages.
//!
//! Run with: cargo bench --package compositor --bench compose_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flate2::Compression;
use image::{Rgba, RgbaImage};
use rand::Rng;

use compositor::{extract_region, png, upscale_nearest, Canvas, TileRaster};
use mosaic_common::{GridPos, PixelRect, ScaleFactor, TileCoord, TileGrid};
use test_utils::fixtures::PALETTE;

/// Tile drawn from a small palette, like the live map tiles.
fn palette_tile(edge: u32) -> RgbaImage {
    let mut rng = rand::thread_rng();
    RgbaImage::from_fn(edge, edge, |_, _| Rgba(PALETTE[rng.gen_range(0..PALETTE.len())]))
}

/// Tile with arbitrary colors, forcing the RGBA encoder.
fn noise_tile(edge: u32) -> RgbaImage {
    let mut rng = rand::thread_rng();
    RgbaImage::from_fn(edge, edge, |_, _| Rgba(rng.gen()))
}

fn grid(columns: u32, rows: u32) -> TileGrid {
    TileGrid {
        origin: TileCoord::new(0, 0),
        columns,
        rows,
    }
}

// =============================================================================
// CANVAS ASSEMBLY
// =============================================================================

fn bench_canvas_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("canvas_assembly");
    let edge = 1000;
    let tile = TileRaster::from_rgba(palette_tile(edge), edge);

    for (columns, rows) in [(1, 1), (2, 2), (3, 2)] {
        let cells = (columns * rows) as u64;
        group.throughput(Throughput::Bytes(cells * (edge as u64 * edge as u64 * 4)));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", columns, rows)),
            &(columns, rows),
            |b, &(columns, rows)| {
                b.iter(|| {
                    let mut canvas = Canvas::new(grid(columns, rows), edge).unwrap();
                    for row in 0..rows {
                        for col in 0..columns {
                            canvas.paste(GridPos::new(row, col), &tile).unwrap();
                        }
                    }
                    black_box(canvas.into_image())
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// CROP + UPSCALE
// =============================================================================

fn bench_crop_and_upscale(c: &mut Criterion) {
    let mut group = c.benchmark_group("crop_and_upscale");
    let canvas = palette_tile(2000);
    let rect = PixelRect {
        left: 500,
        upper: 500,
        right: 1200,
        lower: 1300,
    };

    group.bench_function("crop_700x800", |b| {
        b.iter(|| black_box(extract_region(black_box(&canvas), &rect).unwrap()))
    });

    let region = extract_region(&canvas, &rect).unwrap();
    for factor in [1u32, 2, 3] {
        let scale = ScaleFactor::new(factor).unwrap();
        group.bench_with_input(BenchmarkId::new("upscale", factor), &scale, |b, &scale| {
            b.iter(|| black_box(upscale_nearest(black_box(&region), scale).unwrap()))
        });
    }

    group.finish();
}

// =============================================================================
// PNG ENCODING
// =============================================================================

fn bench_png_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("png_encoding");
    group.sample_size(20);

    let indexed = palette_tile(1000);
    let rgba = noise_tile(1000);

    group.bench_function("indexed_best", |b| {
        b.iter(|| black_box(png::encode_png(&indexed, Compression::best()).unwrap()))
    });
    group.bench_function("indexed_fast", |b| {
        b.iter(|| black_box(png::encode_png(&indexed, Compression::fast()).unwrap()))
    });
    group.bench_function("rgba_fast", |b| {
        b.iter(|| black_box(png::encode_png(&rgba, Compression::fast()).unwrap()))
    });
    group.bench_function("build_palette", |b| {
        b.iter(|| black_box(png::build_palette(&indexed)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_canvas_assembly,
    bench_crop_and_upscale,
    bench_png_encoding
);
criterion_main!(benches);
