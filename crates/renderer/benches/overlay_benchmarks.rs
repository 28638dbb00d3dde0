//! Benchmarks for the two geo overlay strategies.
//!
//! Run with: cargo bench --package renderer --bench overlay_benchmarks

use climate_common::{GridExtent, ImageDimensions, SparseGrid};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use projection::GeoPoint;
use rand::Rng;
use renderer::colormap::{BivariateScheme, DEFAULT_BIVARIATE};
use renderer::overlay::build_renderer;
use renderer::{compute_tertiles, ColorField, MapViewport, OverlayStrategy};
use test_utils::{eastward_ramp, grid_from_fn};

/// A 100 km square of 1 km cells around the Thames valley.
fn bench_extent() -> GridExtent {
    GridExtent::new(399_500.0, 499_500.0, 119_500.0, 219_500.0, 1000.0).unwrap()
}

fn noisy_grid(extent: &GridExtent) -> SparseGrid {
    let mut rng = rand::thread_rng();
    let noise: Vec<f32> = (0..100 * 100).map(|_| rng.gen_range(0.0..50.0)).collect();
    grid_from_fn(extent, |col, row| noise[(row * 100 + col) as usize % noise.len()])
}

fn bench_tertiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("tertiles");
    let extent = bench_extent();
    let grid = noisy_grid(&extent);

    group.throughput(Throughput::Elements(grid.len() as u64));
    group.bench_function("10k_cells", |b| {
        b.iter(|| black_box(compute_tertiles(grid.values())));
    });
    group.finish();
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlay_strategy");
    group.sample_size(20);

    let extent = bench_extent();
    let field = ColorField::bivariate(
        &noisy_grid(&extent),
        &eastward_ramp(&extent, 0.0, 1.0),
        &BivariateScheme::new(DEFAULT_BIVARIATE),
    );
    let viewport = MapViewport::centered(GeoPoint::new(51.6, -1.3), 9.0, 512, 512);

    for size in [256u32, 512, 1024] {
        let renderer = build_renderer(
            OverlayStrategy::Bitmap,
            &extent,
            ImageDimensions {
                width: size,
                height: size,
            },
        )
        .unwrap();
        group.throughput(Throughput::Elements(size as u64 * size as u64));
        group.bench_with_input(BenchmarkId::new("bitmap", size), &size, |b, _| {
            b.iter(|| black_box(renderer.render(&field, None).unwrap()));
        });
    }

    let quads = build_renderer(
        OverlayStrategy::Quads,
        &extent,
        ImageDimensions {
            width: 1,
            height: 1,
        },
    )
    .unwrap();
    group.throughput(Throughput::Elements(field.len() as u64));
    group.bench_function("quads_project", |b| {
        b.iter(|| black_box(quads.render(&field, Some(&viewport)).unwrap()));
    });
    group.bench_function("quads_project_and_png", |b| {
        b.iter(|| {
            let output = quads.render(&field, Some(&viewport)).unwrap();
            black_box(output.to_png(0.7, Some(&viewport)).unwrap())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_tertiles, bench_strategies);
criterion_main!(benches);
