//! Benchmarks for triangulation construction and queries.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use delaunum::prelude::*;

fn grid_vertices(n: usize) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(n * n);
    for j in 0..n {
        for i in 0..n {
            vertices.push(Vertex::new(i as f64, j as f64, 0.0, j * n + i));
        }
    }
    vertices
}

/// A deterministic low-discrepancy scattering of points, so benches do
/// not depend on an RNG.
fn scattered_vertices(n: usize) -> Vec<Vertex> {
    let phi = 0.618_033_988_749_894_9_f64;
    let mut vertices = Vec::with_capacity(n);
    for i in 0..n {
        let x = (i as f64 * phi).fract() * 100.0;
        let y = (i as f64 * phi * phi).fract() * 100.0;
        vertices.push(Vertex::new(x, y, 0.0, i));
    }
    vertices
}

fn bench_insertion(c: &mut Criterion) {
    let grid = grid_vertices(32);
    c.bench_function("insert_grid_32x32", |b| {
        b.iter_batched(
            IncrementalTin::new,
            |mut tin| {
                tin.add_all(&grid, None).unwrap();
                tin
            },
            BatchSize::SmallInput,
        )
    });

    let scattered = scattered_vertices(1000);
    c.bench_function("insert_scattered_1k", |b| {
        b.iter_batched(
            IncrementalTin::new,
            |mut tin| {
                tin.add_all(&scattered, None).unwrap();
                tin
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_point_location(c: &mut Criterion) {
    let mut tin = IncrementalTin::new();
    tin.add_all(&scattered_vertices(1000), None).unwrap();

    let mut k = 0usize;
    c.bench_function("is_point_inside_1k", |b| {
        b.iter(|| {
            k = (k + 17) % 100;
            tin.is_point_inside_tin(k as f64, ((k * 31) % 100) as f64)
        })
    });
}

fn bench_triangle_survey(c: &mut Criterion) {
    let mut tin = IncrementalTin::new();
    tin.add_all(&grid_vertices(32), None).unwrap();

    c.bench_function("count_triangles_32x32", |b| b.iter(|| tin.count_triangles()));
}

fn bench_voronoi(c: &mut Criterion) {
    let sites = scattered_vertices(500);
    c.bench_function("voronoi_500_sites", |b| {
        b.iter(|| BoundedVoronoi::from_vertices(&sites, &BoundedVoronoiOptions::default()).unwrap())
    });
}

criterion_group!(
    benches,
    bench_insertion,
    bench_point_location,
    bench_triangle_survey,
    bench_voronoi
);
criterion_main!(benches);
