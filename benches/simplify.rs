//! Benchmarks for the clustering and simplification passes.

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::Point3;

use cairn::mesh::Mesh;
use cairn::partition::{build_clusters, GreedyPartitioner};
use cairn::simplify::{simplify_mesh, SimplifyOptions};

fn create_grid_mesh(n: usize) -> Mesh {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(i as f32, j as f32, 0.0));
        }
    }

    let mut faces = Vec::with_capacity(n * n * 2);
    for j in 0..n {
        for i in 0..n {
            let v00 = (j * (n + 1) + i) as u32;
            let v10 = v00 + 1;
            let v01 = v00 + (n as u32 + 1);
            let v11 = v01 + 1;
            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    Mesh::from_triangles("grid", vertices, &faces)
}

fn bench_simplify(c: &mut Criterion) {
    let mesh = create_grid_mesh(30); // 1800 triangles

    c.bench_function("simplify_grid_30_half", |b| {
        let options = SimplifyOptions::with_target(mesh.triangle_count() / 2);
        b.iter(|| simplify_mesh(&mesh, &options));
    });

    c.bench_function("simplify_grid_30_tenth", |b| {
        let options = SimplifyOptions::with_target(mesh.triangle_count() / 10);
        b.iter(|| simplify_mesh(&mesh, &options));
    });
}

fn bench_clustering(c: &mut Criterion) {
    let mesh = create_grid_mesh(30);

    c.bench_function("build_clusters_grid_30", |b| {
        b.iter(|| build_clusters(&mesh, 128, &GreedyPartitioner));
    });
}

criterion_group!(benches, bench_simplify, bench_clustering);
criterion_main!(benches);
