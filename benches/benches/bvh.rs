// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use proxima_index::{Aabb3, Bvh, distance_squared};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1_u64 << 53) as f64)
    }
}

/// `n^3` unit cells tiling a cube.
fn gen_lattice_cells(n: usize) -> Vec<(u32, Aabb3)> {
    let mut out = Vec::with_capacity(n * n * n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let min = [x as f64, y as f64, z as f64];
                let max = [min[0] + 1.0, min[1] + 1.0, min[2] + 1.0];
                out.push((out.len() as u32, Aabb3::new(min, max)));
            }
        }
    }
    out
}

fn gen_random_boxes(count: usize, extent: f64, size: f64, seed: u64) -> Vec<(u32, Aabb3)> {
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|i| {
            let min = [
                rng.next_f64() * extent,
                rng.next_f64() * extent,
                rng.next_f64() * extent,
            ];
            let max = [min[0] + size, min[1] + size, min[2] + size];
            (i as u32, Aabb3::new(min, max))
        })
        .collect()
}

fn gen_points(count: usize, extent: f64, seed: u64) -> Vec<[f64; 3]> {
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|_| {
            [
                rng.next_f64() * extent,
                rng.next_f64() * extent,
                rng.next_f64() * extent,
            ]
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for &n in &[16_usize, 32, 48] {
        let cells = gen_lattice_cells(n);
        group.throughput(Throughput::Elements(cells.len() as u64));
        group.bench_function(format!("lattice_n{n}"), |b| {
            b.iter_batched(
                || cells.clone(),
                |cells| black_box(Bvh::build(cells).map(|t| t.len())),
                BatchSize::LargeInput,
            )
        });
    }
    let boxes = gen_random_boxes(100_000, 1000.0, 4.0, 0xCAFE_F00D_DEAD_BEEF);
    group.throughput(Throughput::Elements(boxes.len() as u64));
    group.bench_function("random_100k", |b| {
        b.iter_batched(
            || boxes.clone(),
            |boxes| black_box(Bvh::build(boxes).map(|t| t.len())),
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let cells = gen_lattice_cells(32);
    let tree = Bvh::build(cells.iter().copied()).expect("lattice cells are valid");
    let points = gen_points(1024, 32.0, 0xBADC_F00D_1234_5678);
    group.throughput(Throughput::Elements(points.len() as u64));
    group.bench_function("point_in_lattice_bvh", |b| {
        b.iter(|| {
            let hits: usize = points
                .iter()
                .map(|p| tree.query(&Aabb3::from_point(*p).expanded(1e-6)).count())
                .sum();
            black_box(hits)
        })
    });
    group.bench_function("point_in_lattice_scan", |b| {
        b.iter(|| {
            let hits: usize = points
                .iter()
                .map(|p| {
                    let q = Aabb3::from_point(*p).expanded(1e-6);
                    cells.iter().filter(|(_, c)| c.intersects(&q)).count()
                })
                .sum();
            black_box(hits)
        })
    });
    group.finish();
}

fn bench_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest");
    let sources: Vec<(u32, Aabb3)> = gen_points(20_000, 100.0, 0xC1A5_7E55_9999_ABCD)
        .into_iter()
        .enumerate()
        .map(|(i, p)| (i as u32, Aabb3::from_point(p)))
        .collect();
    let tree = Bvh::build(sources.iter().copied()).expect("points are valid");
    let targets = gen_points(256, 100.0, 0xFACE_FEED_CAFE_BABE);
    for &k in &[1_usize, 8, 32] {
        group.throughput(Throughput::Elements(targets.len() as u64));
        group.bench_function(format!("bvh_k{k}"), |b| {
            b.iter(|| {
                for t in &targets {
                    black_box(tree.nearest(t, k));
                }
            })
        });
    }
    group.bench_function("scan_k8", |b| {
        b.iter(|| {
            for t in &targets {
                let mut all: Vec<(f64, u32)> = sources
                    .iter()
                    .map(|(id, s)| (distance_squared(&s.min, t), *id))
                    .collect();
                all.select_nth_unstable_by(8, |a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                black_box(&all[..8]);
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_build, bench_query, bench_nearest);
criterion_main!(benches);
