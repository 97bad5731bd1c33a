// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use proxima_comm::{Communicator, LocalGroup};
use proxima_search::{BasicGeometryLocalMap, Entity, ParallelSearch, SearchConfig};

/// Rank `r` owns an `n x n x n` block of unit boxes stacked along z, and
/// `n^3` points offset by half a block so half of them land on the next rank.
fn rank_inputs(rank: usize, n: usize) -> (Vec<Entity>, Vec<Entity>) {
    let z0 = (rank * n) as f64;
    let mut boxes = Vec::with_capacity(n * n * n);
    let mut points = Vec::with_capacity(n * n * n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let id = (rank * n * n * n + boxes.len()) as u64;
                let min = [x as f64, y as f64, z0 + z as f64];
                let max = [min[0] + 1.0, min[1] + 1.0, min[2] + 1.0];
                boxes.push(Entity::boxed(id, rank, min, max));
                let p = [min[0] + 0.25, min[1] + 0.75, min[2] + 0.5 * n as f64 + 0.5];
                points.push(Entity::point(id, rank, p, false));
            }
        }
    }
    (boxes, points)
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_search");
    group.sample_size(20);
    for &ranks in &[1_usize, 2, 4] {
        let n = 12;
        group.throughput(Throughput::Elements((ranks * n * n * n) as u64));
        group.bench_function(format!("ranks{ranks}_n{n}"), |b| {
            b.iter(|| {
                let records = LocalGroup::new(ranks)
                    .run(|comm| {
                        let (boxes, points) = rank_inputs(comm.rank(), n);
                        let map = BasicGeometryLocalMap;
                        let config = SearchConfig::default();
                        let mut search = ParallelSearch::new(&comm, &boxes, &map, config)
                            .expect("valid configuration");
                        search.search(&points, &map).expect("search completes");
                        search.correspondence().len()
                    })
                    .expect("no rank panics");
                black_box(records)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
