// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! BVH basics.
//!
//! Build a hierarchy over a small lattice of cells, then run overlap, radius
//! and nearest-neighbour queries.
//!
//! Run:
//! - `cargo run -p proxima_demos --example bvh_basics`
//! - `RUST_LOG=debug cargo run -p proxima_demos --example bvh_basics` to see build phases.

use proxima_index::{Aabb3, Bvh};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // A 4 x 4 x 4 lattice of unit cells; id = x + 4y + 16z.
    let mut cells = Vec::new();
    for z in 0..4_u32 {
        for y in 0..4_u32 {
            for x in 0..4_u32 {
                let min = [f64::from(x), f64::from(y), f64::from(z)];
                let max = [min[0] + 1.0, min[1] + 1.0, min[2] + 1.0];
                cells.push((x + 4 * y + 16 * z, Aabb3::new(min, max)));
            }
        }
    }
    let bvh = Bvh::build(cells).expect("lattice cells are well formed");
    println!("indexed {} cells, bounds {:?}", bvh.len(), bvh.bounds());

    // A point strictly inside one cell.
    let mut inside: Vec<u32> = bvh.query(&Aabb3::from_point([1.5, 2.5, 0.5])).collect();
    inside.sort_unstable();
    println!("cells containing (1.5, 2.5, 0.5): {inside:?}");

    // A lattice vertex touches the eight cells around it.
    let mut corner: Vec<u32> = bvh.query(&Aabb3::from_point([2.0, 2.0, 2.0])).collect();
    corner.sort_unstable();
    println!("cells touching (2, 2, 2): {corner:?}");

    let mut near: Vec<u32> = bvh.within_distance(&[-0.5, 0.5, 0.5], 0.75).collect();
    near.sort_unstable();
    println!("cells within 0.75 of (-0.5, 0.5, 0.5): {near:?}");

    for n in bvh.nearest_with_distance(&[6.0, 0.5, 0.5], 3) {
        println!(
            "nearest to (6, 0.5, 0.5): cell {} at distance {:.3}",
            n.id,
            n.distance_squared.sqrt()
        );
    }
}
