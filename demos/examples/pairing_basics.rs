// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point cloud pairing basics.
//!
//! Two ranks hold interleaved source and target clouds along a line. Each
//! rank pairs its targets with sources from both ranks, once by radius and
//! once by nearest neighbours.
//!
//! Run:
//! - `cargo run -p proxima_demos --example pairing_basics`

use proxima_comm::{Communicator, LocalGroup};
use proxima_search::{BasicGeometryLocalMap, Entity, PairingConfig, PointCloudPairing};
use tracing_subscriber::EnvFilter;

const NEAREST: &str = r#"{ "search_type": "Nearest Neighbor", "num_neighbors": 2 }"#;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let configs = [
        PairingConfig::radius(0.8),
        serde_json::from_str::<PairingConfig>(NEAREST).expect("configuration is valid JSON"),
    ];

    for config in &configs {
        println!("-- {} --", config.search_type);
        let reports = LocalGroup::new(2)
            .run(|comm| {
                let rank = comm.rank();
                let sources: Vec<Entity> = (0..5)
                    .map(|i| {
                        let x = (rank * 5 + i) as f64;
                        Entity::point(x as u64, rank, [x, 0.0, 0.0], false)
                    })
                    .collect();
                let targets: Vec<Entity> = (0..5)
                    .map(|i| {
                        let x = (rank * 5 + i) as f64 + 0.4;
                        Entity::point(100 + (rank * 5 + i) as u64, rank, [x, 0.0, 0.0], false)
                    })
                    .collect();
                let map = BasicGeometryLocalMap;
                let pairing =
                    PointCloudPairing::new(&comm, config, &sources, &map, &targets, &map)?;
                Ok::<_, proxima_search::SearchError>(
                    (0..pairing.num_parents())
                        .map(|i| {
                            format!(
                                "rank {rank}: target {} <- sources {:?} (support radius {:.2})",
                                pairing.parent_id(i),
                                pairing.child_global_ids(i),
                                pairing.parent_support_radius(i)
                            )
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .expect("no rank panicked");
        for report in reports {
            match report {
                Ok(lines) => lines.iter().for_each(|l| println!("{l}")),
                Err(e) => eprintln!("pairing failed: {e}"),
            }
        }
    }
}
