// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parallel search basics.
//!
//! Four ranks each own a column of unit boxes; every rank scatters points
//! across the whole column, including some on faces shared between ranks.
//! The search is configured from JSON, as a host application would load it.
//!
//! Run:
//! - `cargo run -p proxima_demos --example parallel_search_basics`
//! - `RUST_LOG=proxima_search=debug cargo run -p proxima_demos --example parallel_search_basics`

use proxima_comm::{Communicator, LocalGroup};
use proxima_search::{
    BasicEntitySet, BasicGeometryLocalMap, Entity, EntitySet, LocalEntityPredicate, ParallelSearch,
    SearchConfig,
};
use tracing_subscriber::EnvFilter;

const CONFIG: &str =
    r#"{ "tolerance": 1e-6, "range_dimension": "Node", "track_missed_range_entities": true }"#;

const RANKS: usize = 4;
const BOXES_PER_RANK: u64 = 3;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_thread_names(true)
        .init();

    let config: SearchConfig = serde_json::from_str(CONFIG).expect("configuration is valid JSON");

    let reports = LocalGroup::new(RANKS)
        .run(|comm| {
            let rank = comm.rank();
            let mut domain = BasicEntitySet::new(rank);
            for i in 0..BOXES_PER_RANK {
                let id = rank as u64 * BOXES_PER_RANK + i;
                let z = id as f64;
                domain.add_entity(Entity::boxed(id, rank, [0.0, 0.0, z], [1.0, 1.0, z + 1.0]));
            }

            // Points at quarter heights; every fourth one sits on a face.
            let mut range = BasicEntitySet::new(rank);
            let column = (RANKS as u64 * BOXES_PER_RANK) as f64;
            for i in 0..6_u64 {
                let z = (rank as f64 * 0.25 + i as f64 * 2.5) % (column + 1.0);
                let id = 100 * rank as u64 + i;
                range.add_entity(Entity::point(id, rank, [0.5, 0.5, z], false));
            }

            let map = BasicGeometryLocalMap;
            let local = LocalEntityPredicate::new(rank);
            let owned = domain.entity_iterator(None, local);
            let mut search = ParallelSearch::new(&comm, owned, &map, config.clone())?;
            search.search(range.entity_iterator(None, local), &map)?;

            let mut lines = Vec::new();
            for b in domain.entities() {
                for r in search.range_entities_from_domain(b.id()) {
                    let coords = search.range_parametric_coordinates_in_domain(b.id(), r)?;
                    let owner = search.range_entity_owner_rank(r)?;
                    lines.push(format!(
                        "rank {rank}: box {} holds point {r} (owner {owner}) at {coords:?}",
                        b.id()
                    ));
                }
            }
            for r in search.missed_range_entities() {
                lines.push(format!("rank {rank}: point {r} is outside every box"));
            }
            Ok::<_, proxima_search::SearchError>(lines)
        })
        .expect("no rank panicked");

    for report in reports {
        match report {
            Ok(lines) => lines.iter().for_each(|l| println!("{l}")),
            Err(e) => eprintln!("search failed: {e}"),
        }
    }
}
