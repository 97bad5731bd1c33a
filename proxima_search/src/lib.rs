// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Proxima Search: locate entities of one partitioned set inside another.
//!
//! Two entity sets are spread over the same group of ranks: *domain* entities
//! (cells, boxes) and *range* entities (points, nodes). A search finds, for
//! every range entity, every domain entity that contains it, wherever the two
//! live, without any rank holding the global geometry.
//!
//! - [`ParallelSearch`] indexes the local domain entities in a
//!   [`proxima_index::Bvh`] and resolves range entities shipped to it.
//! - [`exchange`] shares per-rank bounding boxes, the cheap filter deciding
//!   which ranks a range entity is sent to.
//! - [`CandidateDistributor`] routes items to those ranks with point-to-point
//!   messages and can forward any related payload along the same plan.
//! - [`Correspondence`] holds the verified matches, addressable by domain or
//!   range id.
//! - [`PointCloudPairing`] pairs target centers with nearby source centers
//!   from any rank, by radius or k-nearest.
//!
//! Geometry evaluation is passed in: a [`LocalMap`] maps physical points into
//! an entity's reference frame. [`BasicGeometryLocalMap`] covers points and
//! boxes.
//!
//! ## Minimal usage
//!
//! ```
//! use proxima_comm::{Communicator, LocalGroup};
//! use proxima_search::{BasicGeometryLocalMap, Entity, ParallelSearch, SearchConfig};
//!
//! // Rank r owns the unit box spanning z in [r, r + 1] and a point at its centre.
//! let found = LocalGroup::new(3)
//!     .run(|comm| {
//!         let r = comm.rank();
//!         let z = r as f64;
//!         let domain = [Entity::boxed(r as u64, r, [0.0, 0.0, z], [1.0, 1.0, z + 1.0])];
//!         let range = [Entity::point(10 + r as u64, r, [0.5, 0.5, z + 0.5], false)];
//!         let map = BasicGeometryLocalMap;
//!         let mut search =
//!             ParallelSearch::new(&comm, &domain, &map, SearchConfig::default()).unwrap();
//!         search.search(&range, &map).unwrap();
//!         search.domain_entities_from_range(10 + r as u64)
//!     })
//!     .unwrap();
//! assert_eq!(found, vec![vec![0], vec![1], vec![2]]);
//! ```
//!
//! ## Collective calls
//!
//! Constructing a [`ParallelSearch`] or a [`PointCloudPairing`], calling
//! [`ParallelSearch::search`], and the functions in [`exchange`] are
//! collective: every rank of the group calls them in the same order, even with
//! no entities.

pub mod candidates;
pub mod config;
pub mod correspondence;
pub mod entity;
pub mod entity_set;
pub mod error;
pub mod exchange;
pub mod local_map;
pub mod pairing;
pub mod search;

pub use candidates::CandidateDistributor;
pub use config::{PairingConfig, PairingMode, SearchConfig, SearchType};
pub use correspondence::{Correspondence, Record};
pub use entity::{Dimension, Entity, EntityFlags, EntityId, Shape};
pub use entity_set::{
    AllEntities, And, BasicEntitySet, DimensionPredicate, EntityIter, EntityPredicate, EntitySet,
    LocalEntityPredicate, SurfacePredicate,
};
pub use error::{Result, SearchError};
pub use exchange::{gather_bounding_boxes, global_bounding_box};
pub use local_map::{BasicGeometryLocalMap, LocalMap};
pub use pairing::PointCloudPairing;
pub use search::ParallelSearch;
