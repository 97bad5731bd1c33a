// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Proxima Index: a linear-time bounding volume hierarchy.
//!
//! Proxima Index is the local building block of the Proxima distributed search.
//!
//! - Build a binary hierarchy over `(id, box)` items in one pass from Morton keys.
//! - Query every item overlapping a box, or every item within a radius of a point.
//! - Find the `k` items nearest to a point, ties broken by id.
//!
//! The tree is generic over the dimension `D` and the id type. It is rebuilt
//! rather than updated: construct it, query it, drop it.
//!
//! # Example
//!
//! ```rust
//! use proxima_index::{Aabb3, Bvh};
//!
//! let boxes = [
//!     (10_u64, Aabb3::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])),
//!     (11_u64, Aabb3::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0])),
//!     (12_u64, Aabb3::new([5.0, 5.0, 5.0], [6.0, 6.0, 6.0])),
//! ];
//! let bvh = Bvh::build(boxes).unwrap();
//!
//! // A point on the shared face touches both neighbours.
//! let mut hits: Vec<_> = bvh.query(&Aabb3::from_point([1.0, 0.5, 0.5])).collect();
//! hits.sort();
//! assert_eq!(hits, vec![10, 11]);
//!
//! // Nearest two boxes to a far corner.
//! assert_eq!(bvh.nearest(&[9.0, 9.0, 9.0], 2), vec![12, 11]);
//! ```
//!
//! ### Float semantics
//!
//! Volumes with NaN coordinates or `min > max` are rejected by [`Bvh::build`].
//! Boundaries are inclusive for every predicate.
//!
//! ### Features
//!
//! - `std` (default): data-parallel key computation, sorting and hierarchy
//!   generation through `rayon`. Without it the crate is `no_std` + `alloc`.

#![no_std]

extern crate alloc;

pub mod bvh;
pub mod error;
pub mod morton;
pub mod types;

pub use bvh::{Bvh, Neighbor};
pub use error::{IndexError, Result};
pub use types::{Aabb, Aabb3, Point, distance_squared, union_all};
