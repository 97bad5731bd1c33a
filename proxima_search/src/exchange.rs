// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Group-wide bounding box exchange.
//!
//! Both functions are blocking collectives over every rank of `comm`. A rank
//! that never calls them leaves the rest of the group waiting.

use proxima_comm::Communicator;
use proxima_comm::collective::all_gather;
use proxima_index::{Aabb3, Point, union_all};
use tracing::debug;

use crate::error::Result;

/// Wire form of an optional box; `Aabb3` itself stays free of `serde`.
pub(crate) type WireBox = Option<(Point<3>, Point<3>)>;

pub(crate) fn to_wire(b: Option<Aabb3>) -> WireBox {
    b.map(|b| (b.min, b.max))
}

pub(crate) fn from_wire(w: WireBox) -> Option<Aabb3> {
    w.map(|(min, max)| Aabb3::new(min, max))
}

/// Every rank's `local` box, indexed by rank.
pub fn gather_bounding_boxes<C>(comm: &C, local: Option<Aabb3>) -> Result<Vec<Option<Aabb3>>>
where
    C: Communicator + ?Sized,
{
    let all = all_gather(comm, &to_wire(local))?;
    Ok(all.into_iter().map(from_wire).collect())
}

/// Union of every rank's `local` box. Identical on all ranks; `None` when no
/// rank contributes one.
pub fn global_bounding_box<C>(comm: &C, local: Option<Aabb3>) -> Result<Option<Aabb3>>
where
    C: Communicator + ?Sized,
{
    let global = union_all(gather_bounding_boxes(comm, local)?.into_iter().flatten());
    debug!(rank = comm.rank(), ?global, "global bounding box");
    Ok(global)
}
