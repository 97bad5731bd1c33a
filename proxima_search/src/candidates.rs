// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Routing local query items to the ranks whose regions they can touch.

use proxima_comm::{Communicator, Distributor, Rank};
use proxima_index::{Aabb3, Point};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, debug_span};

use crate::error::Result;
use crate::exchange::gather_bounding_boxes;

/// A reusable plan sending each local item to every rank it may interact with.
///
/// One local item can be exported to several ranks. [`distribute`] takes one
/// value per local item and delivers a copy to every rank the item was routed
/// to. Imports are grouped by source rank in ascending order.
///
/// [`distribute`]: CandidateDistributor::distribute
#[derive(Debug)]
pub struct CandidateDistributor<'c, C: Communicator + ?Sized> {
    plan: Distributor<'c, C>,
    /// Local item index of every export, in plan order.
    exports: Vec<usize>,
    num_items: usize,
}

impl<'c, C: Communicator + ?Sized> CandidateDistributor<'c, C> {
    /// Route item `i` to every rank whose peer box overlaps `query_boxes[i]`.
    ///
    /// `peer_boxes` holds one entry per rank, `None` for ranks with nothing to
    /// match against. Collective.
    pub fn from_query_boxes(
        comm: &'c C,
        query_boxes: &[Aabb3],
        peer_boxes: &[Option<Aabb3>],
    ) -> Result<Self> {
        let _span = debug_span!("candidates_from_boxes", rank = comm.rank()).entered();
        Self::route(comm, query_boxes.len(), |i| {
            peer_boxes
                .iter()
                .enumerate()
                .filter(|(_, b)| b.is_some_and(|b| b.intersects(&query_boxes[i])))
                .map(|(r, _)| r)
                .collect()
        })
    }

    /// Send each source center to every rank whose target box, widened by
    /// `proximity`, contains it.
    ///
    /// Returns the plan and the source centers imported from every rank.
    /// Collective.
    pub fn from_centers(
        comm: &'c C,
        source_centers: &[Point<3>],
        target_centers: &[Point<3>],
        proximity: f64,
    ) -> Result<(Self, Vec<Point<3>>)> {
        let _span = debug_span!("candidates_from_centers", rank = comm.rank()).entered();
        let target_box = Aabb3::from_points(target_centers.iter().copied())
            .map(|b| b.expanded(proximity));
        let target_boxes = gather_bounding_boxes(comm, target_box)?;
        let plan = Self::route(comm, source_centers.len(), |i| {
            target_boxes
                .iter()
                .enumerate()
                .filter(|(_, b)| b.is_some_and(|b| b.contains_point(&source_centers[i])))
                .map(|(r, _)| r)
                .collect()
        })?;
        let imported = plan.distribute(source_centers)?;
        Ok((plan, imported))
    }

    fn route(comm: &'c C, num_items: usize, dests: impl Fn(usize) -> Vec<Rank>) -> Result<Self> {
        let mut exports = Vec::new();
        let mut export_ranks = Vec::new();
        for i in 0..num_items {
            for r in dests(i) {
                exports.push(i);
                export_ranks.push(r);
            }
        }
        let plan = Distributor::new(comm, &export_ranks)?;
        debug!(
            items = num_items,
            exports = exports.len(),
            imports = plan.num_imports(),
            "candidate routing"
        );
        Ok(Self {
            plan,
            exports,
            num_items,
        })
    }

    /// Number of local items the plan was built for.
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Number of (item, destination) pairs sent.
    pub fn num_exports(&self) -> usize {
        self.exports.len()
    }

    /// Number of items received.
    pub fn num_imports(&self) -> usize {
        self.plan.num_imports()
    }

    /// Source rank of every imported item, in import order.
    pub fn import_ranks(&self) -> Vec<Rank> {
        self.plan.import_ranks()
    }

    /// Deliver `values[i]` to every rank item `i` was routed to.
    ///
    /// `values` has one entry per local item. Collective.
    pub fn distribute<T>(&self, values: &[T]) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        if values.len() != self.num_items {
            return Err(proxima_comm::CommError::LengthMismatch {
                expected: self.num_items,
                actual: values.len(),
            }
            .into());
        }
        let expanded: Vec<T> = self.exports.iter().map(|&i| values[i].clone()).collect();
        Ok(self.plan.distribute(&expanded)?)
    }
}
