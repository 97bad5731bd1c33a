// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reusable point-to-point exchange plans.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, debug_span};

use crate::collective::{exchange_counts, recv_value, send_value};
use crate::communicator::{Communicator, Rank, Tag};
use crate::error::{CommError, Result};

/// A fixed routing of exported items to destination ranks.
///
/// Building the plan is collective: every rank states where each of its items
/// goes, and the group learns how many items each rank will receive from each
/// source. The plan is then reused for any number of payloads that follow the
/// same routing, such as ids and then coordinates for the same items.
///
/// Imports are grouped by source rank in ascending order. Within one source
/// they keep the exporting rank's order.
///
/// ```
/// use proxima_comm::{Communicator, Distributor, LocalGroup};
///
/// // Every rank sends one item to each rank, tagged with the pair.
/// let got = LocalGroup::new(3)
///     .run(|comm| {
///         let me = comm.rank();
///         let dests = [2, 1, 0];
///         let plan = Distributor::new(&comm, &dests).unwrap();
///         let items: Vec<_> = dests.iter().map(|d| (me, *d)).collect();
///         plan.distribute(&items).unwrap()
///     })
///     .unwrap();
/// assert_eq!(got[1], vec![(0, 1), (1, 1), (2, 1)]);
/// ```
#[derive(Debug)]
pub struct Distributor<'c, C: Communicator + ?Sized> {
    comm: &'c C,
    /// Export positions, stable-sorted by destination rank.
    order: Vec<usize>,
    send_counts: Vec<usize>,
    recv_counts: Vec<usize>,
}

impl<'c, C: Communicator + ?Sized> Distributor<'c, C> {
    /// Build a plan in which local item `i` is sent to `export_ranks[i]`.
    ///
    /// Collective. Fails with [`CommError::InvalidRank`] before any message is
    /// sent if a destination is outside the group.
    pub fn new(comm: &'c C, export_ranks: &[Rank]) -> Result<Self> {
        let size = comm.size();
        let _span = debug_span!(
            "distributor_plan",
            rank = comm.rank(),
            exports = export_ranks.len()
        )
        .entered();
        let mut send_counts = vec![0; size];
        for &dest in export_ranks {
            let slot = send_counts
                .get_mut(dest)
                .ok_or(CommError::InvalidRank { rank: dest, size })?;
            *slot += 1;
        }
        let mut order: Vec<usize> = (0..export_ranks.len()).collect();
        order.sort_by_key(|&i| export_ranks[i]);
        let recv_counts = exchange_counts(comm, &send_counts)?;
        debug!(
            imports = recv_counts.iter().sum::<usize>(),
            sources = recv_counts.iter().filter(|c| **c > 0).count(),
            "plan ready"
        );
        Ok(Self {
            comm,
            order,
            send_counts,
            recv_counts,
        })
    }

    /// The communicator this plan routes over.
    pub fn comm(&self) -> &'c C {
        self.comm
    }

    /// Number of local items this plan sends (including to self).
    pub fn num_exports(&self) -> usize {
        self.order.len()
    }

    /// Number of items this rank receives (including from self).
    pub fn num_imports(&self) -> usize {
        self.recv_counts.iter().sum()
    }

    /// Items sent to each rank, indexed by rank.
    pub fn export_counts(&self) -> &[usize] {
        &self.send_counts
    }

    /// Items received from each rank, indexed by rank.
    pub fn import_counts(&self) -> &[usize] {
        &self.recv_counts
    }

    /// Source rank of every imported item, in import order.
    pub fn import_ranks(&self) -> Vec<Rank> {
        self.recv_counts
            .iter()
            .enumerate()
            .flat_map(|(src, &count)| core::iter::repeat_n(src, count))
            .collect()
    }

    /// Move `values` along the plan; `values[i]` goes where item `i` was routed.
    ///
    /// Collective. Only ranks with a non-zero count exchange messages.
    pub fn distribute<T>(&self, values: &[T]) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        if values.len() != self.order.len() {
            return Err(CommError::LengthMismatch {
                expected: self.order.len(),
                actual: values.len(),
            });
        }
        let me = self.comm.rank();
        let mut own: Vec<T> = Vec::with_capacity(self.send_counts[me]);
        let mut start = 0;
        for (dest, &count) in self.send_counts.iter().enumerate() {
            let batch = &self.order[start..start + count];
            start += count;
            if count == 0 {
                continue;
            }
            if dest == me {
                own.extend(batch.iter().map(|&i| values[i].clone()));
            } else {
                let outgoing: Vec<&T> = batch.iter().map(|&i| &values[i]).collect();
                send_value(self.comm, dest, Tag::DISTRIBUTE, &outgoing)?;
            }
        }

        let mut imported = Vec::with_capacity(self.num_imports());
        for (source, &count) in self.recv_counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let batch: Vec<T> = if source == me {
                core::mem::take(&mut own)
            } else {
                recv_value(self.comm, source, Tag::DISTRIBUTE)?
            };
            if batch.len() != count {
                return Err(CommError::LengthMismatch {
                    expected: count,
                    actual: batch.len(),
                });
            }
            imported.extend(batch);
        }
        Ok(imported)
    }
}
