// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The communicator abstraction every distributed step is written against.

use crate::error::Result;

/// Index of a process in its group, `0..size`.
pub type Rank = usize;

/// Label carried by every message.
///
/// Messages between one pair of ranks are received in send order; the tag lets
/// the receiver check that both sides are in the same protocol step.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag(pub u32);

impl Tag {
    /// Used by [`Communicator::barrier`] implementations built on messages.
    pub const BARRIER: Self = Self(0);
    /// Used by [`all_gather`](crate::collective::all_gather).
    pub const GATHER: Self = Self(1);
    /// Used by [`exchange_counts`](crate::collective::exchange_counts).
    pub const COUNTS: Self = Self(2);
    /// Used by [`Distributor::distribute`](crate::Distributor::distribute).
    pub const DISTRIBUTE: Self = Self(3);
    /// First tag free for application use.
    pub const USER: Self = Self(16);
}

/// Blocking message passing within a fixed group of ranks.
///
/// ## Contract
///
/// - `send` is buffered: it returns once the payload is queued and never
///   waits for the receiver.
/// - `recv` blocks until the next message from `source` arrives.
/// - Messages from one source to one destination arrive in send order.
///   Nothing is guaranteed across different sources.
/// - Collective helpers built on top must be called by every rank in the
///   group, in the same order, even with nothing to contribute. A rank that
///   skips one leaves its peers blocked.
pub trait Communicator {
    /// This process's rank.
    fn rank(&self) -> Rank;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Queue `payload` for `dest`.
    fn send(&self, dest: Rank, tag: Tag, payload: Vec<u8>) -> Result<()>;

    /// Receive the next message from `source`, which must carry `tag`.
    fn recv(&self, source: Rank, tag: Tag) -> Result<Vec<u8>>;

    /// Block until every rank in the group has entered the barrier.
    fn barrier(&self) -> Result<()>;
}
