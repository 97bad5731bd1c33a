// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for message passing.

use thiserror::Error;

use crate::communicator::{Rank, Tag};

/// Errors raised by communicators, collectives and exchange plans.
#[derive(Error, Debug)]
pub enum CommError {
    /// A rank outside `0..size` was addressed.
    #[error("rank {rank} is outside a group of size {size}")]
    InvalidRank {
        /// The offending rank.
        rank: Rank,
        /// Size of the group.
        size: usize,
    },

    /// The peer dropped its end of the channel (it returned or panicked).
    #[error("peer rank {peer} disconnected")]
    Disconnected {
        /// The peer that went away.
        peer: Rank,
    },

    /// A receive waited longer than the configured timeout.
    #[error("timed out waiting for a message from rank {peer}")]
    Timeout {
        /// The peer that never sent.
        peer: Rank,
    },

    /// The next message from a peer carried a different tag than expected.
    ///
    /// This means the ranks disagree on the order of collective calls.
    #[error("expected tag {expected:?} from rank {peer}, found {found:?}")]
    TagMismatch {
        /// Sending rank.
        peer: Rank,
        /// Tag the receiver asked for.
        expected: Tag,
        /// Tag that arrived.
        found: Tag,
    },

    /// A payload length disagrees with the exchange plan.
    #[error("length mismatch: expected {expected} items, got {actual}")]
    LengthMismatch {
        /// Length required by the plan.
        expected: usize,
        /// Length supplied or received.
        actual: usize,
    },

    /// A payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// A rank's closure panicked inside [`LocalGroup::run`](crate::LocalGroup::run).
    #[error("rank {rank} panicked")]
    RankPanicked {
        /// The rank whose thread panicked.
        rank: Rank,
    },

    /// A rank thread could not be spawned.
    #[error("failed to spawn rank thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type alias for communication operations.
pub type Result<T> = std::result::Result<T, CommError>;
