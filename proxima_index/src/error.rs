// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for hierarchy construction.

use thiserror::Error;

/// Errors raised while building a [`Bvh`](crate::Bvh).
///
/// Queries on a built hierarchy never fail; every check happens up front.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// An input volume has a NaN coordinate or `min > max` on some axis.
    #[error("bounding volume at position {position} is malformed (NaN or inverted)")]
    InvalidVolume {
        /// Position of the offending item in the build input.
        position: usize,
    },
}

/// Result type alias for index operations.
pub type Result<T> = core::result::Result<T, IndexError>;
