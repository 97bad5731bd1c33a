// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for the distributed search.

use proxima_comm::CommError;
use proxima_index::IndexError;
use thiserror::Error;

use crate::entity::EntityId;

/// Errors raised by search sessions, pairings and their configuration.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The local hierarchy could not be built.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// A message exchange failed.
    #[error(transparent)]
    Comm(#[from] CommError),

    /// The `(domain, range)` pair has no correspondence record on this rank.
    #[error("no correspondence between domain entity {domain} and range entity {range}")]
    Lookup {
        /// Domain entity id.
        domain: EntityId,
        /// Range entity id.
        range: EntityId,
    },

    /// The range entity is neither local input nor part of a local record.
    #[error("range entity {0} is unknown on this rank")]
    UnknownRange(EntityId),

    /// A local map cannot handle this entity's shape.
    #[error("entity {entity} has a shape the local map cannot evaluate")]
    UnsupportedShape {
        /// The entity that was passed in.
        entity: EntityId,
    },

    /// A configuration value was rejected before any communication.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfig(String),
}

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;
