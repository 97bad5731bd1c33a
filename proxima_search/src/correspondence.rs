// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bidirectional many-to-many index of verified matches.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use proxima_comm::Rank;
use proxima_index::Point;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// One verified `(domain, range)` match.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Domain entity that contains the range entity.
    pub domain_id: EntityId,
    /// Range entity found inside the domain entity.
    pub range_id: EntityId,
    /// Rank that owns the range entity.
    pub range_owner: Rank,
    /// Range entity's point in the domain entity's reference frame.
    pub parametric_coordinates: Point<3>,
}

/// Records held by one rank, addressable from either side.
///
/// A pair is stored once; inserting it again keeps the first record.
/// Lookups return ids in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Correspondence {
    by_domain: HashMap<EntityId, Vec<EntityId>>,
    by_range: HashMap<EntityId, Vec<EntityId>>,
    coordinates: HashMap<(EntityId, EntityId), Point<3>>,
    owners: HashMap<EntityId, Rank>,
}

impl Correspondence {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Returns `false` if the pair was already present.
    pub fn insert(&mut self, record: Record) -> bool {
        self.owners
            .entry(record.range_id)
            .or_insert(record.range_owner);
        match self.coordinates.entry((record.domain_id, record.range_id)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record.parametric_coordinates);
                self.by_domain
                    .entry(record.domain_id)
                    .or_default()
                    .push(record.range_id);
                self.by_range
                    .entry(record.range_id)
                    .or_default()
                    .push(record.domain_id);
                true
            }
        }
    }

    /// Remember the owner of a range entity that may have no record.
    pub fn set_range_owner(&mut self, range_id: EntityId, owner: Rank) {
        self.owners.insert(range_id, owner);
    }

    /// Number of distinct pairs.
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// Whether no pair is stored.
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Range entities matched to `domain_id`.
    pub fn range_entities(&self, domain_id: EntityId) -> &[EntityId] {
        self.by_domain
            .get(&domain_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Domain entities matched to `range_id`.
    pub fn domain_entities(&self, range_id: EntityId) -> &[EntityId] {
        self.by_range
            .get(&range_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Reference coordinates of the pair, if it is stored.
    pub fn parametric_coordinates(
        &self,
        domain_id: EntityId,
        range_id: EntityId,
    ) -> Option<Point<3>> {
        self.coordinates.get(&(domain_id, range_id)).copied()
    }

    /// Owner rank of a range entity known here.
    pub fn range_owner(&self, range_id: EntityId) -> Option<Rank> {
        self.owners.get(&range_id).copied()
    }
}

impl Extend<Record> for Correspondence {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}
