// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Entity sources and selection predicates.

use core::slice;

use proxima_comm::Rank;
use proxima_index::{Aabb3, union_all};

use crate::entity::{Dimension, Entity, EntityFlags};

/// A selection function over entities.
///
/// Closures `Fn(&Entity) -> bool` are predicates, so ad hoc filters need no
/// wrapper type.
pub trait EntityPredicate {
    /// Whether `entity` is selected.
    fn matches(&self, entity: &Entity) -> bool;

    /// Select entities matched by both `self` and `other`.
    fn and<O: EntityPredicate>(self, other: O) -> And<Self, O>
    where
        Self: Sized,
    {
        And(self, other)
    }
}

impl<F: Fn(&Entity) -> bool> EntityPredicate for F {
    fn matches(&self, entity: &Entity) -> bool {
        self(entity)
    }
}

/// Selects every entity.
#[derive(Copy, Clone, Debug, Default)]
pub struct AllEntities;

impl EntityPredicate for AllEntities {
    fn matches(&self, _: &Entity) -> bool {
        true
    }
}

/// Selects entities owned by one rank.
#[derive(Copy, Clone, Debug)]
pub struct LocalEntityPredicate {
    rank: Rank,
}

impl LocalEntityPredicate {
    /// Select entities whose owner is `rank`.
    pub fn new(rank: Rank) -> Self {
        Self { rank }
    }
}

impl EntityPredicate for LocalEntityPredicate {
    fn matches(&self, entity: &Entity) -> bool {
        entity.owner_rank() == self.rank
    }
}

/// Selects entities flagged [`EntityFlags::ON_SURFACE`].
#[derive(Copy, Clone, Debug, Default)]
pub struct SurfacePredicate;

impl EntityPredicate for SurfacePredicate {
    fn matches(&self, entity: &Entity) -> bool {
        entity.flags().contains(EntityFlags::ON_SURFACE)
    }
}

/// Selects entities of one topological dimension.
#[derive(Copy, Clone, Debug)]
pub struct DimensionPredicate(pub Dimension);

impl EntityPredicate for DimensionPredicate {
    fn matches(&self, entity: &Entity) -> bool {
        entity.dimension() == self.0
    }
}

/// Conjunction of two predicates. See [`EntityPredicate::and`].
#[derive(Copy, Clone, Debug)]
pub struct And<A, B>(A, B);

impl<A: EntityPredicate, B: EntityPredicate> EntityPredicate for And<A, B> {
    fn matches(&self, entity: &Entity) -> bool {
        self.0.matches(entity) && self.1.matches(entity)
    }
}

/// Forward iterator over the selected entities of a set.
///
/// Cloning restarts nothing; it forks the iterator at its current position.
/// Ask the set for a fresh one to start over.
#[derive(Clone, Debug)]
pub struct EntityIter<'a, P> {
    inner: slice::Iter<'a, Entity>,
    dimension: Option<Dimension>,
    predicate: P,
}

impl<'a, P: EntityPredicate> Iterator for EntityIter<'a, P> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        let dimension = self.dimension;
        let predicate = &self.predicate;
        self.inner.find(|e| {
            dimension.is_none_or(|d| e.dimension() == d) && predicate.matches(e)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

/// A rank's view of a distributed entity set.
pub trait EntitySet {
    /// Rank holding this view.
    fn rank(&self) -> Rank;

    /// Every entity held by this rank, local and ghosted alike.
    fn entities(&self) -> &[Entity];

    /// Entities of `dimension` (or any, for `None`) selected by `predicate`.
    fn entity_iterator<P: EntityPredicate>(
        &self,
        dimension: Option<Dimension>,
        predicate: P,
    ) -> EntityIter<'_, P> {
        EntityIter {
            inner: self.entities().iter(),
            dimension,
            predicate,
        }
    }

    /// Union of the bounds of every entity held by this rank.
    fn local_bounding_box(&self) -> Option<Aabb3> {
        union_all(self.entities().iter().map(Entity::bounding_box))
    }
}

/// A plain vector of entities.
#[derive(Clone, Debug)]
pub struct BasicEntitySet {
    rank: Rank,
    entities: Vec<Entity>,
}

impl BasicEntitySet {
    /// An empty set held by `rank`.
    pub fn new(rank: Rank) -> Self {
        Self {
            rank,
            entities: Vec::new(),
        }
    }

    /// Append an entity.
    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// Number of entities held.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the set holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Extend<Entity> for BasicEntitySet {
    fn extend<I: IntoIterator<Item = Entity>>(&mut self, iter: I) {
        self.entities.extend(iter);
    }
}

impl EntitySet for BasicEntitySet {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn entities(&self) -> &[Entity] {
        &self.entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_set() -> BasicEntitySet {
        let mut set = BasicEntitySet::new(1);
        set.add_entity(Entity::point(0, 1, [0.0, 0.0, 0.0], true));
        set.add_entity(Entity::point(1, 2, [1.0, 0.0, 0.0], true));
        set.add_entity(Entity::point(2, 1, [2.0, 0.0, 0.0], false));
        set.add_entity(Entity::boxed(3, 1, [0.0, 0.0, 0.0], [1.0, 1.0, 5.0]));
        set
    }

    fn ids<'a>(it: impl Iterator<Item = &'a Entity>) -> Vec<u64> {
        it.map(Entity::id).collect()
    }

    #[test]
    fn dimension_filter() {
        let set = mixed_set();
        assert_eq!(
            ids(set.entity_iterator(Some(Dimension::Node), AllEntities)),
            vec![0, 1, 2]
        );
        assert_eq!(
            ids(set.entity_iterator(Some(Dimension::Volume), AllEntities)),
            vec![3]
        );
        assert_eq!(ids(set.entity_iterator(None, AllEntities)).len(), 4);
    }

    #[test]
    fn composed_predicates() {
        let set = mixed_set();
        let local_surface = LocalEntityPredicate::new(set.rank()).and(SurfacePredicate);
        assert_eq!(ids(set.entity_iterator(None, local_surface)), vec![0]);
        let nodes = DimensionPredicate(Dimension::Node);
        let nodes_but_one = nodes.and(|e: &Entity| e.id() != 1);
        assert_eq!(ids(set.entity_iterator(None, nodes_but_one)), vec![0, 2]);
    }

    #[test]
    fn iterator_can_be_forked() {
        let set = mixed_set();
        let mut it = set.entity_iterator(None, LocalEntityPredicate::new(1));
        assert_eq!(it.next().map(Entity::id), Some(0));
        let fork = it.clone();
        assert_eq!(ids(it), vec![2, 3]);
        assert_eq!(ids(fork), vec![2, 3]);
    }

    #[test]
    fn local_bounding_box_covers_everything() {
        let set = mixed_set();
        let b = set.local_bounding_box().unwrap();
        assert_eq!(b, Aabb3::new([0.0, 0.0, 0.0], [2.0, 1.0, 5.0]));
        assert!(BasicEntitySet::new(0).local_bounding_box().is_none());
    }
}
