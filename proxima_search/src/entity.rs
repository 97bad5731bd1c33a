// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometric entities: ids, topological dimension, flags and shape.

use proxima_comm::Rank;
use proxima_index::{Aabb3, Point};
use serde::{Deserialize, Serialize};

/// Global entity identifier, unique across the distributed set.
pub type EntityId = u64;

/// Topological dimension of an entity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    /// 0-dimensional: points and mesh nodes.
    Node,
    /// 1-dimensional.
    Edge,
    /// 2-dimensional.
    Face,
    /// 3-dimensional: boxes and volume cells.
    Volume,
}

impl Dimension {
    /// The dimension as an integer, `0..=3`.
    pub const fn index(self) -> usize {
        match self {
            Self::Node => 0,
            Self::Edge => 1,
            Self::Face => 2,
            Self::Volume => 3,
        }
    }

    /// The dimension for an integer, if it is in `0..=3`.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Node),
            1 => Some(Self::Edge),
            2 => Some(Self::Face),
            3 => Some(Self::Volume),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    /// Per-entity markers used by selection predicates.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EntityFlags: u8 {
        /// Entity lies on the boundary surface of its set.
        const ON_SURFACE = 0b0000_0001;
    }
}

/// Geometry of an entity.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// A single point.
    Point(Point<3>),
    /// An axis-aligned box.
    Box(Aabb3),
    /// A cell whose exact geometry only a caller-supplied local map knows.
    Cell {
        /// Conservative bounds of the cell.
        bounds: Aabb3,
    },
}

/// An immutable geometric item owned by one rank.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    id: EntityId,
    owner_rank: Rank,
    dimension: Dimension,
    flags: EntityFlags,
    shape: Shape,
}

impl Entity {
    /// A point entity.
    pub fn point(id: EntityId, owner_rank: Rank, point: Point<3>, on_surface: bool) -> Self {
        Self {
            id,
            owner_rank,
            dimension: Dimension::Node,
            flags: surface_flag(on_surface),
            shape: Shape::Point(point),
        }
    }

    /// A box entity spanning `min..=max`.
    pub fn boxed(id: EntityId, owner_rank: Rank, min: Point<3>, max: Point<3>) -> Self {
        Self {
            id,
            owner_rank,
            dimension: Dimension::Volume,
            flags: EntityFlags::empty(),
            shape: Shape::Box(Aabb3::new(min, max)),
        }
    }

    /// An opaque cell of the given dimension.
    pub fn cell(id: EntityId, owner_rank: Rank, dimension: Dimension, bounds: Aabb3) -> Self {
        Self {
            id,
            owner_rank,
            dimension,
            flags: EntityFlags::empty(),
            shape: Shape::Cell { bounds },
        }
    }

    /// Replace the flags.
    #[must_use]
    pub fn with_flags(mut self, flags: EntityFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Global id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Rank that owns this entity.
    pub fn owner_rank(&self) -> Rank {
        self.owner_rank
    }

    /// Topological dimension.
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Flags.
    pub fn flags(&self) -> EntityFlags {
        self.flags
    }

    /// Whether [`EntityFlags::ON_SURFACE`] is set.
    pub fn on_surface(&self) -> bool {
        self.flags.contains(EntityFlags::ON_SURFACE)
    }

    /// Geometry.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Axis-aligned bounds. Degenerate for points.
    pub fn bounding_box(&self) -> Aabb3 {
        match &self.shape {
            Shape::Point(p) => Aabb3::from_point(*p),
            Shape::Box(b) | Shape::Cell { bounds: b } => *b,
        }
    }
}

fn surface_flag(on_surface: bool) -> EntityFlags {
    if on_surface {
        EntityFlags::ON_SURFACE
    } else {
        EntityFlags::empty()
    }
}
