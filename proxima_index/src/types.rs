// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

/// A point in `D`-dimensional space.
pub type Point<const D: usize> = [f64; D];

/// Axis-aligned bounding box in `D` dimensions.
///
/// A degenerate box (`min == max`) represents a point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb<const D: usize> {
    /// Minimum corner.
    pub min: Point<D>,
    /// Maximum corner.
    pub max: Point<D>,
}

/// Axis-aligned bounding box in 3D.
pub type Aabb3 = Aabb<3>;

impl<const D: usize> Aabb<D> {
    /// Create a new AABB from min/max corners.
    pub const fn new(min: Point<D>, max: Point<D>) -> Self {
        Self { min, max }
    }

    /// Create a degenerate AABB covering a single point.
    pub const fn from_point(p: Point<D>) -> Self {
        Self { min: p, max: p }
    }

    /// Smallest AABB containing every point, or `None` for an empty sequence.
    pub fn from_points<I: IntoIterator<Item = Point<D>>>(points: I) -> Option<Self> {
        union_all(points.into_iter().map(Self::from_point))
    }

    /// Whether every coordinate is a number and `min[d] <= max[d]` on every axis.
    pub fn is_valid(&self) -> bool {
        (0..D).all(|d| {
            !self.min[d].is_nan() && !self.max[d].is_nan() && self.min[d] <= self.max[d]
        })
    }

    /// Whether the box collapses to a single point.
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Whether this AABB contains the point. Boundaries are inclusive.
    pub fn contains_point(&self, p: &Point<D>) -> bool {
        (0..D).all(|d| self.min[d] <= p[d] && p[d] <= self.max[d])
    }

    /// Whether the two AABBs overlap. Touching boundaries count as overlap.
    pub fn intersects(&self, other: &Self) -> bool {
        (0..D).all(|d| self.min[d] <= other.max[d] && other.min[d] <= self.max[d])
    }

    /// The smallest AABB containing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        for d in 0..D {
            out.min[d] = out.min[d].min(other.min[d]);
            out.max[d] = out.max[d].max(other.max[d]);
        }
        out
    }

    /// Grow the box by `amount` on every side.
    pub fn expanded(&self, amount: f64) -> Self {
        let mut out = *self;
        for d in 0..D {
            out.min[d] -= amount;
            out.max[d] += amount;
        }
        out
    }

    /// Center of the box.
    pub fn centroid(&self) -> Point<D> {
        let mut c = [0.0; D];
        for (d, c) in c.iter_mut().enumerate() {
            *c = 0.5 * (self.min[d] + self.max[d]);
        }
        c
    }

    /// Per-axis side lengths.
    pub fn extents(&self) -> Point<D> {
        let mut e = [0.0; D];
        for (d, e) in e.iter_mut().enumerate() {
            *e = self.max[d] - self.min[d];
        }
        e
    }

    /// Length of the longest side (zero for a point).
    pub fn largest_extent(&self) -> f64 {
        self.extents().iter().fold(0.0, |acc, e| acc.max(*e))
    }

    /// Squared Euclidean distance from `p` to the closest point of the box.
    ///
    /// Zero when `p` lies inside or on the boundary.
    pub fn distance_squared_to_point(&self, p: &Point<D>) -> f64 {
        let mut acc = 0.0;
        for d in 0..D {
            let gap = if p[d] < self.min[d] {
                self.min[d] - p[d]
            } else if p[d] > self.max[d] {
                p[d] - self.max[d]
            } else {
                0.0
            };
            acc += gap * gap;
        }
        acc
    }
}

/// Union of a sequence of boxes, or `None` when it is empty.
pub fn union_all<const D: usize, I: IntoIterator<Item = Aabb<D>>>(boxes: I) -> Option<Aabb<D>> {
    let mut it = boxes.into_iter();
    let first = it.next()?;
    Some(it.fold(first, |acc, b| acc.union(&b)))
}

/// Squared Euclidean distance between two points.
pub fn distance_squared<const D: usize>(a: &Point<D>, b: &Point<D>) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
