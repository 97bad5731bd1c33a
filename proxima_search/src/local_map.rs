// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapping physical points into an entity's reference frame.

use proxima_index::Point;

use crate::entity::{Entity, Shape};
use crate::error::{Result, SearchError};

/// Geometry evaluation for one kind of entity.
///
/// The search only ever asks three questions: where an entity's centroid is,
/// where a physical point lands in the entity's reference frame, and whether
/// that reference point is inside the entity.
pub trait LocalMap {
    /// Centroid of `entity` in physical space.
    fn centroid(&self, entity: &Entity) -> Result<Point<3>>;

    /// `point` expressed in the reference frame of `entity`.
    fn map_to_reference(&self, entity: &Entity, point: &Point<3>) -> Result<Point<3>>;

    /// Whether `reference` lies in the valid reference domain of `entity`,
    /// widened by `tolerance`.
    fn is_in_reference(&self, entity: &Entity, reference: &Point<3>, tolerance: f64) -> bool;

    /// Reference coordinates of `point` if it lies in `entity`.
    fn locate(
        &self,
        entity: &Entity,
        point: &Point<3>,
        tolerance: f64,
    ) -> Result<Option<Point<3>>> {
        let reference = self.map_to_reference(entity, point)?;
        Ok(self
            .is_in_reference(entity, &reference, tolerance)
            .then_some(reference))
    }
}

/// Local map for [`Shape::Point`] and [`Shape::Box`] entities.
///
/// A box's reference frame is the unit cube: each coordinate is
/// `(p - min) / (max - min)`, and the valid domain is `[0, 1]` on every axis.
/// A flat axis (`min == max`) keeps the physical offset `p - min`, whose valid
/// value is `0`. A point's reference frame is the offset from the point.
///
/// [`Shape::Cell`] has no known geometry: its centroid is the centre of its
/// bounds and mapping into it fails with [`SearchError::UnsupportedShape`].
#[derive(Copy, Clone, Debug, Default)]
pub struct BasicGeometryLocalMap;

impl LocalMap for BasicGeometryLocalMap {
    fn centroid(&self, entity: &Entity) -> Result<Point<3>> {
        Ok(match entity.shape() {
            Shape::Point(p) => *p,
            Shape::Box(b) | Shape::Cell { bounds: b } => b.centroid(),
        })
    }

    fn map_to_reference(&self, entity: &Entity, point: &Point<3>) -> Result<Point<3>> {
        match entity.shape() {
            Shape::Point(p) => Ok(core::array::from_fn(|d| point[d] - p[d])),
            Shape::Box(b) => Ok(core::array::from_fn(|d| {
                let extent = b.max[d] - b.min[d];
                let offset = point[d] - b.min[d];
                if extent > 0.0 {
                    offset / extent
                } else {
                    offset
                }
            })),
            Shape::Cell { .. } => Err(SearchError::UnsupportedShape {
                entity: entity.id(),
            }),
        }
    }

    fn is_in_reference(&self, entity: &Entity, reference: &Point<3>, tolerance: f64) -> bool {
        match entity.shape() {
            Shape::Point(_) => reference.iter().all(|r| r.abs() <= tolerance),
            Shape::Box(b) => (0..3).all(|d| {
                let upper = if b.max[d] > b.min[d] { 1.0 } else { 0.0 };
                reference[d] >= -tolerance && reference[d] <= upper + tolerance
            }),
            Shape::Cell { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Dimension;
    use proxima_index::Aabb3;

    const TOL: f64 = 1e-6;

    fn locates(entity: &Entity, point: Point<3>) -> bool {
        BasicGeometryLocalMap
            .locate(entity, &point, TOL)
            .unwrap()
            .is_some()
    }

    #[test]
    fn box_maps_to_unit_cube() {
        let b = Entity::boxed(0, 0, [0.0, 0.0, 3.0], [1.0, 2.0, 4.0]);
        let map = BasicGeometryLocalMap;
        assert_eq!(map.centroid(&b).unwrap(), [0.5, 1.0, 3.5]);
        assert_eq!(
            map.map_to_reference(&b, &[0.5, 0.5, 3.5]).unwrap(),
            [0.5, 0.25, 0.5]
        );
        assert_eq!(
            map.locate(&b, &[1.0, 2.0, 3.0], TOL).unwrap(),
            Some([1.0, 1.0, 0.0])
        );
        assert_eq!(map.locate(&b, &[1.5, 1.0, 3.5], TOL).unwrap(), None);
    }

    #[test]
    fn boundary_within_tolerance_is_inside() {
        let b = Entity::boxed(0, 0, [0.0; 3], [1.0; 3]);
        assert!(locates(&b, [1.0 + 1e-9, 0.5, 0.5]));
        assert!(!locates(&b, [1.0 + 1e-3, 0.5, 0.5]));
    }

    #[test]
    fn flat_box_keeps_physical_offset() {
        let b = Entity::boxed(0, 0, [0.0, 0.0, 1.0], [1.0, 1.0, 1.0]);
        assert!(locates(&b, [0.5, 0.5, 1.0]));
        assert!(!locates(&b, [0.5, 0.5, 1.5]));
    }

    #[test]
    fn point_matches_only_itself() {
        let p = Entity::point(0, 0, [1.0, 2.0, 3.0], false);
        assert!(locates(&p, [1.0, 2.0, 3.0]));
        assert!(!locates(&p, [1.0, 2.0, 3.1]));
    }

    #[test]
    fn opaque_cell_cannot_be_mapped() {
        let c = Entity::cell(9, 0, Dimension::Volume, Aabb3::new([0.0; 3], [2.0; 3]));
        let map = BasicGeometryLocalMap;
        assert_eq!(map.centroid(&c).unwrap(), [1.0; 3]);
        assert!(matches!(
            map.map_to_reference(&c, &[1.0; 3]),
            Err(SearchError::UnsupportedShape { entity: 9 })
        ));
    }
}
