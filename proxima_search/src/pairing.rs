// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Source/target pairing over distributed point clouds.

use proxima_comm::{Communicator, Rank};
use proxima_index::{Aabb3, Bvh, Point, union_all};
use tracing::{debug, info_span};

use crate::candidates::CandidateDistributor;
use crate::config::{PairingConfig, PairingMode};
use crate::entity::{Dimension, Entity, EntityId};
use crate::entity_set::{DimensionPredicate, EntityPredicate, LocalEntityPredicate};
use crate::error::Result;
use crate::local_map::LocalMap;

/// Share of the local target span used as the gathering proximity for
/// nearest-neighbour pairing.
const NEAREST_PROXIMITY_FRACTION: f64 = 0.1;

/// For every local target center, the nearby source centers from any rank.
///
/// Source (domain) centers near this rank's targets are gathered with a
/// [`CandidateDistributor`], their global ids are forwarded along the same
/// plan, and every local target (parent) is paired with its sources
/// (children) by radius or k-nearest search.
///
/// Only entities owned by the calling rank take part on either side.
///
/// In nearest-neighbour mode sources are gathered within 10% of the largest
/// span of the local target bounds, so a target can end up with fewer than
/// `k` children when its neighbours live further away on another rank.
#[derive(Clone, Debug)]
pub struct PointCloudPairing {
    target_ids: Vec<EntityId>,
    target_centers: Vec<Point<3>>,
    source_ids: Vec<EntityId>,
    source_centers: Vec<Point<3>>,
    children: Vec<Vec<usize>>,
    radii: Vec<f64>,
}

impl PointCloudPairing {
    /// Pair the locally owned range entities with domain entities from every rank.
    ///
    /// Collective. The configuration is validated before any message is sent.
    pub fn new<'e, C, D, R, DM, RM>(
        comm: &C,
        config: &PairingConfig,
        domain_entities: D,
        domain_map: &DM,
        range_entities: R,
        range_map: &RM,
    ) -> Result<Self>
    where
        C: Communicator + ?Sized,
        D: IntoIterator<Item = &'e Entity>,
        R: IntoIterator<Item = &'e Entity>,
        DM: LocalMap + ?Sized,
        RM: LocalMap + ?Sized,
    {
        let mode = config.validate()?;
        let rank = comm.rank();
        let _span = info_span!("PointCloudPairing::new", rank, ?mode).entered();

        let domain_select = select(rank, config.domain_dimension);
        let range_select = select(rank, config.range_dimension);

        let mut source_ids = Vec::new();
        let mut source_centers = Vec::new();
        let domain_entities = domain_entities
            .into_iter()
            .filter(|e| domain_select.matches(e));
        for entity in domain_entities {
            source_ids.push(entity.id());
            source_centers.push(domain_map.centroid(entity)?);
        }

        let mut target_ids = Vec::new();
        let mut target_centers = Vec::new();
        let mut target_bounds = Vec::new();
        let range_entities = range_entities
            .into_iter()
            .filter(|e| range_select.matches(e));
        for entity in range_entities {
            target_ids.push(entity.id());
            target_centers.push(range_map.centroid(entity)?);
            target_bounds.push(entity.bounding_box());
        }

        let proximity = match mode {
            PairingMode::Radius(radius) => radius,
            PairingMode::Nearest(_) => union_all(target_bounds)
                .map_or(0.0, |b| b.largest_extent() * NEAREST_PROXIMITY_FRACTION),
        };

        let (plan, imported_centers) =
            CandidateDistributor::from_centers(comm, &source_centers, &target_centers, proximity)?;
        let imported_ids = plan.distribute(&source_ids)?;

        let entries = imported_centers
            .iter()
            .enumerate()
            .map(|(i, c)| (i, Aabb3::from_point(*c)));
        let tree = Bvh::build(entries)?;
        let mut children = Vec::with_capacity(target_centers.len());
        let mut radii = Vec::with_capacity(target_centers.len());
        for center in &target_centers {
            let (mut found, radius) = match mode {
                PairingMode::Radius(radius) => {
                    (tree.within_distance(center, radius).collect::<Vec<_>>(), radius)
                }
                PairingMode::Nearest(k) => {
                    let neighbors = tree.nearest_with_distance(center, k);
                    let farthest = neighbors.last().map_or(0.0, |n| n.distance_squared.sqrt());
                    (neighbors.into_iter().map(|n| n.id).collect(), farthest)
                }
            };
            if matches!(mode, PairingMode::Radius(_)) {
                found.sort_unstable();
            }
            children.push(found);
            radii.push(radius);
        }
        debug!(
            sources = source_ids.len(),
            imported = imported_ids.len(),
            targets = target_ids.len(),
            "pairing built"
        );
        Ok(Self {
            target_ids,
            target_centers,
            source_ids: imported_ids,
            source_centers: imported_centers,
            children,
            radii,
        })
    }

    /// Number of local targets (parents).
    pub fn num_parents(&self) -> usize {
        self.target_ids.len()
    }

    /// Global id of parent `i`.
    pub fn parent_id(&self, i: usize) -> EntityId {
        self.target_ids[i]
    }

    /// Center of parent `i`.
    pub fn parent_center(&self, i: usize) -> Point<3> {
        self.target_centers[i]
    }

    /// Number of children of every parent.
    pub fn children_per_parent(&self) -> Vec<usize> {
        self.children.iter().map(Vec::len).collect()
    }

    /// Children of parent `i`, as indices into [`source_centers`](Self::source_centers).
    ///
    /// Ascending by index for radius pairing, ascending by distance for
    /// nearest-neighbour pairing.
    pub fn child_center_ids(&self, i: usize) -> &[usize] {
        &self.children[i]
    }

    /// Global ids of the children of parent `i`.
    pub fn child_global_ids(&self, i: usize) -> Vec<EntityId> {
        self.children[i]
            .iter()
            .map(|&c| self.source_ids[c])
            .collect()
    }

    /// Support radius of parent `i`: the search radius, or the distance to
    /// the farthest of its nearest neighbours.
    pub fn parent_support_radius(&self, i: usize) -> f64 {
        self.radii[i]
    }

    /// Source centers gathered on this rank.
    pub fn source_centers(&self) -> &[Point<3>] {
        &self.source_centers
    }

    /// Global ids of the gathered source centers.
    pub fn source_ids(&self) -> &[EntityId] {
        &self.source_ids
    }
}

fn select(rank: Rank, dimension: Option<Dimension>) -> impl EntityPredicate {
    LocalEntityPredicate::new(rank).and(move |e: &Entity| {
        dimension.is_none_or(|d| DimensionPredicate(d).matches(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_map::BasicGeometryLocalMap;
    use proxima_comm::LocalGroup;

    /// `n` points one unit apart along x, starting at `rank * n + offset`.
    fn line(rank: usize, n: usize, offset: f64, id_base: u64) -> Vec<Entity> {
        (0..n)
            .map(|i| {
                let x = (rank * n + i) as f64 + offset;
                Entity::point(id_base + (rank * n + i) as u64, rank, [x, 0.0, 0.0], false)
            })
            .collect()
    }

    #[test]
    fn radius_pairing_crosses_rank_boundaries() {
        let got = LocalGroup::new(2)
            .run(|comm| {
                let sources = line(comm.rank(), 4, 0.0, 0);
                // Targets sit halfway between sources.
                let targets = line(comm.rank(), 4, 0.5, 100);
                let map = BasicGeometryLocalMap;
                let pairing = PointCloudPairing::new(
                    &comm,
                    &PairingConfig::radius(0.6),
                    &sources,
                    &map,
                    &targets,
                    &map,
                )
                .unwrap();
                (0..pairing.num_parents())
                    .map(|i| {
                        let mut ids = pairing.child_global_ids(i);
                        ids.sort_unstable();
                        (pairing.parent_id(i), ids, pairing.parent_support_radius(i))
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap();
        assert_eq!(got[0][0], (100, vec![0, 1], 0.6));
        // Rank 0's last target at x = 3.5 reaches source 4 on rank 1.
        assert_eq!(got[0][3], (103, vec![3, 4], 0.6));
        // Rank 1's last target at x = 7.5 has a single neighbour.
        assert_eq!(got[1][3], (107, vec![7], 0.6));
    }

    #[test]
    fn nearest_pairing_reports_farthest_distance() {
        let got = LocalGroup::new(1)
            .run(|comm| {
                let sources = line(0, 10, 0.0, 0);
                let targets = vec![
                    Entity::point(50, 0, [2.2, 0.0, 0.0], false),
                    Entity::point(51, 0, [7.2, 0.0, 0.0], false),
                ];
                let map = BasicGeometryLocalMap;
                let pairing = PointCloudPairing::new(
                    &comm,
                    &PairingConfig::nearest(3),
                    &sources,
                    &map,
                    &targets,
                    &map,
                )
                .unwrap();
                (
                    pairing.children_per_parent(),
                    pairing.child_global_ids(0),
                    pairing.parent_support_radius(0),
                    pairing.source_ids().len(),
                )
            })
            .unwrap();
        let (counts, ids, radius, gathered) = &got[0];
        assert_eq!(counts, &vec![3, 3]);
        // Span 5.0 gives a proximity of 0.5: sources 2..=7 are gathered, so
        // source 1 is out of reach of the first target.
        assert_eq!(*gathered, 6);
        assert_eq!(ids, &vec![2, 3, 4]);
        assert!((radius - 1.8).abs() < 1e-12);
    }

    #[test]
    fn foreign_entities_are_ignored() {
        let got = LocalGroup::new(1)
            .run(|comm| {
                let mut sources = line(0, 3, 0.0, 0);
                // Inside the radius of the target, but owned by another rank.
                sources.push(Entity::point(99, 5, [0.0, 0.0, 0.0], false));
                let targets = vec![
                    Entity::point(50, 0, [0.0, 0.0, 0.0], false),
                    Entity::point(51, 7, [1.0, 0.0, 0.0], false),
                ];
                let map = BasicGeometryLocalMap;
                let pairing = PointCloudPairing::new(
                    &comm,
                    &PairingConfig::radius(2.5),
                    &sources,
                    &map,
                    &targets,
                    &map,
                )
                .unwrap();
                (
                    pairing.num_parents(),
                    pairing.source_ids().to_vec(),
                    pairing.child_global_ids(0),
                )
            })
            .unwrap();
        let (parents, sources, children) = &got[0];
        assert_eq!(*parents, 1, "the foreign target is skipped");
        assert_eq!(sources, &vec![0, 1, 2], "the foreign source is skipped");
        assert_eq!(children, &vec![0, 1, 2]);
    }
}
