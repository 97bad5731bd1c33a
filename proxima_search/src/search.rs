// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The distributed search session.

use core::fmt;

use proxima_comm::{Communicator, Distributor, Rank};
use proxima_index::{Aabb3, Bvh, IndexError, Point};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::candidates::CandidateDistributor;
use crate::config::SearchConfig;
use crate::correspondence::{Correspondence, Record};
use crate::entity::{Entity, EntityId};
use crate::error::{Result, SearchError};
use crate::exchange::gather_bounding_boxes;
use crate::local_map::LocalMap;

/// A range entity as shipped to candidate domain ranks.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RangeQuery {
    id: EntityId,
    owner: Rank,
    point: Point<3>,
    min: Point<3>,
    max: Point<3>,
}

/// A search over one rank's share of a distributed domain entity set.
///
/// Construction indexes the local domain entities and shares each rank's
/// domain bounds with the group. Each call to [`search`](Self::search) then
/// locates a set of range entities among the domain entities of every rank
/// and replaces the correspondence held by the session.
///
/// After a search, each rank holds the records in which it took part: those
/// for its own domain entities and those for the range entities it submitted.
/// Every match is kept, so a range entity on a boundary shared by several
/// domain entities (on one rank or several) is reported once per domain
/// entity.
///
/// ## Collective calls
///
/// [`new`](Self::new) and [`search`](Self::search) must be called by every
/// rank of the group, in the same order, including ranks with no entities.
/// An error on one rank during a search (for example a local map that cannot
/// evaluate a shape, or a malformed range entity) leaves its peers waiting
/// unless the communicator bounds its receives.
pub struct ParallelSearch<'a, C: Communicator + ?Sized, M: LocalMap + ?Sized> {
    comm: &'a C,
    domain: Vec<&'a Entity>,
    domain_map: &'a M,
    bvh: Bvh<usize, 3>,
    domain_boxes: Vec<Option<Aabb3>>,
    config: SearchConfig,
    correspondence: Correspondence,
    missed: Vec<EntityId>,
}

impl<C: Communicator + ?Sized, M: LocalMap + ?Sized> fmt::Debug for ParallelSearch<'_, C, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelSearch")
            .field("rank", &self.comm.rank())
            .field("domain_entities", &self.domain.len())
            .field("records", &self.correspondence.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a, C: Communicator + ?Sized, M: LocalMap + ?Sized> ParallelSearch<'a, C, M> {
    /// Index `domain_entities` and share this rank's domain bounds.
    ///
    /// Collective. The configuration is validated before any message is sent.
    pub fn new<I>(
        comm: &'a C,
        domain_entities: I,
        domain_map: &'a M,
        config: SearchConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Entity>,
    {
        config.validate()?;
        let _span = info_span!("ParallelSearch::new", rank = comm.rank()).entered();
        let domain: Vec<&'a Entity> = domain_entities
            .into_iter()
            .filter(|e| config.domain_dimension.is_none_or(|d| e.dimension() == d))
            .collect();
        let entries = domain
            .iter()
            .enumerate()
            .map(|(i, e)| (i, e.bounding_box()));
        let bvh = Bvh::build(entries)?;
        let domain_boxes = gather_bounding_boxes(comm, bvh.bounds())?;
        debug!(
            domain_entities = domain.len(),
            active_ranks = domain_boxes.iter().flatten().count(),
            "domain indexed"
        );
        Ok(Self {
            comm,
            domain,
            domain_map,
            bvh,
            domain_boxes,
            config,
            correspondence: Correspondence::new(),
            missed: Vec::new(),
        })
    }

    /// Locate `range_entities` among the domain entities of every rank.
    ///
    /// Collective. Replaces the records of any previous search; the domain
    /// index is reused.
    ///
    /// Fails with [`IndexError::InvalidVolume`] if a range entity has a NaN
    /// coordinate or an inverted box; `position` counts the range entities
    /// left after dimension filtering.
    pub fn search<'r, I, R>(&mut self, range_entities: I, range_map: &R) -> Result<()>
    where
        I: IntoIterator<Item = &'r Entity>,
        R: LocalMap + ?Sized,
    {
        let me = self.comm.rank();
        let _span = info_span!("ParallelSearch::search", rank = me).entered();
        let tolerance = self.config.tolerance;
        let dimension = self.config.range_dimension;
        let range: Vec<&Entity> = range_entities
            .into_iter()
            .filter(|e| dimension.is_none_or(|d| e.dimension() == d))
            .collect();

        let mut correspondence = Correspondence::new();
        let mut queries = Vec::with_capacity(range.len());
        let mut query_boxes = Vec::with_capacity(range.len());
        for (position, entity) in range.iter().enumerate() {
            let bounds = entity.bounding_box();
            if !bounds.is_valid() {
                return Err(IndexError::InvalidVolume { position }.into());
            }
            let pad = (tolerance * bounds.largest_extent()).max(tolerance);
            let padded = bounds.expanded(pad);
            queries.push(RangeQuery {
                id: entity.id(),
                owner: entity.owner_rank(),
                point: range_map.centroid(entity)?,
                min: padded.min,
                max: padded.max,
            });
            query_boxes.push(padded);
            correspondence.set_range_owner(entity.id(), entity.owner_rank());
        }

        // Ship each query to the ranks whose domain bounds it touches.
        let candidates =
            CandidateDistributor::from_query_boxes(self.comm, &query_boxes, &self.domain_boxes)?;
        let imported = candidates.distribute(&queries)?;
        let origins = candidates.import_ranks();

        let mut found = Vec::new();
        let mut found_origins = Vec::new();
        {
            let _s = info_span!("resolve", queries = imported.len()).entered();
            for (query, origin) in imported.iter().zip(origins) {
                let mut hits: Vec<usize> =
                    self.bvh.query(&Aabb3::new(query.min, query.max)).collect();
                hits.sort_unstable();
                for i in hits {
                    let domain = self.domain[i];
                    let Some(coords) = self.domain_map.locate(domain, &query.point, tolerance)?
                    else {
                        continue;
                    };
                    let record = Record {
                        domain_id: domain.id(),
                        range_id: query.id,
                        range_owner: query.owner,
                        parametric_coordinates: coords,
                    };
                    correspondence.insert(record);
                    found.push(record);
                    found_origins.push(origin);
                }
            }
        }

        // Return every record to the rank that submitted the range entity.
        let back = Distributor::new(self.comm, &found_origins)?;
        correspondence.extend(back.distribute(&found)?);

        self.missed = if self.config.track_missed_range_entities {
            range
                .iter()
                .map(|e| e.id())
                .filter(|id| correspondence.domain_entities(*id).is_empty())
                .collect()
        } else {
            Vec::new()
        };
        info!(
            range_entities = range.len(),
            candidates = imported.len(),
            records = correspondence.len(),
            missed = self.missed.len(),
            "search complete"
        );
        self.correspondence = correspondence;
        Ok(())
    }

    /// Range entities located in `domain_id`; empty if none.
    pub fn range_entities_from_domain(&self, domain_id: EntityId) -> Vec<EntityId> {
        self.correspondence.range_entities(domain_id).to_vec()
    }

    /// Domain entities containing `range_id`; empty if none.
    pub fn domain_entities_from_range(&self, range_id: EntityId) -> Vec<EntityId> {
        self.correspondence.domain_entities(range_id).to_vec()
    }

    /// Reference coordinates of `range_id` inside `domain_id`.
    ///
    /// Fails with [`SearchError::Lookup`] if the pair was not established.
    pub fn range_parametric_coordinates_in_domain(
        &self,
        domain_id: EntityId,
        range_id: EntityId,
    ) -> Result<Point<3>> {
        self.correspondence
            .parametric_coordinates(domain_id, range_id)
            .ok_or(SearchError::Lookup {
                domain: domain_id,
                range: range_id,
            })
    }

    /// Owner rank of a range entity of the last search input or of a local record.
    pub fn range_entity_owner_rank(&self, range_id: EntityId) -> Result<Rank> {
        self.correspondence
            .range_owner(range_id)
            .ok_or(SearchError::UnknownRange(range_id))
    }

    /// Range entities of the last search input that matched nothing.
    ///
    /// Always empty unless [`SearchConfig::track_missed_range_entities`] is set.
    pub fn missed_range_entities(&self) -> &[EntityId] {
        &self.missed
    }

    /// All records held by this rank.
    pub fn correspondence(&self) -> &Correspondence {
        &self.correspondence
    }

    /// Domain bounds of every rank, indexed by rank.
    pub fn domain_boxes(&self) -> &[Option<Aabb3>] {
        &self.domain_boxes
    }

    /// Number of indexed local domain entities.
    pub fn num_domain_entities(&self) -> usize {
        self.domain.len()
    }

    /// The settings this session runs with.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}
