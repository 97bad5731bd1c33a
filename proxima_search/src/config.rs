// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Search and pairing settings.
//!
//! Both structs deserialize with `serde`, so a host application can keep them
//! in its own configuration file. Missing fields take their defaults.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::Dimension;
use crate::error::{Result, SearchError};

/// Settings for a [`ParallelSearch`](crate::ParallelSearch).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Geometric tolerance.
    ///
    /// A range entity's query box is widened by `tolerance` times its largest
    /// extent, and by at least `tolerance`. The same value widens the valid
    /// reference domain of each candidate.
    pub tolerance: f64,
    /// Only index domain entities of this dimension.
    pub domain_dimension: Option<Dimension>,
    /// Only search for range entities of this dimension.
    pub range_dimension: Option<Dimension>,
    /// Record local range entities that matched nothing anywhere.
    pub track_missed_range_entities: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-6,
            domain_dimension: None,
            range_dimension: None,
            track_missed_range_entities: false,
        }
    }
}

impl SearchConfig {
    /// Set [`SearchConfig::tolerance`].
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set [`SearchConfig::domain_dimension`].
    #[must_use]
    pub fn with_domain_dimension(mut self, dimension: Dimension) -> Self {
        self.domain_dimension = Some(dimension);
        self
    }

    /// Set [`SearchConfig::range_dimension`].
    #[must_use]
    pub fn with_range_dimension(mut self, dimension: Dimension) -> Self {
        self.range_dimension = Some(dimension);
        self
    }

    /// Set [`SearchConfig::track_missed_range_entities`].
    #[must_use]
    pub fn with_missed_range_tracking(mut self, track: bool) -> Self {
        self.track_missed_range_entities = track;
        self
    }

    /// Reject a negative or non-finite tolerance.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SearchError::UnsupportedConfig(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// How a [`PointCloudPairing`](crate::PointCloudPairing) picks sources.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchType {
    /// Every source within a fixed radius.
    #[default]
    #[serde(rename = "Radius")]
    Radius,
    /// The `k` nearest sources.
    #[serde(rename = "Nearest Neighbor")]
    NearestNeighbor,
}

impl SearchType {
    /// The configuration string for this search type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Radius => "Radius",
            Self::NearestNeighbor => "Nearest Neighbor",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Radius" => Ok(Self::Radius),
            "Nearest Neighbor" => Ok(Self::NearestNeighbor),
            other => Err(SearchError::UnsupportedConfig(format!(
                "unknown search type {other:?}"
            ))),
        }
    }
}

/// Settings for a [`PointCloudPairing`](crate::PointCloudPairing).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Radius or nearest-neighbour selection.
    pub search_type: SearchType,
    /// Support radius; required for [`SearchType::Radius`].
    pub radius: Option<f64>,
    /// Neighbour count; required for [`SearchType::NearestNeighbor`].
    pub num_neighbors: Option<usize>,
    /// Only use domain (source) entities of this dimension.
    pub domain_dimension: Option<Dimension>,
    /// Only use range (target) entities of this dimension.
    pub range_dimension: Option<Dimension>,
}

/// A validated pairing rule.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PairingMode {
    /// Sources within this radius.
    Radius(f64),
    /// This many nearest sources.
    Nearest(usize),
}

impl PairingConfig {
    /// Radius pairing.
    pub fn radius(radius: f64) -> Self {
        Self {
            search_type: SearchType::Radius,
            radius: Some(radius),
            ..Self::default()
        }
    }

    /// Nearest-neighbour pairing.
    pub fn nearest(num_neighbors: usize) -> Self {
        Self {
            search_type: SearchType::NearestNeighbor,
            num_neighbors: Some(num_neighbors),
            ..Self::default()
        }
    }

    /// Check that the parameter required by the search type is present and sane.
    pub fn validate(&self) -> Result<PairingMode> {
        match self.search_type {
            SearchType::Radius => match self.radius {
                Some(r) if r.is_finite() && r >= 0.0 => Ok(PairingMode::Radius(r)),
                Some(r) => Err(SearchError::UnsupportedConfig(format!(
                    "radius must be finite and non-negative, got {r}"
                ))),
                None => Err(SearchError::UnsupportedConfig(
                    "radius search requires `radius`".into(),
                )),
            },
            SearchType::NearestNeighbor => match self.num_neighbors {
                Some(k) if k > 0 => Ok(PairingMode::Nearest(k)),
                Some(_) => Err(SearchError::UnsupportedConfig(
                    "`num_neighbors` must be positive".into(),
                )),
                None => Err(SearchError::UnsupportedConfig(
                    "nearest neighbor search requires `num_neighbors`".into(),
                )),
            },
        }
    }
}
