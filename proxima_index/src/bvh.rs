// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binary radix-tree BVH over `D`-dimensional boxes.
//!
//! The hierarchy is built in linear time from Morton keys: items are sorted by
//! the key of their centroid and every internal node splits its key range at the
//! highest differing bit (Karras, "Maximizing Parallelism in the Construction of
//! BVHs, Octrees, and k-d Trees"). Each internal node is generated independently
//! of the others, so the build parallelizes over nodes.
//!
//! Nodes live in a single arena. With `n` items, internal nodes occupy
//! `[0, n - 1)` and leaves occupy `[n - 1, 2n - 1)`; the root is node `0`.

use alloc::collections::BinaryHeap;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::Debug;

#[cfg(feature = "std")]
use rayon::prelude::*;
use tracing::{debug, info_span};

use crate::error::{IndexError, Result};
use crate::morton::morton_key;
use crate::types::{Aabb, Point, union_all};

/// Bounding volume hierarchy over items identified by `P`.
///
/// Built once with [`Bvh::build`] and read-only afterwards.
pub struct Bvh<P, const D: usize> {
    nodes: Vec<Node<D>>,
    ids: Vec<P>,
    root: Option<NodeIdx>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Kind {
    /// Position of the item in sorted (Morton) order.
    Leaf(usize),
    Internal { left: NodeIdx, right: NodeIdx },
}

#[derive(Clone, Debug)]
struct Node<const D: usize> {
    bbox: Aabb<D>,
    kind: Kind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct NodeIdx(usize);

impl NodeIdx {
    const fn new(i: usize) -> Self {
        Self(i)
    }

    const fn get(self) -> usize {
        self.0
    }
}

const NO_PARENT: usize = usize::MAX;

/// One result of a k-nearest query.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Neighbor<P> {
    /// Identifier of the item.
    pub id: P,
    /// Squared distance from the query point to the item's volume.
    pub distance_squared: f64,
}

// Max-heap entry: the worst of the current best `k` sits on top.
struct Candidate<P> {
    distance_squared: f64,
    id: P,
}

impl<P: Ord> Ord for Candidate<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_squared
            .total_cmp(&other.distance_squared)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl<P: Ord> PartialOrd for Candidate<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: Ord> PartialEq for Candidate<P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<P: Ord> Eq for Candidate<P> {}

impl<P, const D: usize> Default for Bvh<P, D> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            ids: Vec::new(),
            root: None,
        }
    }
}

impl<P: Copy + Ord + Debug, const D: usize> Bvh<P, D> {
    /// Build a hierarchy over `(id, volume)` items.
    ///
    /// Zero items produce an empty tree; a single item produces a root leaf.
    /// Fails with [`IndexError::InvalidVolume`] if any volume has a NaN
    /// coordinate or is inverted.
    pub fn build<I>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, Aabb<D>)>,
    {
        let items: Vec<(P, Aabb<D>)> = items.into_iter().collect();
        let _span = info_span!("Bvh::build", n_items = items.len()).entered();

        if let Some(position) = items.iter().position(|(_, b)| !b.is_valid()) {
            return Err(IndexError::InvalidVolume { position });
        }
        let Some(scene) = union_all(items.iter().map(|(_, b)| *b)) else {
            return Ok(Self::default());
        };
        let n = items.len();

        // 1. Morton key per centroid, paired with the input position.
        let mut keyed = {
            let _s = info_span!("morton_keys").entered();
            let centroids: Vec<Point<D>> = items.iter().map(|(_, b)| b.centroid()).collect();
            morton_keys(&centroids, &scene)
        };

        // 2. Sort. The position breaks ties, so the order is deterministic.
        {
            let _s = info_span!("sort").entered();
            sort_keys(&mut keyed);
        }
        let sorted_keys: Vec<u64> = keyed.iter().map(|(k, _)| *k).collect();

        // 3. Link internal nodes.
        let links = {
            let _s = info_span!("hierarchy").entered();
            generate_hierarchy(&sorted_keys)
        };

        let mut nodes = Vec::with_capacity(2 * n - 1);
        for &(left, right) in &links {
            nodes.push(Node {
                bbox: scene,
                kind: Kind::Internal { left, right },
            });
        }
        let mut ids = Vec::with_capacity(n);
        for (leaf, &(_, position)) in keyed.iter().enumerate() {
            let (id, bbox) = items[position];
            ids.push(id);
            nodes.push(Node {
                bbox,
                kind: Kind::Leaf(leaf),
            });
        }

        let mut bvh = Self {
            nodes,
            ids,
            root: Some(NodeIdx::new(0)),
        };

        // 4. Internal volumes, bottom-up.
        if n > 1 {
            let _s = info_span!("refit").entered();
            bvh.refit(n - 1);
        }
        debug!(n_items = n, n_nodes = bvh.nodes.len(), "bvh built");
        Ok(bvh)
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the tree holds no items.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Volume of the root node (the union of every item), if any.
    pub fn bounds(&self) -> Option<Aabb<D>> {
        self.root.map(|r| self.nodes[r.get()].bbox)
    }

    /// Ids of every item whose volume intersects `volume`, boundaries inclusive.
    ///
    /// Order is unspecified; each id appears once per indexed item.
    pub fn query(&self, volume: &Aabb<D>) -> impl Iterator<Item = P> + '_ {
        let volume = *volume;
        self.collect_where(|b| b.intersects(&volume)).into_iter()
    }

    /// Ids of every item whose volume lies within `radius` of `point`.
    pub fn within_distance(&self, point: &Point<D>, radius: f64) -> impl Iterator<Item = P> + '_ {
        let point = *point;
        let r2 = radius * radius;
        self.collect_where(|b| b.distance_squared_to_point(&point) <= r2)
            .into_iter()
    }

    /// The `k` ids closest to `point`, ascending by distance then by id.
    pub fn nearest(&self, point: &Point<D>, k: usize) -> Vec<P> {
        self.nearest_with_distance(point, k)
            .into_iter()
            .map(|n| n.id)
            .collect()
    }

    /// Like [`Bvh::nearest`], reporting the squared distance of each result.
    ///
    /// Fewer than `k` items returns all of them.
    pub fn nearest_with_distance(&self, point: &Point<D>, k: usize) -> Vec<Neighbor<P>> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }
        let mut best: BinaryHeap<Candidate<P>> = BinaryHeap::with_capacity(k + 1);
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i.get()];
            let lower = node.bbox.distance_squared_to_point(point);
            if best.len() == k && best.peek().is_some_and(|w| lower > w.distance_squared) {
                continue;
            }
            match node.kind {
                Kind::Leaf(item) => {
                    let c = Candidate {
                        distance_squared: lower,
                        id: self.ids[item],
                    };
                    if best.len() < k {
                        best.push(c);
                    } else if best.peek().is_some_and(|w| c < *w) {
                        best.pop();
                        best.push(c);
                    }
                }
                Kind::Internal { left, right } => {
                    // Pop the nearer child first.
                    let (l, r) = (&self.nodes[left.get()].bbox, &self.nodes[right.get()].bbox);
                    let dl = l.distance_squared_to_point(point);
                    let dr = r.distance_squared_to_point(point);
                    if dl <= dr {
                        stack.push(right);
                        stack.push(left);
                    } else {
                        stack.push(left);
                        stack.push(right);
                    }
                }
            }
        }
        best.into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                id: c.id,
                distance_squared: c.distance_squared,
            })
            .collect()
    }

    fn collect_where(&self, keep: impl Fn(&Aabb<D>) -> bool) -> Vec<P> {
        let mut out = Vec::new();
        let Some(root) = self.root else {
            return out;
        };
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            let n = &self.nodes[i.get()];
            if !keep(&n.bbox) {
                continue;
            }
            match n.kind {
                Kind::Leaf(item) => out.push(self.ids[item]),
                Kind::Internal { left, right } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        out
    }

    /// Compute internal volumes by walking from every leaf toward the root.
    ///
    /// The first walk to reach an internal node stops there; the second one
    /// finds both children final and unions them.
    fn refit(&mut self, n_internal: usize) {
        let n_nodes = self.nodes.len();
        let mut parents = vec![NO_PARENT; n_nodes];
        for (i, node) in self.nodes[..n_internal].iter().enumerate() {
            if let Kind::Internal { left, right } = node.kind {
                parents[left.get()] = i;
                parents[right.get()] = i;
            }
        }
        let mut visited = vec![false; n_internal];
        for leaf in n_internal..n_nodes {
            let mut node = parents[leaf];
            while node != NO_PARENT {
                if !visited[node] {
                    visited[node] = true;
                    break;
                }
                if let Kind::Internal { left, right } = self.nodes[node].kind {
                    let (l, r) = (self.nodes[left.get()].bbox, self.nodes[right.get()].bbox);
                    self.nodes[node].bbox = l.union(&r);
                }
                node = parents[node];
            }
        }
    }
}

impl<P: Debug, const D: usize> Debug for Bvh<P, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bvh")
            .field("items", &self.ids.len())
            .field("arena_nodes", &self.nodes.len())
            .field("has_root", &self.root.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "std")]
fn morton_keys<const D: usize>(centroids: &[Point<D>], scene: &Aabb<D>) -> Vec<(u64, usize)> {
    centroids
        .par_iter()
        .enumerate()
        .map(|(i, c)| (morton_key(c, scene), i))
        .collect()
}

#[cfg(not(feature = "std"))]
fn morton_keys<const D: usize>(centroids: &[Point<D>], scene: &Aabb<D>) -> Vec<(u64, usize)> {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (morton_key(c, scene), i))
        .collect()
}

#[cfg(feature = "std")]
fn sort_keys(keyed: &mut [(u64, usize)]) {
    keyed.par_sort_unstable();
}

#[cfg(not(feature = "std"))]
fn sort_keys(keyed: &mut [(u64, usize)]) {
    keyed.sort_unstable();
}

#[cfg(feature = "std")]
fn generate_hierarchy(keys: &[u64]) -> Vec<(NodeIdx, NodeIdx)> {
    (0..keys.len() - 1)
        .into_par_iter()
        .map(|i| link_children(keys, i))
        .collect()
}

#[cfg(not(feature = "std"))]
fn generate_hierarchy(keys: &[u64]) -> Vec<(NodeIdx, NodeIdx)> {
    (0..keys.len() - 1)
        .map(|i| link_children(keys, i))
        .collect()
}

/// Children of internal node `i`; leaves are offset by `n - 1` in the arena.
fn link_children(keys: &[u64], i: usize) -> (NodeIdx, NodeIdx) {
    let n = keys.len();
    let (first, last) = determine_range(keys, i);
    let split = find_split(keys, first, last);
    let leaf = |j: usize| NodeIdx::new(n - 1 + j);
    let left = if split == first {
        leaf(split)
    } else {
        NodeIdx::new(split)
    };
    let right = if split + 1 == last {
        leaf(split + 1)
    } else {
        NodeIdx::new(split + 1)
    };
    (left, right)
}

/// Length of the common prefix of keys `i` and `j`, or `-1` if `j` is out of range.
///
/// Equal keys fall back to the prefix of the indices, extending the key by its position.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Leading-zero counts are at most 128."
)]
fn common_prefix(keys: &[u64], i: usize, j: isize) -> i32 {
    let Ok(j) = usize::try_from(j) else {
        return -1;
    };
    if j >= keys.len() {
        return -1;
    }
    let (a, b) = (keys[i], keys[j]);
    if a == b {
        64 + (i ^ j).leading_zeros() as i32
    } else {
        (a ^ b).leading_zeros() as i32
    }
}

/// Range of sorted items covered by internal node `i`.
#[allow(
    clippy::cast_possible_wrap,
    reason = "Item counts stay far below isize::MAX."
)]
fn determine_range(keys: &[u64], i: usize) -> (usize, usize) {
    let ii = i as isize;
    let direction: isize = if common_prefix(keys, i, ii + 1) > common_prefix(keys, i, ii - 1) {
        1
    } else {
        -1
    };

    // Upper bound for the range length.
    let min_prefix = common_prefix(keys, i, ii - direction);
    let mut max_step: isize = 2;
    while common_prefix(keys, i, ii + max_step * direction) > min_prefix {
        max_step <<= 1;
    }

    // Binary search for the other end.
    let mut offset: isize = 0;
    let mut step = max_step;
    while step > 1 {
        step >>= 1;
        if common_prefix(keys, i, ii + (offset + step) * direction) > min_prefix {
            offset += step;
        }
    }
    let j = (ii + offset * direction).unsigned_abs();
    (i.min(j), i.max(j))
}

/// Last item in `[first, last)` sharing more than the range's common prefix with `first`.
#[allow(
    clippy::cast_possible_wrap,
    reason = "Item counts stay far below isize::MAX."
)]
fn find_split(keys: &[u64], first: usize, last: usize) -> usize {
    let common = common_prefix(keys, first, last as isize);
    let mut split = first;
    let mut step = last - first;
    loop {
        step = (step + 1) >> 1;
        let candidate = split + step;
        if candidate < last && common_prefix(keys, first, candidate as isize) > common {
            split = candidate;
        }
        if step <= 1 {
            break;
        }
    }
    split
}
