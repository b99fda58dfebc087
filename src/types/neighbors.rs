//! Neighbour list representations.
//!
//! Two keyings are kept apart at the type level:
//! - `IdNeighborList` stores trajectory identifiers and is the form handed to
//!   external consumers.
//! - `IndexNeighborList` stores storage indices into one specific
//!   `PointCloud` and is what every internal algorithm consumes.
//!
//! Both have one row per particle, in cloud order. A `Full` list records a
//! pair in the rows of both members; a `Half` list records it once, in the row
//! of the member that comes first in the cloud.

use super::cloud::{PointCloud, TopologyError};
use std::collections::HashMap;
use std::hash::Hash;

/// Newtype for trajectory-assigned particle identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub i64);

/// Whether each neighbouring pair is stored once or from both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    Full,
    Half,
}

/// Row-per-particle neighbour list keyed by `K`.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborList<K> {
    mode: ListMode,
    centrals: Vec<K>,
    neighbors: Vec<Vec<K>>,
    distances: Vec<Vec<f64>>,
}

pub type IdNeighborList = NeighborList<ParticleId>;
pub type IndexNeighborList = NeighborList<usize>;

impl<K: Copy + Eq + Hash> NeighborList<K> {
    /// Empty list with one (empty) row per central particle.
    pub fn with_centrals(mode: ListMode, centrals: Vec<K>) -> Self {
        let n = centrals.len();
        Self {
            mode,
            centrals,
            neighbors: vec![Vec::new(); n],
            distances: vec![Vec::new(); n],
        }
    }

    pub fn mode(&self) -> ListMode {
        self.mode
    }

    /// Number of rows (one per particle).
    pub fn len(&self) -> usize {
        self.centrals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centrals.is_empty()
    }

    pub fn central(&self, row: usize) -> K {
        self.centrals[row]
    }

    /// Neighbours recorded in `row`, without the central particle.
    pub fn neighbors(&self, row: usize) -> &[K] {
        &self.neighbors[row]
    }

    /// Distances parallel to `neighbors(row)`.
    pub fn distances(&self, row: usize) -> &[f64] {
        &self.distances[row]
    }

    /// Total number of stored entries across all rows.
    pub fn entry_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum()
    }

    pub(crate) fn push_entry(&mut self, row: usize, neighbor: K, distance: f64) {
        self.neighbors[row].push(neighbor);
        self.distances[row].push(distance);
    }

    /// Record the pair `(row_a, row_b)` according to the list mode.
    pub(crate) fn record_pair(&mut self, row_a: usize, row_b: usize, distance: f64) {
        let (first, second) = if row_a <= row_b {
            (row_a, row_b)
        } else {
            (row_b, row_a)
        };
        let second_key = self.centrals[second];
        self.push_entry(first, second_key, distance);
        if self.mode == ListMode::Full {
            let first_key = self.centrals[first];
            self.push_entry(second, first_key, distance);
        }
    }

    /// Fail if any row holds more than `capacity` neighbours.
    pub fn check_capacity(&self, capacity: usize) -> Result<(), TopologyError> {
        for (row, list) in self.neighbors.iter().enumerate() {
            if list.len() > capacity {
                return Err(TopologyError::NeighborCapacityExceeded {
                    particle: row,
                    count: list.len(),
                    capacity,
                });
            }
        }
        Ok(())
    }

    /// Convert to a half list, keeping each pair in the row of whichever
    /// member comes first in the cloud.
    pub fn to_half(&self) -> Self {
        if self.mode == ListMode::Half {
            return self.clone();
        }
        let rows = self.row_lookup();
        let mut half = Self::with_centrals(ListMode::Half, self.centrals.clone());
        for row in 0..self.len() {
            for (k, &nb) in self.neighbors[row].iter().enumerate() {
                if let Some(&other) = rows.get(&nb) {
                    if row < other {
                        half.push_entry(row, nb, self.distances[row][k]);
                    }
                }
            }
        }
        half
    }

    /// Convert to a full list by mirroring every recorded pair.
    pub fn to_full(&self) -> Self {
        if self.mode == ListMode::Full {
            return self.clone();
        }
        let rows = self.row_lookup();
        let mut full = Self::with_centrals(ListMode::Full, self.centrals.clone());
        for row in 0..self.len() {
            for (k, &nb) in self.neighbors[row].iter().enumerate() {
                if let Some(&other) = rows.get(&nb) {
                    full.record_pair(row, other, self.distances[row][k]);
                }
            }
        }
        full
    }

    fn row_lookup(&self) -> HashMap<K, usize> {
        self.centrals
            .iter()
            .enumerate()
            .map(|(row, &k)| (k, row))
            .collect()
    }
}

impl IndexNeighborList {
    /// Empty index-keyed list with one row per particle.
    pub fn empty(mode: ListMode, n: usize) -> Self {
        Self::with_centrals(mode, (0..n).collect())
    }

    /// Whether `a` and `b` are recorded as neighbours, in either row.
    pub fn are_neighbors(&self, a: usize, b: usize) -> bool {
        let in_row = |x: usize, y: usize| self.neighbors.get(x).map_or(false, |r| r.contains(&y));
        in_row(a, b) || in_row(b, a)
    }

    /// Internal row format: neighbour indices only, the central particle is
    /// implied by the row position and is NOT included.
    pub fn rows(&self) -> Vec<Vec<usize>> {
        self.neighbors.clone()
    }

    /// Re-key by trajectory identifier.
    pub fn to_ids(&self, cloud: &PointCloud) -> Result<IdNeighborList, TopologyError> {
        let id_of = |i: usize| cloud.get(i).map(|p| ParticleId(p.id));
        let centrals = self
            .centrals
            .iter()
            .map(|&i| id_of(i))
            .collect::<Result<Vec<_>, _>>()?;
        let mut out = IdNeighborList::with_centrals(self.mode, centrals);
        for row in 0..self.len() {
            for (k, &nb) in self.neighbors[row].iter().enumerate() {
                out.push_entry(row, id_of(nb)?, self.distances[row][k]);
            }
        }
        Ok(out)
    }

    /// Restrict to `members` (indices into the original cloud) and renumber
    /// so that `members[i]` becomes index `i`. Entries pointing outside the
    /// member set are dropped.
    pub fn restricted_to(&self, members: &[usize]) -> Result<IndexNeighborList, TopologyError> {
        let remap: HashMap<usize, usize> = members
            .iter()
            .enumerate()
            .map(|(new, &old)| (old, new))
            .collect();
        let mut out = IndexNeighborList::empty(self.mode, members.len());
        for (new_row, &old_row) in members.iter().enumerate() {
            if old_row >= self.len() {
                return Err(TopologyError::IndexOutOfRange {
                    index: old_row,
                    len: self.len(),
                });
            }
            for (k, nb) in self.neighbors[old_row].iter().enumerate() {
                if let Some(&new_nb) = remap.get(nb) {
                    out.push_entry(new_row, new_nb, self.distances[old_row][k]);
                }
            }
        }
        Ok(out)
    }
}

impl IdNeighborList {
    /// External row format: every row starts with the central identifier,
    /// followed by its neighbours.
    pub fn rows_with_central(&self) -> Vec<Vec<i64>> {
        self.centrals
            .iter()
            .zip(&self.neighbors)
            .map(|(c, nbs)| {
                let mut row = Vec::with_capacity(nbs.len() + 1);
                row.push(c.0);
                row.extend(nbs.iter().map(|n| n.0));
                row
            })
            .collect()
    }

    /// Re-key by storage index in `cloud`. Rows are reordered to cloud order.
    pub fn to_index(&self, cloud: &PointCloud) -> Result<IndexNeighborList, TopologyError> {
        let mut out = IndexNeighborList::empty(self.mode, cloud.len());
        for row in 0..self.len() {
            let central = cloud.require_index(self.centrals[row].0)?;
            for (k, nb) in self.neighbors[row].iter().enumerate() {
                let nb_index = cloud.require_index(nb.0)?;
                out.push_entry(central, nb_index, self.distances[row][k]);
            }
        }
        Ok(out)
    }
}
