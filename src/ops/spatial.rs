//! k-d tree backed neighbour queries under periodic boundaries.
//!
//! Positions are wrapped into the primary cell and loaded into an immutable
//! k-d tree. A periodic query runs against all 27 images of the query point
//! and keeps, per particle, the smallest distance seen; that is the
//! minimum-image distance as long as the search radius does not exceed half
//! the smallest box edge.

use crate::ops::pbc;
use crate::types::cloud::{PointCloud, SimBox, TopologyError};
use crate::types::neighbors::{IndexNeighborList, ListMode};
use glam::DVec3;
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use std::collections::HashMap;

/// Periodic spatial index over the positions of one `PointCloud`.
///
/// The index must be rebuilt whenever the underlying positions change;
/// `rebuild` takes `&mut self`, so it cannot overlap an outstanding query.
pub struct PeriodicKdIndex {
    tree: ImmutableKdTree<f64, 3>,
    entries: Vec<[f64; 3]>,
    sim_box: SimBox,
}

impl PeriodicKdIndex {
    /// Build an index over every particle of `cloud`.
    pub fn build(cloud: &PointCloud) -> Self {
        let entries = wrapped_entries(cloud);
        let tree = ImmutableKdTree::new_from_slice(&entries);
        Self {
            tree,
            entries,
            sim_box: cloud.sim_box,
        }
    }

    /// Replace the indexed point set with the current state of `cloud`.
    pub fn rebuild(&mut self, cloud: &PointCloud) {
        *self = Self::build(cloud);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `k` particles nearest to `query`, as `(index, distance)` sorted by
    /// increasing distance.
    pub fn nearest(&self, query: DVec3, k: usize) -> Vec<(usize, f64)> {
        if k == 0 || self.entries.is_empty() {
            return Vec::new();
        }
        let qty = k.min(self.entries.len());
        let mut best: HashMap<usize, f64> = HashMap::new();
        for image in self.images(query) {
            for n in self.tree.nearest_n::<SquaredEuclidean>(&image, qty) {
                self.keep_closest(&mut best, n.item as usize, query);
            }
        }
        let mut hits: Vec<(usize, f64)> = best.into_iter().collect();
        sort_hits(&mut hits);
        hits.truncate(qty);
        hits
    }

    /// The `k` particles nearest to particle `index`, excluding itself.
    pub fn nearest_to(&self, index: usize, k: usize) -> Result<Vec<(usize, f64)>, TopologyError> {
        let query = self.entry(index)?;
        let mut hits = self.nearest(query, k + 1);
        hits.retain(|&(i, _)| i != index);
        hits.truncate(k);
        Ok(hits)
    }

    /// All particles strictly closer than `radius` to `query`, sorted by
    /// increasing distance.
    pub fn within(&self, query: DVec3, radius: f64) -> Result<Vec<(usize, f64)>, TopologyError> {
        if !(radius > 0.0) {
            return Err(TopologyError::InvalidCutoff(radius));
        }
        let half_box = 0.5 * self.sim_box.min_length();
        if radius > half_box {
            return Err(TopologyError::RadiusBeyondHalfBox { radius, half_box });
        }
        let radius_sq = radius * radius;
        let mut best: HashMap<usize, f64> = HashMap::new();
        for image in self.images(query) {
            for n in self.tree.within::<SquaredEuclidean>(&image, radius_sq) {
                self.keep_closest(&mut best, n.item as usize, query);
            }
        }
        let mut hits: Vec<(usize, f64)> = best.into_iter().filter(|&(_, d)| d < radius).collect();
        sort_hits(&mut hits);
        Ok(hits)
    }

    /// Full index-keyed neighbour list built from radius queries. Rows are
    /// sorted by distance rather than by index.
    pub fn neighbor_list(&self, cutoff: f64) -> Result<IndexNeighborList, TopologyError> {
        let mut list = IndexNeighborList::empty(ListMode::Full, self.entries.len());
        for i in 0..self.entries.len() {
            let query = self.entry(i)?;
            for (j, d) in self.within(query, cutoff)? {
                if j != i {
                    list.push_entry(i, j, d);
                }
            }
        }
        Ok(list)
    }

    fn entry(&self, index: usize) -> Result<DVec3, TopologyError> {
        self.entries
            .get(index)
            .map(|&e| DVec3::from_array(e))
            .ok_or(TopologyError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
    }

    fn images(&self, query: DVec3) -> Vec<[f64; 3]> {
        let q = pbc::wrap_into_box(query, &self.sim_box);
        let l = self.sim_box.lengths();
        let mut images = Vec::with_capacity(27);
        for sx in -1..=1 {
            for sy in -1..=1 {
                for sz in -1..=1 {
                    let shift = DVec3::new(sx as f64, sy as f64, sz as f64) * l;
                    images.push((q + shift).to_array());
                }
            }
        }
        images
    }

    fn keep_closest(&self, best: &mut HashMap<usize, f64>, item: usize, query: DVec3) {
        let d = pbc::distance(query, DVec3::from_array(self.entries[item]), &self.sim_box);
        best.entry(item)
            .and_modify(|cur| *cur = cur.min(d))
            .or_insert(d);
    }
}

fn wrapped_entries(cloud: &PointCloud) -> Vec<[f64; 3]> {
    cloud
        .points
        .iter()
        .map(|p| pbc::wrap_into_box(p.position, &cloud.sim_box).to_array())
        .collect()
}

fn sort_hits(hits: &mut [(usize, f64)]) {
    hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
}
