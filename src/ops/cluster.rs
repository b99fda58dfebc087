//! Connected clusters of ice-like particles.
//!
//! Clusters are assembled Stoddard-style: every particle carries a `next`
//! link to the following member of its cluster, so walking the chain from a
//! cluster's head visits the whole cluster. The chain is grown with an
//! explicit breadth-first work list:
//! - seeds are taken in cloud order
//! - within a cluster, neighbours are visited in neighbour-list order
//!
//! Only ice-like particles take part; the clusters partition exactly the
//! ice-like set.

use crate::ops::pbc;
use crate::types::cloud::{PointCloud, TopologyError};
use crate::types::neighbors::{IndexNeighborList, ListMode};
use glam::DVec3;
use std::collections::VecDeque;

/// Partition of the ice-like particles of one frame into clusters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSet {
    next: Vec<Option<usize>>,
    cluster_of: Vec<Option<usize>>,
    heads: Vec<usize>,
    sizes: Vec<usize>,
}

impl ClusterSet {
    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Cluster of particle `i`, `None` for particles that are not ice-like.
    pub fn cluster_of(&self, i: usize) -> Option<usize> {
        self.cluster_of.get(i).copied().flatten()
    }

    /// Next member of the chain after `i`, `None` at the end of a cluster.
    pub fn next(&self, i: usize) -> Option<usize> {
        self.next.get(i).copied().flatten()
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Members of cluster `c` in discovery order.
    pub fn members(&self, c: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.sizes.get(c).copied().unwrap_or(0));
        let mut cursor = self.heads.get(c).copied();
        while let Some(i) = cursor {
            out.push(i);
            cursor = self.next(i);
        }
        out
    }

    /// Cluster with the most members; the first one on ties.
    pub fn largest(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (c, &size) in self.sizes.iter().enumerate() {
            if best.map_or(true, |(_, s)| size > s) {
                best = Some((c, size));
            }
        }
        best.map(|(c, _)| c)
    }
}

/// Group the particles flagged in `is_ice` into clusters connected through
/// `neighbors`. Only links between two ice-like particles count.
pub fn clusters(is_ice: &[bool], neighbors: &IndexNeighborList) -> Result<ClusterSet, TopologyError> {
    let n = neighbors.len();
    if is_ice.len() != n {
        return Err(TopologyError::CountMismatch {
            declared: n,
            stored: is_ice.len(),
        });
    }
    let full = match neighbors.mode() {
        ListMode::Full => None,
        ListMode::Half => Some(neighbors.to_full()),
    };
    let graph = full.as_ref().unwrap_or(neighbors);

    let mut set = ClusterSet {
        next: vec![None; n],
        cluster_of: vec![None; n],
        heads: Vec::new(),
        sizes: Vec::new(),
    };
    let mut queue = VecDeque::new();

    for seed in 0..n {
        if !is_ice[seed] || set.cluster_of[seed].is_some() {
            continue;
        }
        let c = set.heads.len();
        set.heads.push(seed);
        set.sizes.push(1);
        set.cluster_of[seed] = Some(c);
        let mut tail = seed;
        queue.push_back(seed);

        while let Some(i) = queue.pop_front() {
            for &nb in graph.neighbors(i) {
                if nb >= n {
                    return Err(TopologyError::IndexOutOfRange { index: nb, len: n });
                }
                if !is_ice[nb] || set.cluster_of[nb].is_some() {
                    continue;
                }
                set.cluster_of[nb] = Some(c);
                set.next[tail] = Some(nb);
                tail = nb;
                set.sizes[c] += 1;
                queue.push_back(nb);
            }
        }
    }

    log::debug!(
        "{} ice-like particles in {} clusters",
        set.sizes.iter().sum::<usize>(),
        set.len()
    );
    Ok(set)
}

/// The largest cluster as a standalone frame.
#[derive(Debug, Clone)]
pub struct LargestCluster {
    /// Only the cluster's particles, in cloud order.
    pub cloud: PointCloud,
    /// Neighbour list renumbered to `cloud`'s storage indices.
    pub neighbors: IndexNeighborList,
    /// Storage index in the source frame of each particle of `cloud`.
    pub source_indices: Vec<usize>,
}

impl LargestCluster {
    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }
}

/// Extract the largest cluster of `set`. A frame without ice-like particles
/// gives an empty cluster.
pub fn largest_cluster(
    cloud: &PointCloud,
    neighbors: &IndexNeighborList,
    set: &ClusterSet,
) -> Result<LargestCluster, TopologyError> {
    let mut members = set.largest().map(|c| set.members(c)).unwrap_or_default();
    members.sort_unstable();

    let sub = cloud.subset(&members)?;
    let sub_neighbors = neighbors.restricted_to(&members)?;
    Ok(LargestCluster {
        cloud: sub,
        neighbors: sub_neighbors,
        source_indices: members,
    })
}

/// Cluster the ice-like particles of `cloud` and extract the largest cluster.
pub fn largest_ice_cluster(
    cloud: &PointCloud,
    neighbors: &IndexNeighborList,
) -> Result<(ClusterSet, LargestCluster), TopologyError> {
    let set = clusters(&cloud.ice_flags(), neighbors)?;
    let largest = largest_cluster(cloud, neighbors, &set)?;
    Ok((set, largest))
}

/// Unwrap the cluster across periodic boundaries and move its centroid to
/// the box centre.
///
/// Each connected piece is walked breadth-first from its lowest index; every
/// newly reached particle is moved to the periodic image nearest the
/// particle it was reached from, so each particle is shifted exactly once.
/// Neighbour indices are checked before anything moves.
pub fn recenter(cluster: &mut PointCloud, neighbors: &IndexNeighborList) -> Result<(), TopologyError> {
    let n = cluster.len();
    if neighbors.len() != n {
        return Err(TopologyError::CountMismatch {
            declared: n,
            stored: neighbors.len(),
        });
    }
    if n == 0 {
        return Ok(());
    }
    let full = match neighbors.mode() {
        ListMode::Full => None,
        ListMode::Half => Some(neighbors.to_full()),
    };
    let graph = full.as_ref().unwrap_or(neighbors);
    if let Some(&nb) = (0..n).flat_map(|i| graph.neighbors(i)).find(|&&nb| nb >= n) {
        return Err(TopologyError::IndexOutOfRange { index: nb, len: n });
    }
    let sim_box = cluster.sim_box;

    let mut visited = vec![false; n];
    let mut queue = VecDeque::new();
    for root in 0..n {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        queue.push_back(root);
        while let Some(i) = queue.pop_front() {
            let anchor = cluster.points[i].position;
            for &nb in graph.neighbors(i) {
                if visited[nb] {
                    continue;
                }
                visited[nb] = true;
                let p = &mut cluster.points[nb].position;
                *p = pbc::nearest_image(anchor, *p, &sim_box);
                queue.push_back(nb);
            }
        }
    }

    let positions: Vec<DVec3> = cluster.positions();
    let shift = sim_box.center() - pbc::centroid(&positions);
    for p in &mut cluster.points {
        p.position += shift;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::correspondence::tests::hexagonal_prism;
    use crate::ops::neighbors::{neighbor_list, NeighborListBuilder};
    use crate::types::cloud::{IceState, Point, SimBox};
    use approx::assert_relative_eq;

    /// Chain of `n` particles one unit apart along x starting at `x0`.
    fn chain(x0: f64, n: usize, first_id: i64) -> Vec<Point> {
        (0..n)
            .map(|k| Point::new(first_id + k as i64, 1, DVec3::new(x0 + k as f64, 5.0, 5.0)))
            .collect()
    }

    /// Two ice chains (3 and 2 particles) separated by water.
    fn two_cluster_cloud() -> PointCloud {
        let mut points = chain(1.0, 3, 1);
        points.extend(chain(6.0, 2, 10));
        points.push(Point::new(20, 1, DVec3::new(4.0, 5.0, 5.0)));
        for p in points.iter_mut().take(5) {
            p.ice = IceState::Ice;
        }
        PointCloud::from_points(points, SimBox::cubic(12.0).unwrap(), 0).unwrap()
    }

    #[test]
    fn test_clusters_partition_ice_particles() {
        let cloud = two_cluster_cloud();
        let nlist = neighbor_list(&cloud, 1.1).unwrap();
        let set = clusters(&cloud.ice_flags(), &nlist).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.sizes(), &[3, 2]);
        let mut seen = vec![0; cloud.len()];
        for c in 0..set.len() {
            for i in set.members(c) {
                seen[i] += 1;
                assert_eq!(set.cluster_of(i), Some(c));
            }
        }
        assert_eq!(seen, vec![1, 1, 1, 1, 1, 0]);
        assert_eq!(set.cluster_of(5), None);
    }

    #[test]
    fn test_chain_follows_breadth_first_order() {
        let cloud = two_cluster_cloud();
        let nlist = neighbor_list(&cloud, 1.1).unwrap();
        let set = clusters(&cloud.ice_flags(), &nlist).unwrap();
        assert_eq!(set.next(0), Some(1));
        assert_eq!(set.next(1), Some(2));
        assert_eq!(set.next(2), None);
        assert_eq!(set.members(1), vec![3, 4]);
    }

    #[test]
    fn test_water_bridge_does_not_join_clusters() {
        // particle 5 at x=4 links chain ends only through water
        let cloud = two_cluster_cloud();
        let nlist = neighbor_list(&cloud, 2.1).unwrap();
        let set = clusters(&cloud.ice_flags(), &nlist).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_half_list_gives_same_partition() {
        let cloud = two_cluster_cloud();
        let half = NeighborListBuilder::new(1.1)
            .unwrap()
            .half()
            .build_by_index(&cloud)
            .unwrap();
        let full = neighbor_list(&cloud, 1.1).unwrap();
        let flags = cloud.ice_flags();
        assert_eq!(
            clusters(&flags, &half).unwrap().sizes(),
            clusters(&flags, &full).unwrap().sizes()
        );
    }

    #[test]
    fn test_mismatched_flags_rejected() {
        let cloud = two_cluster_cloud();
        let nlist = neighbor_list(&cloud, 1.1).unwrap();
        assert!(matches!(
            clusters(&[true, false], &nlist),
            Err(TopologyError::CountMismatch { .. })
        ));
    }

    #[test]
    fn test_largest_cluster_extraction() {
        let cloud = two_cluster_cloud();
        let nlist = neighbor_list(&cloud, 1.1).unwrap();
        let (set, largest) = largest_ice_cluster(&cloud, &nlist).unwrap();
        assert!(set.sizes().iter().all(|&s| s <= largest.len()));
        assert_eq!(largest.len(), 3);
        assert_eq!(largest.source_indices, vec![0, 1, 2]);
        assert_eq!(largest.cloud.index_of(2), Some(1));
        assert_eq!(largest.neighbors.neighbors(1), &[0, 2]);
    }

    #[test]
    fn test_largest_cluster_without_ice_is_empty() {
        let points = chain(1.0, 4, 1);
        let cloud = PointCloud::from_points(points, SimBox::cubic(10.0).unwrap(), 0).unwrap();
        let nlist = neighbor_list(&cloud, 1.1).unwrap();
        let (set, largest) = largest_ice_cluster(&cloud, &nlist).unwrap();
        assert!(set.is_empty());
        assert!(largest.is_empty());
        assert!(largest.neighbors.is_empty());
    }

    #[test]
    fn test_recenter_unwraps_across_boundary() {
        // chain of 4 particles straddling the x boundary
        let xs = [9.0, 9.8, 0.6, 1.4];
        let points: Vec<Point> = xs
            .iter()
            .enumerate()
            .map(|(k, &x)| Point::new(k as i64 + 1, 1, DVec3::new(x, 5.0, 5.0)))
            .collect();
        let mut cloud = PointCloud::from_points(points, SimBox::cubic(10.0).unwrap(), 0).unwrap();
        let nlist = neighbor_list(&cloud, 1.0).unwrap();
        recenter(&mut cloud, &nlist).unwrap();

        let xs: Vec<f64> = cloud.points.iter().map(|p| p.position.x).collect();
        for k in 1..xs.len() {
            assert_relative_eq!(xs[k] - xs[k - 1], 0.8, epsilon = 1e-9);
        }
        let c = pbc::centroid(&cloud.positions());
        assert_relative_eq!(c.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(c.y, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_recenter_cyclic_cluster_across_corner() {
        // both hexagons and the rungs form cycles; the prism wraps in x, y and z
        let mut cloud = hexagonal_prism(DVec3::new(0.1, 9.9, 0.2), 10.0);
        let nlist = neighbor_list(&cloud, 1.1).unwrap();
        assert_eq!(nlist.entry_count(), 36);
        recenter(&mut cloud, &nlist).unwrap();

        let positions = cloud.positions();
        for i in 0..nlist.len() {
            for &j in nlist.neighbors(i) {
                let raw = positions[j] - positions[i];
                let image = pbc::delta(positions[i], positions[j], &cloud.sim_box);
                assert_relative_eq!(raw.x, image.x, epsilon = 1e-9);
                assert_relative_eq!(raw.y, image.y, epsilon = 1e-9);
                assert_relative_eq!(raw.z, image.z, epsilon = 1e-9);
                assert_relative_eq!(raw.length(), 1.0, epsilon = 1e-9);
            }
        }
        let c = pbc::centroid(&positions);
        assert_relative_eq!(c.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(c.z, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_recenter_rejects_bad_index_without_moving() {
        let points = chain(9.0, 3, 1);
        let mut cloud = PointCloud::from_points(points, SimBox::cubic(10.0).unwrap(), 0).unwrap();
        let before = cloud.positions();

        let mut nlist = IndexNeighborList::empty(ListMode::Full, 3);
        nlist.push_entry(0, 1, 1.0);
        nlist.push_entry(1, 0, 1.0);
        nlist.push_entry(2, 99, 1.0);
        assert!(matches!(
            recenter(&mut cloud, &nlist),
            Err(TopologyError::IndexOutOfRange { index: 99, len: 3 })
        ));
        assert_eq!(cloud.positions(), before);
    }
}
