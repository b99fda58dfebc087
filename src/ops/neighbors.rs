//! Brute-force periodic neighbour lists.
//!
//! Every unordered pair of particles is tested once against the cutoff using
//! the minimum-image distance. O(n^2) is the reference path; see
//! `ops::spatial` for the k-d tree backed queries.

use crate::ops::pbc;
use crate::types::cloud::{PointCloud, TopologyError};
use crate::types::neighbors::{
    IdNeighborList, IndexNeighborList, ListMode, NeighborList, ParticleId,
};
use std::hash::Hash;

/// Restriction on which particle types may form a neighbouring pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    /// Both members must have this type.
    Single(i32),
    /// One member must have the first type and the other the second.
    Pair(i32, i32),
}

impl TypeFilter {
    /// Build from the optional pair of type IDs used in configuration.
    pub fn from_options(type_a: Option<i32>, type_b: Option<i32>) -> Self {
        match (type_a, type_b) {
            (Some(a), Some(b)) if a == b => TypeFilter::Single(a),
            (Some(a), Some(b)) => TypeFilter::Pair(a, b),
            (Some(a), None) | (None, Some(a)) => TypeFilter::Single(a),
            (None, None) => TypeFilter::All,
        }
    }

    pub fn accepts(self, type_i: i32, type_j: i32) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Single(a) => type_i == a && type_j == a,
            TypeFilter::Pair(a, b) => {
                (type_i == a && type_j == b) || (type_i == b && type_j == a)
            }
        }
    }

    /// Fall back to `All` when a requested type matches no particle.
    pub fn resolve(self, cloud: &PointCloud) -> Self {
        let missing: Vec<i32> = match self {
            TypeFilter::All => Vec::new(),
            TypeFilter::Single(a) => vec![a],
            TypeFilter::Pair(a, b) => vec![a, b],
        }
        .into_iter()
        .filter(|&t| !cloud.has_type(t))
        .collect();

        if missing.is_empty() {
            self
        } else {
            log::warn!(
                "frame {}: type id(s) {:?} match no particle, using all types",
                cloud.frame,
                missing
            );
            TypeFilter::All
        }
    }
}

/// Configurable brute-force neighbour list construction.
#[derive(Debug, Clone)]
pub struct NeighborListBuilder {
    cutoff: f64,
    filter: TypeFilter,
    mode: ListMode,
    capacity: Option<usize>,
}

impl NeighborListBuilder {
    /// Full list, all types, no capacity limit. The cutoff must be positive.
    pub fn new(cutoff: f64) -> Result<Self, TopologyError> {
        if !(cutoff > 0.0) || !cutoff.is_finite() {
            return Err(TopologyError::InvalidCutoff(cutoff));
        }
        Ok(Self {
            cutoff,
            filter: TypeFilter::All,
            mode: ListMode::Full,
            capacity: None,
        })
    }

    pub fn types(mut self, filter: TypeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn mode(mut self, mode: ListMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn half(self) -> Self {
        self.mode(ListMode::Half)
    }

    /// Maximum neighbours allowed per particle. Exceeding it is an error.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Neighbour list keyed by storage index.
    pub fn build_by_index(&self, cloud: &PointCloud) -> Result<IndexNeighborList, TopologyError> {
        self.fill(cloud, (0..cloud.len()).collect())
    }

    /// Neighbour list keyed by trajectory identifier.
    pub fn build_by_id(&self, cloud: &PointCloud) -> Result<IdNeighborList, TopologyError> {
        self.fill(cloud, cloud.points.iter().map(|p| ParticleId(p.id)).collect())
    }

    fn fill<K: Copy + Eq + Hash>(
        &self,
        cloud: &PointCloud,
        centrals: Vec<K>,
    ) -> Result<NeighborList<K>, TopologyError> {
        let filter = self.filter.resolve(cloud);
        let n = cloud.len();
        let cutoff_sq = self.cutoff * self.cutoff;
        let mut list = NeighborList::with_centrals(self.mode, centrals);

        for i in 0..n {
            let pi = &cloud.points[i];
            for j in (i + 1)..n {
                let pj = &cloud.points[j];
                if !filter.accepts(pi.type_id, pj.type_id) {
                    continue;
                }
                let d2 = pbc::distance_squared(pi.position, pj.position, &cloud.sim_box);
                if d2 < cutoff_sq {
                    list.record_pair(i, j, d2.sqrt());
                }
            }
        }

        if let Some(capacity) = self.capacity {
            list.check_capacity(capacity)?;
        }
        log::debug!(
            "frame {}: neighbour list with {} entries for {} particles (cutoff {})",
            cloud.frame,
            list.entry_count(),
            n,
            self.cutoff
        );
        Ok(list)
    }
}

/// Full index-keyed neighbour list over all particle types.
pub fn neighbor_list(cloud: &PointCloud, cutoff: f64) -> Result<IndexNeighborList, TopologyError> {
    NeighborListBuilder::new(cutoff)?.build_by_index(cloud)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cloud::{Point, SimBox};
    use glam::DVec3;

    fn two_particle_cloud() -> PointCloud {
        let points = vec![
            Point::new(1, 1, DVec3::new(0.5, 5.0, 5.0)),
            Point::new(2, 1, DVec3::new(9.5, 5.0, 5.0)),
        ];
        PointCloud::from_points(points, SimBox::cubic(10.0).unwrap(), 0).unwrap()
    }

    fn mixed_cloud() -> PointCloud {
        let points = vec![
            Point::new(1, 1, DVec3::new(1.0, 1.0, 1.0)),
            Point::new(2, 2, DVec3::new(2.0, 1.0, 1.0)),
            Point::new(3, 1, DVec3::new(1.0, 2.0, 1.0)),
            Point::new(4, 2, DVec3::new(8.0, 8.0, 8.0)),
        ];
        PointCloud::from_points(points, SimBox::cubic(10.0).unwrap(), 0).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_cutoff() {
        assert_eq!(
            NeighborListBuilder::new(0.0).unwrap_err(),
            TopologyError::InvalidCutoff(0.0)
        );
        assert!(NeighborListBuilder::new(-1.0).is_err());
    }

    #[test]
    fn test_pair_across_boundary() {
        let cloud = two_particle_cloud();
        let list = neighbor_list(&cloud, 1.5).unwrap();
        assert_eq!(list.neighbors(0), &[1]);
        assert_eq!(list.neighbors(1), &[0]);
        assert!((list.distances(0)[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_half_list_records_once() {
        let cloud = two_particle_cloud();
        let list = NeighborListBuilder::new(1.5)
            .unwrap()
            .half()
            .build_by_index(&cloud)
            .unwrap();
        assert_eq!(list.neighbors(0), &[1]);
        assert!(list.neighbors(1).is_empty());
    }

    #[test]
    fn test_by_id_rows() {
        let cloud = two_particle_cloud();
        let list = NeighborListBuilder::new(1.5)
            .unwrap()
            .build_by_id(&cloud)
            .unwrap();
        assert_eq!(list.rows_with_central(), vec![vec![1, 2], vec![2, 1]]);
        assert_eq!(list.to_index(&cloud).unwrap(), neighbor_list(&cloud, 1.5).unwrap());
    }

    #[test]
    fn test_type_filters() {
        let cloud = mixed_cloud();
        let all = neighbor_list(&cloud, 1.5).unwrap();
        assert_eq!(all.neighbors(0), &[1, 2]);

        let same = NeighborListBuilder::new(1.5)
            .unwrap()
            .types(TypeFilter::Single(1))
            .build_by_index(&cloud)
            .unwrap();
        assert_eq!(same.neighbors(0), &[2]);
        assert!(same.neighbors(1).is_empty());

        let cross = NeighborListBuilder::new(1.5)
            .unwrap()
            .types(TypeFilter::Pair(1, 2))
            .build_by_index(&cloud)
            .unwrap();
        assert_eq!(cross.neighbors(0), &[1]);
        assert_eq!(cross.neighbors(1), &[0, 2]);
    }

    #[test]
    fn test_unknown_type_falls_back_to_all() {
        let cloud = mixed_cloud();
        let list = NeighborListBuilder::new(1.5)
            .unwrap()
            .types(TypeFilter::Single(9))
            .build_by_index(&cloud)
            .unwrap();
        assert_eq!(list, neighbor_list(&cloud, 1.5).unwrap());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let cloud = mixed_cloud();
        let err = NeighborListBuilder::new(1.5)
            .unwrap()
            .capacity(1)
            .build_by_index(&cloud)
            .unwrap_err();
        assert!(matches!(err, TopologyError::NeighborCapacityExceeded { .. }));
    }

    #[test]
    fn test_filter_from_options() {
        assert_eq!(TypeFilter::from_options(None, None), TypeFilter::All);
        assert_eq!(TypeFilter::from_options(Some(2), None), TypeFilter::Single(2));
        assert_eq!(TypeFilter::from_options(Some(2), Some(2)), TypeFilter::Single(2));
        assert_eq!(TypeFilter::from_options(Some(1), Some(2)), TypeFilter::Pair(1, 2));
    }
}
