//! Ordered point sets for shape comparison.
//!
//! Shape matching needs two things from a candidate prism block:
//! - a one-to-one ordering of the two basal rings, so that position `k` in the
//!   first ring sits across from position `k` in the second
//! - the coordinates of those members, unwrapped so that a ring straddling
//!   the periodic boundary stays contiguous
//!
//! Reference shapes are regular polygons of unit radius centred on the
//! origin, lying in the plane perpendicular to the chosen axis.

use crate::ops::pbc;
use crate::types::cloud::{PointCloud, TopologyError};
use crate::types::neighbors::IndexNeighborList;
use crate::types::ring::Ring;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Axis along which the prisms are assumed to be stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> DVec3 {
        let mut v = DVec3::ZERO;
        v[self.index()] = 1.0;
        v
    }
}

/// Vertices of a regular `n`-gon of unit radius around the origin, in the
/// plane perpendicular to `axis`, listed counter-clockwise.
pub fn reference_polygon(n: usize, axis: Axis) -> Vec<DVec3> {
    let k = axis.index();
    let (u, v) = ((k + 1) % 3, (k + 2) % 3);
    (0..n)
        .map(|i| {
            let phi = i as f64 * TAU / n as f64;
            let mut p = DVec3::ZERO;
            p[u] = phi.cos();
            p[v] = phi.sin();
            p
        })
        .collect()
}

/// Two regular `n`-gons of the given radius, stacked `height` apart along
/// `axis`. The first face is listed first.
pub fn reference_prism_block(n: usize, radius: f64, height: f64, axis: Axis) -> Vec<DVec3> {
    let polygon: Vec<DVec3> = reference_polygon(n, axis)
        .into_iter()
        .map(|p| p * radius)
        .collect();
    let offset = axis.unit() * height;
    polygon
        .iter()
        .copied()
        .chain(polygon.iter().map(|p| *p + offset))
        .collect()
}

/// Coordinates of `ring` beginning at position `start` and wrapping around,
/// each the nearest image of the first one. An out-of-range `start` is read
/// as 0.
pub fn ring_points(cloud: &PointCloud, ring: &[usize], start: usize) -> Result<Vec<DVec3>, TopologyError> {
    let raw = rotated(ring, start)
        .into_iter()
        .map(|i| cloud.position(i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(pbc::unwrap_about_first(&raw, &cloud.sim_box))
}

/// Coordinates of a prism block: the first basal ring from `start`, then the
/// second basal ring from the same position, all unwrapped about the first
/// point.
pub fn prism_block_points(
    cloud: &PointCloud,
    order: &RelativeOrder,
    start: usize,
) -> Result<Vec<DVec3>, TopologyError> {
    let members: Vec<usize> = rotated(&order.first, start)
        .into_iter()
        .chain(rotated(&order.second, start))
        .collect();
    let raw = members
        .iter()
        .map(|&i| cloud.position(i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(pbc::unwrap_about_first(&raw, &cloud.sim_box))
}

fn rotated(ring: &[usize], start: usize) -> Vec<usize> {
    let n = ring.len();
    let start = if start < n { start } else { 0 };
    (0..n).map(|k| ring[(start + k) % n]).collect()
}

/// Member orderings of two basal rings such that `first[k]` is bonded across
/// the block to `second[k]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeOrder {
    pub first: Vec<usize>,
    pub second: Vec<usize>,
}

/// Establish the correspondence between two basal rings.
///
/// The first ring is rotated to start at its first member with a bonded
/// partner in the second ring (the nearest one when there are several). The
/// second ring then starts at that partner and runs in whichever direction
/// puts the next member across from its own bonded partner; when the
/// neighbour list cannot decide, the direction with the smaller summed
/// distance wins.
pub fn relative_order(
    cloud: &PointCloud,
    first: &[usize],
    second: &[usize],
    neighbors: &IndexNeighborList,
) -> Result<RelativeOrder, TopologyError> {
    if first.len() != second.len() {
        return Err(TopologyError::RingSizeMismatch(first.len(), second.len()));
    }
    let n = first.len();
    if n < Ring::MIN_SIZE {
        return Err(TopologyError::InvalidRing(format!("{n} members, need at least {}", Ring::MIN_SIZE)));
    }
    let dist = |a: usize, b: usize| -> Result<f64, TopologyError> {
        Ok(pbc::distance(cloud.position(a)?, cloud.position(b)?, &cloud.sim_box))
    };

    let mut anchor = None;
    for (i, &a) in first.iter().enumerate() {
        let mut best: Option<(usize, f64)> = None;
        for (j, &b) in second.iter().enumerate() {
            if neighbors.are_neighbors(a, b) {
                let d = dist(a, b)?;
                if best.map_or(true, |(_, bd)| d < bd) {
                    best = Some((j, d));
                }
            }
        }
        if let Some((j, _)) = best {
            anchor = Some((i, j));
            break;
        }
    }
    let (i0, j0) = anchor.ok_or(TopologyError::NoCorrespondence)?;

    let out_first = rotated(first, i0);
    let forward: Vec<usize> = (0..n).map(|k| second[(j0 + k) % n]).collect();
    let reversed: Vec<usize> = (0..n).map(|k| second[(j0 + n - k) % n]).collect();

    let fwd_bonded = neighbors.are_neighbors(out_first[1], forward[1]);
    let rev_bonded = neighbors.are_neighbors(out_first[1], reversed[1]);
    let use_forward = match (fwd_bonded, rev_bonded) {
        (true, false) => true,
        (false, true) => false,
        _ => {
            let mut sum_fwd = 0.0;
            let mut sum_rev = 0.0;
            for k in 0..n {
                sum_fwd += dist(out_first[k], forward[k])?;
                sum_rev += dist(out_first[k], reversed[k])?;
            }
            sum_fwd <= sum_rev
        }
    };

    Ok(RelativeOrder {
        first: out_first,
        second: if use_forward { forward } else { reversed },
    })
}

/// Mean distance of the members of both rings from their own ring's centroid.
pub fn average_radius(cloud: &PointCloud, first: &[usize], second: &[usize]) -> Result<f64, TopologyError> {
    let mut total = 0.0;
    let mut count = 0usize;
    for ring in [first, second] {
        let points = ring_points(cloud, ring, 0)?;
        let c = pbc::centroid(&points);
        total += points.iter().map(|p| p.distance(c)).sum::<f64>();
        count += points.len();
    }
    if count == 0 {
        return Ok(0.0);
    }
    Ok(total / count as f64)
}

/// Minimum-image distance between the centroids of the two basal rings.
pub fn average_height(cloud: &PointCloud, first: &[usize], second: &[usize]) -> Result<f64, TopologyError> {
    let c1 = pbc::centroid(&ring_points(cloud, first, 0)?);
    let c2 = pbc::centroid(&ring_points(cloud, second, 0)?);
    Ok(pbc::distance(c1, c2, &cloud.sim_box))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ops::neighbors::neighbor_list;
    use crate::types::cloud::{Point, SimBox};
    use approx::assert_relative_eq;

    /// Hexagonal prism of radius 1 and height 1 along z, centred at `center`.
    /// Indices 0..6 form the lower ring, 6..12 the upper ring.
    pub(crate) fn hexagonal_prism(center: DVec3, box_len: f64) -> PointCloud {
        let mut points = Vec::new();
        for layer in 0..2 {
            for k in 0..6 {
                let phi = k as f64 * TAU / 6.0;
                let pos = center + DVec3::new(phi.cos(), phi.sin(), layer as f64 - 0.5);
                let id = (layer * 6 + k + 1) as i64;
                points.push(Point::new(id, 1, pbc::wrap_into_box(pos, &SimBox::cubic(box_len).unwrap())));
            }
        }
        PointCloud::from_points(points, SimBox::cubic(box_len).unwrap(), 0).unwrap()
    }

    #[test]
    fn test_reference_polygon_orientation() {
        let hex = reference_polygon(6, Axis::Z);
        assert_eq!(hex.len(), 6);
        for p in &hex {
            assert_relative_eq!(p.length(), 1.0, epsilon = 1e-12);
            assert_eq!(p.z, 0.0);
        }
        let square = reference_polygon(4, Axis::X);
        assert!(square.iter().all(|p| p.x == 0.0));
        assert_relative_eq!(square[1].z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reference_prism_block() {
        let block = reference_prism_block(5, 2.0, 3.0, Axis::Y);
        assert_eq!(block.len(), 10);
        assert_relative_eq!(block[5].y - block[0].y, 3.0, epsilon = 1e-12);
        assert_relative_eq!(block[0].length(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ring_points_unwrap_across_boundary() {
        let cloud = hexagonal_prism(DVec3::new(0.2, 5.0, 5.0), 10.0);
        let ring: Vec<usize> = (0..6).collect();
        let points = ring_points(&cloud, &ring, 3).unwrap();
        assert_eq!(points.len(), 6);
        let c = pbc::centroid(&points);
        for p in &points {
            assert_relative_eq!(p.distance(c), 1.0, epsilon = 1e-9);
        }
        // out of range start reads as 0
        assert_eq!(
            ring_points(&cloud, &ring, 17).unwrap(),
            ring_points(&cloud, &ring, 0).unwrap()
        );
    }

    #[test]
    fn test_relative_order_pairs_bonded_members() {
        let cloud = hexagonal_prism(DVec3::splat(5.0), 10.0);
        let nlist = neighbor_list(&cloud, 1.1).unwrap();
        let lower = [0, 1, 2, 3, 4, 5];
        // upper ring listed from a different member and in reverse
        let upper = [9, 8, 7, 6, 11, 10];
        let order = relative_order(&cloud, &lower, &upper, &nlist).unwrap();
        assert_eq!(order.first, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(order.second, vec![6, 7, 8, 9, 10, 11]);
        for k in 0..6 {
            assert!(nlist.are_neighbors(order.first[k], order.second[k]));
        }
    }

    #[test]
    fn test_relative_order_errors() {
        let cloud = hexagonal_prism(DVec3::splat(5.0), 10.0);
        let nlist = neighbor_list(&cloud, 1.1).unwrap();
        assert_eq!(
            relative_order(&cloud, &[0, 1, 2], &[6, 7, 8, 9], &nlist),
            Err(TopologyError::RingSizeMismatch(3, 4))
        );
        let empty = IndexNeighborList::empty(nlist.mode(), cloud.len());
        assert_eq!(
            relative_order(&cloud, &[0, 1, 2, 3, 4, 5], &[6, 7, 8, 9, 10, 11], &empty),
            Err(TopologyError::NoCorrespondence)
        );
    }

    #[test]
    fn test_block_descriptors() {
        let cloud = hexagonal_prism(DVec3::new(9.8, 5.0, 5.0), 10.0);
        let lower = [0, 1, 2, 3, 4, 5];
        let upper = [6, 7, 8, 9, 10, 11];
        assert_relative_eq!(average_radius(&cloud, &lower, &upper).unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(average_height(&cloud, &lower, &upper).unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_prism_block_points_layout() {
        let cloud = hexagonal_prism(DVec3::splat(5.0), 10.0);
        let order = RelativeOrder {
            first: vec![0, 1, 2, 3, 4, 5],
            second: vec![6, 7, 8, 9, 10, 11],
        };
        let points = prism_block_points(&cloud, &order, 2).unwrap();
        assert_eq!(points.len(), 12);
        assert_relative_eq!(points[0].distance(cloud.points[2].position), 0.0, epsilon = 1e-12);
        assert_relative_eq!(points[6].distance(cloud.points[8].position), 0.0, epsilon = 1e-12);
    }
}
