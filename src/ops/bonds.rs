//! Bond connectivity derived from ring and prism membership.
//!
//! Bonds are not inferred from distances alone: every bond comes from two
//! particles being cyclically adjacent in some ring, or from the inter-ring
//! links of an accepted prism block. Distance only serves as a filter.

use crate::ops::pbc;
use crate::ops::rings::RingRegistry;
use crate::types::cloud::{PointCloud, TopologyError};
use crate::types::neighbors::IndexNeighborList;
use crate::types::ring::{Bond, PrismBlock, Ring};
use std::collections::HashSet;

/// Cyclically adjacent member pairs of every ring. Bonds shared by several
/// rings appear once per ring.
pub fn bonds_from_rings(rings: &[Ring]) -> Vec<Bond> {
    rings
        .iter()
        .flat_map(|ring| ring.edges().map(|(a, b)| Bond::new(a, b)))
        .collect()
}

/// Drop repeated bonds, treating `(a, b)` and `(b, a)` as the same bond.
/// Bonds come back in canonical form, in order of first appearance.
pub fn dedupe(bonds: &[Bond]) -> Vec<Bond> {
    let mut seen = HashSet::with_capacity(bonds.len());
    bonds
        .iter()
        .map(|b| b.canonical())
        .filter(|b| seen.insert(*b))
        .collect()
}

/// Drop bonds joining two members of the same ring that are not adjacent
/// along that ring.
pub fn remove_diagonals(rings: &[Ring], bonds: &[Bond]) -> Vec<Bond> {
    bonds
        .iter()
        .copied()
        .filter(|bond| {
            !rings.iter().any(|ring| {
                ring.contains(&bond.a) && ring.contains(&bond.b) && !ring.are_adjacent(bond.a, bond.b)
            })
        })
        .collect()
}

/// Drop bonds whose minimum-image length exceeds `cutoff`.
pub fn remove_long_bonds(
    cloud: &PointCloud,
    bonds: &[Bond],
    cutoff: f64,
) -> Result<Vec<Bond>, TopologyError> {
    let mut kept = Vec::with_capacity(bonds.len());
    for bond in bonds {
        let a = cloud.position(bond.a)?;
        let b = cloud.position(bond.b)?;
        if pbc::distance(a, b, &cloud.sim_box) <= cutoff {
            kept.push(*bond);
        }
    }
    let dropped = bonds.len() - kept.len();
    if dropped > 0 {
        log::debug!(
            "frame {}: dropped {} bonds longer than {}",
            cloud.frame,
            dropped,
            cutoff
        );
    }
    Ok(kept)
}

/// Basal and axial bonds of the accepted prism blocks.
///
/// Basal bonds are the ring edges of both faces; axial bonds join a member of
/// one face to a neighbour-listed member of the other.
pub fn bonds_from_prisms(
    blocks: &[PrismBlock],
    registry: &RingRegistry,
    neighbors: &IndexNeighborList,
) -> Result<Vec<Bond>, TopologyError> {
    let mut bonds = Vec::new();
    for block in blocks.iter().filter(|b| b.accepted) {
        let first = ring_at(registry, block.first)?;
        let second = ring_at(registry, block.second)?;
        bonds.extend(first.edges().map(|(a, b)| Bond::new(a, b)));
        bonds.extend(second.edges().map(|(a, b)| Bond::new(a, b)));
        for &a in first.iter() {
            for &b in second.iter() {
                if neighbors.are_neighbors(a, b) {
                    bonds.push(Bond::new(a, b));
                }
            }
        }
    }
    Ok(dedupe(&bonds))
}

fn ring_at(registry: &RingRegistry, i: usize) -> Result<&Ring, TopologyError> {
    registry.get(i).ok_or(TopologyError::IndexOutOfRange {
        index: i,
        len: registry.len(),
    })
}

/// Deduplicated bond list of one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BondSet {
    bonds: Vec<Bond>,
}

impl BondSet {
    /// Ring-derived bonds with ring diagonals removed.
    pub fn from_rings(rings: &[Ring]) -> Self {
        let bonds = dedupe(&bonds_from_rings(rings));
        Self {
            bonds: remove_diagonals(rings, &bonds),
        }
    }

    pub fn from_bonds(bonds: &[Bond]) -> Self {
        Self {
            bonds: dedupe(bonds),
        }
    }

    /// Keep only bonds no longer than `cutoff`.
    pub fn without_long_bonds(self, cloud: &PointCloud, cutoff: f64) -> Result<Self, TopologyError> {
        Ok(Self {
            bonds: remove_long_bonds(cloud, &self.bonds, cutoff)?,
        })
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    /// Bonds as pairs of trajectory identifiers, for output.
    pub fn to_id_pairs(&self, cloud: &PointCloud) -> Result<Vec<(i64, i64)>, TopologyError> {
        self.bonds
            .iter()
            .map(|b| Ok((cloud.get(b.a)?.id, cloud.get(b.b)?.id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::neighbors::neighbor_list;
    use crate::types::cloud::{Point, SimBox};
    use glam::DVec3;

    fn ring(members: &[usize]) -> Ring {
        Ring::new(members.to_vec()).unwrap()
    }

    fn b(a: usize, c: usize) -> Bond {
        Bond::new(a, c)
    }

    #[test]
    fn test_bonds_from_ring() {
        let bonds = bonds_from_rings(&[ring(&[1, 2, 3, 4, 5, 6])]);
        assert_eq!(
            bonds,
            vec![b(1, 2), b(2, 3), b(3, 4), b(4, 5), b(5, 6), b(6, 1)]
        );
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let bonds = vec![b(1, 2), b(2, 1), b(3, 4)];
        let once = dedupe(&bonds);
        assert_eq!(once, vec![b(1, 2), b(3, 4)]);
        assert_eq!(dedupe(&once), once);
    }

    #[test]
    fn test_shared_edges_dedupe() {
        let rings = vec![ring(&[1, 2, 3, 4]), ring(&[3, 4, 5, 6])];
        let set = BondSet::from_rings(&rings);
        assert_eq!(set.len(), 7);
    }

    #[test]
    fn test_remove_diagonals() {
        let rings = vec![ring(&[1, 2, 3, 4, 5, 6])];
        let mut bonds = bonds_from_rings(&rings);
        bonds.push(b(1, 4));
        bonds.push(b(6, 7));
        let kept = remove_diagonals(&rings, &bonds);
        assert_eq!(kept.len(), 7);
        assert!(!kept.contains(&b(1, 4)));
        assert!(kept.contains(&b(6, 7)));
    }

    #[test]
    fn test_remove_long_bonds_uses_minimum_image() {
        let points = vec![
            Point::new(1, 1, DVec3::new(0.5, 5.0, 5.0)),
            Point::new(2, 1, DVec3::new(9.5, 5.0, 5.0)),
            Point::new(3, 1, DVec3::new(5.0, 5.0, 5.0)),
        ];
        let cloud = PointCloud::from_points(points, SimBox::cubic(10.0).unwrap(), 0).unwrap();
        let kept = remove_long_bonds(&cloud, &[b(0, 1), b(0, 2)], 1.5).unwrap();
        assert_eq!(kept, vec![b(0, 1)]);
        assert!(remove_long_bonds(&cloud, &[b(0, 9)], 1.5).is_err());

        let ids = BondSet::from_bonds(&kept).to_id_pairs(&cloud).unwrap();
        assert_eq!(ids, vec![(1, 2)]);
    }

    #[test]
    fn test_bonds_from_prisms() {
        // two stacked squares of side 1, one unit apart
        let mut points = Vec::new();
        for (layer, z) in [4.0, 5.0].iter().enumerate() {
            for (k, (x, y)) in [(4.0, 4.0), (5.0, 4.0), (5.0, 5.0), (4.0, 5.0)].iter().enumerate() {
                let id = (layer * 4 + k + 1) as i64;
                points.push(Point::new(id, 1, DVec3::new(*x, *y, *z)));
            }
        }
        let cloud = PointCloud::from_points(points, SimBox::cubic(10.0).unwrap(), 0).unwrap();
        let nlist = neighbor_list(&cloud, 1.1).unwrap();
        let registry = RingRegistry::from_rings(vec![ring(&[0, 1, 2, 3]), ring(&[4, 5, 6, 7])]);
        let block = PrismBlock {
            first: 0,
            second: 1,
            ring_size: 4,
            accepted: true,
            rmsd: 0.0,
        };
        let bonds = bonds_from_prisms(&[block.clone()], &registry, &nlist).unwrap();
        assert_eq!(bonds.len(), 12);
        assert!(bonds.contains(&b(0, 4)));

        let rejected = PrismBlock {
            accepted: false,
            ..block
        };
        assert!(bonds_from_prisms(&[rejected], &registry, &nlist)
            .unwrap()
            .is_empty());
    }
}
