//! Prism-block search over the rings of one frame.
//!
//! Candidates are pairs of equal-size rings with no shared member in which
//! every member of each ring is bonded to exactly one member of the other.
//! Each candidate is classified with `ShapeMatcher::match_prism` against a
//! regular polygon.

use crate::ops::correspondence::{reference_polygon, Axis};
use crate::ops::rings::{has_common_elements, RingRegistry};
use crate::ops::shape_match::ShapeMatcher;
use crate::types::cloud::{MotifTag, PointCloud, TopologyError};
use crate::types::neighbors::IndexNeighborList;
use crate::types::ring::PrismBlock;

/// Everything the prism search found in one frame.
#[derive(Debug, Clone, Default)]
pub struct PrismSearch {
    /// Every candidate that was shape-matched, accepted or not.
    pub blocks: Vec<PrismBlock>,
    /// Accepted blocks per ring size, ascending by size.
    pub counts: Vec<(usize, usize)>,
    /// Per-particle tag, `Prism(n)` for members of accepted blocks.
    pub tags: Vec<MotifTag>,
    /// Lowest fit residual seen for each particle in an accepted block.
    pub per_atom_rmsd: Vec<Option<f64>>,
}

impl PrismSearch {
    pub fn accepted(&self) -> impl Iterator<Item = &PrismBlock> {
        self.blocks.iter().filter(|b| b.accepted)
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted().count()
    }
}

/// Whether every member of `a` has exactly one neighbour in `b` and vice
/// versa.
pub fn is_prism_candidate(a: &[usize], b: &[usize], neighbors: &IndexNeighborList) -> bool {
    let one_partner_each = |x: &[usize], y: &[usize]| {
        x.iter()
            .all(|&m| y.iter().filter(|&&o| neighbors.are_neighbors(m, o)).count() == 1)
    };
    a.len() == b.len() && !has_common_elements(a, b) && one_partner_each(a, b) && one_partner_each(b, a)
}

/// Classify every candidate ring pair in `registry`.
///
/// A candidate the matcher cannot handle (no correspondence, degenerate
/// geometry) is reported and skipped.
pub fn find_prism_blocks(
    cloud: &PointCloud,
    neighbors: &IndexNeighborList,
    registry: &RingRegistry,
    matcher: &ShapeMatcher,
    axis: Axis,
) -> Result<PrismSearch, TopologyError> {
    let mut search = PrismSearch {
        tags: vec![MotifTag::Unclassified; cloud.len()],
        per_atom_rmsd: vec![None; cloud.len()],
        ..PrismSearch::default()
    };

    for (size, members) in registry.group_by_size() {
        let reference = reference_polygon(size, axis);
        let mut accepted = 0usize;

        for (k, &i) in members.iter().enumerate() {
            for &j in &members[k + 1..] {
                let (a, b) = (&registry.rings()[i], &registry.rings()[j]);
                if !is_prism_candidate(a, b, neighbors) {
                    continue;
                }
                let m = match matcher.match_prism(cloud, neighbors, &reference, a, b, true) {
                    Ok(m) => m,
                    Err(e) => {
                        log::debug!("frame {}: skipping ring pair ({}, {}): {}", cloud.frame, i, j, e);
                        continue;
                    }
                };

                if m.accepted {
                    accepted += 1;
                    for &(p, d) in &m.per_atom {
                        let tag = search.tags.get_mut(p).ok_or(TopologyError::IndexOutOfRange {
                            index: p,
                            len: cloud.len(),
                        })?;
                        tag.promote(MotifTag::Prism(size));
                        let slot = &mut search.per_atom_rmsd[p];
                        *slot = Some(slot.map_or(d, |old| old.min(d)));
                    }
                }
                search.blocks.push(PrismBlock {
                    first: i,
                    second: j,
                    ring_size: size,
                    accepted: m.accepted,
                    rmsd: m.rmsd,
                });
            }
        }
        search.counts.push((size, accepted));
    }

    log::info!(
        "frame {}: {} prism blocks accepted out of {} candidates",
        cloud.frame,
        search.accepted_count(),
        search.blocks.len()
    );
    Ok(search)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::correspondence::tests::hexagonal_prism;
    use crate::ops::neighbors::neighbor_list;
    use crate::types::ring::Ring;
    use glam::DVec3;

    fn ring(members: &[usize]) -> Ring {
        Ring::new(members.to_vec()).unwrap()
    }

    #[test]
    fn test_candidate_requires_one_partner_each() {
        let cloud = hexagonal_prism(DVec3::splat(5.0), 10.0);
        let nlist = neighbor_list(&cloud, 1.1).unwrap();
        assert!(is_prism_candidate(&[0, 1, 2, 3, 4, 5], &[6, 7, 8, 9, 10, 11], &nlist));
        // shares members
        assert!(!is_prism_candidate(&[0, 1, 2, 3, 4, 5], &[0, 7, 8, 9, 10, 11], &nlist));
        // side face of the prism: 0-1-7-6 against itself shifted is not a pair of faces
        assert!(!is_prism_candidate(&[0, 1, 7, 6], &[2, 3, 9, 8], &nlist));
    }

    #[test]
    fn test_finds_hexagonal_prism() {
        let cloud = hexagonal_prism(DVec3::new(5.0, 5.0, 0.2), 10.0);
        let nlist = neighbor_list(&cloud, 1.1).unwrap();
        let registry = RingRegistry::from_rings(vec![
            ring(&[0, 1, 2, 3, 4, 5]),
            ring(&[6, 7, 8, 9, 10, 11]),
            ring(&[0, 1, 7, 6]),
        ]);
        let matcher = ShapeMatcher::new(0.1).unwrap();
        let search = find_prism_blocks(&cloud, &nlist, &registry, &matcher, Axis::Z).unwrap();

        assert_eq!(search.accepted_count(), 1);
        assert_eq!(search.counts, vec![(4, 0), (6, 1)]);
        let block = search.accepted().next().unwrap();
        assert_eq!((block.first, block.second, block.ring_size), (0, 1, 6));
        assert!(search.tags.iter().all(|t| *t == MotifTag::Prism(6)));
        assert!(search.per_atom_rmsd.iter().all(|r| r.map_or(false, |d| d < 1e-6)));
    }

    #[test]
    fn test_no_rings_no_blocks() {
        let cloud = hexagonal_prism(DVec3::splat(5.0), 10.0);
        let nlist = neighbor_list(&cloud, 1.1).unwrap();
        let search = find_prism_blocks(
            &cloud,
            &nlist,
            &RingRegistry::new(),
            &ShapeMatcher::default(),
            Axis::Z,
        )
        .unwrap();
        assert!(search.blocks.is_empty());
        assert!(search.counts.is_empty());
        assert!(search.tags.iter().all(|t| *t == MotifTag::Unclassified));
    }
}
