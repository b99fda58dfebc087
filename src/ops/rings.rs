//! Ring set algebra, validation and per-particle polygon typing.
//!
//! Rings come from an external enumeration as rows of particle identifiers.
//! `RingRegistry::ingest` turns them into index-based `Ring`s for one frame,
//! dropping rows that do not describe a bonded loop of the neighbour graph.

use crate::types::cloud::{MotifTag, PointCloud, TopologyError};
use crate::types::neighbors::IndexNeighborList;
use crate::types::ring::{Bond, Ring};
use std::collections::{BTreeMap, HashSet};

/// Rings with exactly `size` members, in their original order.
pub fn filter_by_size(rings: &[Ring], size: usize) -> Vec<Ring> {
    rings.iter().filter(|r| r.len() == size).cloned().collect()
}

/// Members of `a` that are also in `b`, in the order they appear in `a`.
pub fn common_elements(a: &[usize], b: &[usize]) -> Vec<usize> {
    let in_b: HashSet<usize> = b.iter().copied().collect();
    a.iter().copied().filter(|m| in_b.contains(m)).collect()
}

pub fn has_common_elements(a: &[usize], b: &[usize]) -> bool {
    a.iter().any(|m| b.contains(m))
}

/// Whether some particle belongs to all three rings.
pub fn common_elements_across_three(a: &[usize], b: &[usize], c: &[usize]) -> bool {
    let ab = common_elements(a, b);
    if ab.is_empty() {
        return false;
    }
    !common_elements(&ab, c).is_empty()
}

/// Whether `triplet` appears as three consecutive members of the cyclic
/// sequence `ring`, read forwards or backwards.
pub fn contains_triplet(ring: &[usize], triplet: [usize; 3]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let reversed = [triplet[2], triplet[1], triplet[0]];
    (0..n).any(|i| {
        let window = [ring[i], ring[(i + 1) % n], ring[(i + 2) % n]];
        window == triplet || window == reversed
    })
}

/// Same members irrespective of order.
pub fn rings_equal(a: &[usize], b: &[usize]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// Positions of the rings of each size, keyed by size.
pub fn group_by_size(rings: &[Ring]) -> BTreeMap<usize, Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, ring) in rings.iter().enumerate() {
        groups.entry(ring.len()).or_default().push(i);
    }
    groups
}

/// Per-particle polygon tag: each member of a ring is tagged with the size of
/// the largest ring it belongs to; particles in no ring stay unclassified.
pub fn assign_polygon_types(rings: &[Ring], n_particles: usize) -> Result<Vec<MotifTag>, TopologyError> {
    let mut tags = vec![MotifTag::Unclassified; n_particles];
    for ring in rings {
        for &m in ring.iter() {
            let tag = tags.get_mut(m).ok_or(TopologyError::IndexOutOfRange {
                index: m,
                len: n_particles,
            })?;
            tag.promote(MotifTag::Ring(ring.len()));
        }
    }
    Ok(tags)
}

/// Validated, deduplicated rings of one frame.
#[derive(Debug, Clone, Default)]
pub struct RingRegistry {
    rings: Vec<Ring>,
}

impl RingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry over already index-based rings. Rings equal to an earlier
    /// one are dropped.
    pub fn from_rings(rings: Vec<Ring>) -> Self {
        let mut registry = Self::new();
        for ring in rings {
            registry.insert(ring);
        }
        registry
    }

    /// Build from rows of particle identifiers.
    ///
    /// A row is skipped (and reported) when it names an unknown identifier,
    /// is not a valid ring, or has a cyclically adjacent pair that is not in
    /// `neighbors`. Rows equal to an earlier accepted ring are dropped.
    pub fn ingest(rows: &[Vec<i64>], cloud: &PointCloud, neighbors: &IndexNeighborList) -> Self {
        let bonded = bonded_pairs(neighbors);
        let mut registry = Self::new();
        let mut skipped = 0usize;
        let mut duplicates = 0usize;

        for (line, row) in rows.iter().enumerate() {
            let ring = match ring_from_ids(row, cloud) {
                Ok(ring) => ring,
                Err(e) => {
                    log::warn!("frame {}: skipping ring {}: {}", cloud.frame, line, e);
                    skipped += 1;
                    continue;
                }
            };
            if let Some((a, b)) = ring
                .edges()
                .find(|&(a, b)| !bonded.contains(&Bond::new(a, b).canonical()))
            {
                log::warn!(
                    "frame {}: skipping ring {}: members {} and {} are not neighbours",
                    cloud.frame,
                    line,
                    cloud.points[a].id,
                    cloud.points[b].id
                );
                skipped += 1;
                continue;
            }
            if !registry.insert(ring) {
                duplicates += 1;
            }
        }

        log::debug!(
            "frame {}: {} rings accepted, {} skipped, {} duplicates",
            cloud.frame,
            registry.len(),
            skipped,
            duplicates
        );
        registry
    }

    /// Add `ring` unless an equal ring is already present.
    pub fn insert(&mut self, ring: Ring) -> bool {
        if self.rings.iter().any(|r| rings_equal(r, &ring)) {
            return false;
        }
        self.rings.push(ring);
        true
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn get(&self, i: usize) -> Option<&Ring> {
        self.rings.get(i)
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn group_by_size(&self) -> BTreeMap<usize, Vec<usize>> {
        group_by_size(&self.rings)
    }

    /// Registry positions of the rings with `size` members.
    pub fn of_size(&self, size: usize) -> Vec<usize> {
        self.rings
            .iter()
            .enumerate()
            .filter(|(_, r)| r.len() == size)
            .map(|(i, _)| i)
            .collect()
    }

    /// Distinct ring sizes present, ascending.
    pub fn sizes(&self) -> Vec<usize> {
        self.group_by_size().into_keys().collect()
    }

    pub fn max_size(&self) -> Option<usize> {
        self.rings.iter().map(|r| r.len()).max()
    }

    /// Number of rings of every size from 3 up to `max_size`, including
    /// sizes with no rings.
    pub fn ring_counts(&self, max_size: usize) -> Vec<(usize, usize)> {
        let groups = self.group_by_size();
        (Ring::MIN_SIZE..=max_size)
            .map(|n| (n, groups.get(&n).map_or(0, Vec::len)))
            .collect()
    }
}

fn ring_from_ids(row: &[i64], cloud: &PointCloud) -> Result<Ring, TopologyError> {
    let members = row
        .iter()
        .map(|&id| cloud.require_index(id))
        .collect::<Result<Vec<_>, _>>()?;
    Ring::new(members)
}

fn bonded_pairs(neighbors: &IndexNeighborList) -> HashSet<Bond> {
    let mut pairs = HashSet::with_capacity(neighbors.entry_count());
    for row in 0..neighbors.len() {
        let central = neighbors.central(row);
        for &nb in neighbors.neighbors(row) {
            pairs.insert(Bond::new(central, nb).canonical());
        }
    }
    pairs
}
