//! Ring, bond and prism-block value types.

use super::cloud::TopologyError;
use std::collections::HashSet;
use std::ops::Deref;

/// Closed bonded loop of particle indices.
///
/// The order is the bonded traversal order; rotations and reversals of the
/// sequence describe the same physical ring.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ring {
    members: Vec<usize>,
}

impl Ring {
    /// Minimum number of members in a ring.
    pub const MIN_SIZE: usize = 3;

    pub fn new(members: Vec<usize>) -> Result<Self, TopologyError> {
        if members.len() < Self::MIN_SIZE {
            return Err(TopologyError::InvalidRing(format!(
                "{} members, need at least {}",
                members.len(),
                Self::MIN_SIZE
            )));
        }
        let mut seen = HashSet::with_capacity(members.len());
        for &m in &members {
            if !seen.insert(m) {
                return Err(TopologyError::InvalidRing(format!(
                    "member {m} appears more than once"
                )));
            }
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Cyclically adjacent member pairs, wrapping from the last back to the first.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.members.len();
        (0..n).map(move |i| (self.members[i], self.members[(i + 1) % n]))
    }

    /// Whether `a` and `b` are neighbours along the ring.
    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        self.edges()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }
}

impl Deref for Ring {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.members
    }
}

/// Unordered pair of bonded particle indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
}

impl Bond {
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }

    /// Same bond with its endpoints sorted; two bonds are the same physical
    /// bond exactly when their canonical forms are equal.
    pub fn canonical(self) -> Self {
        if self.a <= self.b {
            self
        } else {
            Self {
                a: self.b,
                b: self.a,
            }
        }
    }
}

/// A pair of equal-size rings classified as the two basal faces of a prism.
#[derive(Debug, Clone, PartialEq)]
pub struct PrismBlock {
    /// Index of the first basal ring in the ring registry.
    pub first: usize,
    /// Index of the second basal ring in the ring registry.
    pub second: usize,
    pub ring_size: usize,
    pub accepted: bool,
    pub rmsd: f64,
}
