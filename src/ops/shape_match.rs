//! Prism classification by rigid-body shape matching.
//!
//! A candidate pair of basal rings is put into correspondence, then fitted
//! against a reference shape with `kabsch_alignment`. The candidate is a
//! prism block when the RMSD of the best fit is below the threshold.

use crate::ops::correspondence::{
    average_height, average_radius, prism_block_points, reference_prism_block, relative_order,
    ring_points, Axis, RelativeOrder,
};
use crate::ops::transform::{fit_residuals, rmsd};
use crate::types::cloud::{PointCloud, TopologyError};
use crate::types::neighbors::IndexNeighborList;
use glam::DVec3;

/// Default RMSD acceptance threshold, in the units of the coordinates.
pub const DEFAULT_RMSD_THRESHOLD: f64 = 0.5;

/// RMSD differences below this are ties; the earliest offset keeps the fit.
const TIE_TOLERANCE: f64 = 1e-9;

fn improves(value: f64, best: f64) -> bool {
    value < best - TIE_TOLERANCE
}

/// Result of matching the two basal rings of a candidate against a reference
/// polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct PrismMatch {
    pub accepted: bool,
    /// RMSD over both rings' best fits.
    pub rmsd: f64,
    /// Fit residual of every member of both rings, keyed by particle index.
    pub per_atom: Vec<(usize, f64)>,
    pub order: RelativeOrder,
}

/// Result of matching a whole candidate block against a reference prism.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMatch {
    pub accepted: bool,
    pub rmsd: f64,
    /// Starting offset into the relative ordering that gave the best fit.
    pub start: usize,
    pub order: RelativeOrder,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeMatcher {
    threshold: f64,
}

impl Default for ShapeMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_RMSD_THRESHOLD,
        }
    }
}

impl ShapeMatcher {
    pub fn new(threshold: f64) -> Result<Self, TopologyError> {
        if !(threshold > 0.0) || !threshold.is_finite() {
            return Err(TopologyError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Match each basal ring against `reference`, a polygon with as many
    /// vertices as each ring.
    ///
    /// With `is_perfect` the reference is taken to be of unit radius and is
    /// scaled to the candidate's measured radius before fitting. Every
    /// starting offset of each ring is tried and the lowest RMSD kept.
    pub fn match_prism(
        &self,
        cloud: &PointCloud,
        neighbors: &IndexNeighborList,
        reference: &[DVec3],
        first: &[usize],
        second: &[usize],
        is_perfect: bool,
    ) -> Result<PrismMatch, TopologyError> {
        let order = relative_order(cloud, first, second, neighbors)?;
        let n = order.first.len();
        if reference.len() != n {
            return Err(TopologyError::RingSizeMismatch(reference.len(), n));
        }

        let scaled: Vec<DVec3>;
        let reference = if is_perfect {
            let radius = average_radius(cloud, first, second)?;
            scaled = reference.iter().map(|p| *p * radius).collect();
            &scaled[..]
        } else {
            reference
        };

        let mut per_atom = Vec::with_capacity(2 * n);
        let mut all_residuals = Vec::with_capacity(2 * n);
        for ring in [&order.first, &order.second] {
            let (start, residuals) = best_ring_fit(cloud, reference, ring)?;
            for (k, &d) in residuals.iter().enumerate() {
                per_atom.push((ring[(start + k) % n], d));
            }
            all_residuals.extend(residuals);
        }

        let value = rmsd(&all_residuals);
        Ok(PrismMatch {
            accepted: value < self.threshold,
            rmsd: value,
            per_atom,
            order,
        })
    }

    /// Match the candidate as a whole against a reference prism block
    /// (first face followed by second face, as built by
    /// `reference_prism_block`). Offsets are tried in ascending order and the
    /// first one reaching the lowest RMSD wins.
    pub fn match_prism_block(
        &self,
        cloud: &PointCloud,
        neighbors: &IndexNeighborList,
        reference: &[DVec3],
        first: &[usize],
        second: &[usize],
    ) -> Result<BlockMatch, TopologyError> {
        let order = relative_order(cloud, first, second, neighbors)?;
        let n = order.first.len();
        if reference.len() != 2 * n {
            return Err(TopologyError::RingSizeMismatch(reference.len() / 2, n));
        }

        let mut best: Option<(usize, f64)> = None;
        for start in 0..n {
            let points = prism_block_points(cloud, &order, start)?;
            let value = rmsd(&fit_residuals(reference, &points)?);
            if best.map_or(true, |(_, b)| improves(value, b)) {
                best = Some((start, value));
            }
        }
        let (start, value) = best.ok_or(TopologyError::NoCorrespondence)?;

        Ok(BlockMatch {
            accepted: value < self.threshold,
            rmsd: value,
            start,
            order,
        })
    }

    /// Build a reference prism with the candidate's measured radius and
    /// height and match the candidate against it as a block.
    pub fn match_against_measured_block(
        &self,
        cloud: &PointCloud,
        neighbors: &IndexNeighborList,
        axis: Axis,
        first: &[usize],
        second: &[usize],
    ) -> Result<BlockMatch, TopologyError> {
        let radius = average_radius(cloud, first, second)?;
        let height = average_height(cloud, first, second)?;
        let reference = reference_prism_block(first.len(), radius, height, axis);
        self.match_prism_block(cloud, neighbors, &reference, first, second)
    }
}

/// Lowest-RMSD starting offset of `ring` against `reference`, with the
/// residuals of that fit.
fn best_ring_fit(
    cloud: &PointCloud,
    reference: &[DVec3],
    ring: &[usize],
) -> Result<(usize, Vec<f64>), TopologyError> {
    let mut best: Option<(usize, f64, Vec<f64>)> = None;
    for start in 0..ring.len() {
        let points = ring_points(cloud, ring, start)?;
        let residuals = fit_residuals(reference, &points)?;
        let value = rmsd(&residuals);
        if best.as_ref().map_or(true, |(_, b, _)| improves(value, *b)) {
            best = Some((start, value, residuals));
        }
    }
    best.map(|(start, _, residuals)| (start, residuals))
        .ok_or(TopologyError::NoCorrespondence)
}
