//! Per-frame analysis: neighbours, rings, bonds, prism blocks and clusters.

use crate::config::AnalysisConfig;
use crate::ops::bonds::BondSet;
use crate::ops::cluster::{clusters, largest_cluster, recenter, LargestCluster};
use crate::ops::neighbors::NeighborListBuilder;
use crate::ops::prisms::{find_prism_blocks, PrismSearch};
use crate::ops::rings::{assign_polygon_types, RingRegistry};
use crate::ops::shape_match::ShapeMatcher;
use crate::types::cloud::{MotifTag, PointCloud, TopologyError};
use rayon::prelude::*;

/// Results for one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame: usize,
    /// Entries in the frame's neighbour list.
    pub neighbor_entries: usize,
    pub rings: RingRegistry,
    /// Ring count per size, from 3 up to the configured maximum.
    pub ring_counts: Vec<(usize, usize)>,
    pub bonds: BondSet,
    /// Largest-ring tag per particle.
    pub polygon_tags: Vec<MotifTag>,
    /// `None` when the prism search is switched off.
    pub prisms: Option<PrismSearch>,
    /// Polygon tag, promoted by the prism tag under the larger-ring rule.
    pub motifs: Vec<MotifTag>,
    /// Sizes of all ice-like clusters; empty when clustering is off.
    pub cluster_sizes: Vec<usize>,
    pub largest_cluster: Option<LargestCluster>,
}

/// Run the full analysis on one frame. `ring_rows` are rings as particle
/// identifiers, typically from `adapters::rings`.
pub fn analyze_frame(
    cloud: &PointCloud,
    ring_rows: &[Vec<i64>],
    config: &AnalysisConfig,
) -> Result<FrameReport, TopologyError> {
    let config = config.sanitized();

    let mut builder = NeighborListBuilder::new(config.neighbors.cutoff)?.types(config.neighbors.type_filter());
    if let Some(capacity) = config.neighbors.max_neighbors {
        builder = builder.capacity(capacity);
    }
    let neighbors = builder.build_by_index(cloud)?;

    let rings = RingRegistry::ingest(ring_rows, cloud, &neighbors);
    let mut bonds = BondSet::from_rings(rings.rings());
    if let Some(cutoff) = config.rings.bond_cutoff {
        bonds = bonds.without_long_bonds(cloud, cutoff)?;
    }
    let polygon_tags = assign_polygon_types(rings.rings(), cloud.len())?;

    let prisms = if config.shape.find_prisms {
        let matcher = ShapeMatcher::new(config.shape.rmsd_threshold)?;
        Some(find_prism_blocks(cloud, &neighbors, &rings, &matcher, config.shape.axis)?)
    } else {
        None
    };

    let mut motifs = polygon_tags.clone();
    if let Some(search) = &prisms {
        for (tag, &prism) in motifs.iter_mut().zip(&search.tags) {
            tag.promote(prism);
        }
    }

    let (cluster_sizes, largest) = if config.cluster.enabled {
        let set = clusters(&cloud.ice_flags(), &neighbors)?;
        let mut largest = largest_cluster(cloud, &neighbors, &set)?;
        if config.cluster.recenter {
            recenter(&mut largest.cloud, &largest.neighbors)?;
        }
        (set.sizes().to_vec(), Some(largest))
    } else {
        (Vec::new(), None)
    };

    log::debug!(
        "frame {}: {} rings, {} bonds, {} clusters",
        cloud.frame,
        rings.len(),
        bonds.len(),
        cluster_sizes.len()
    );

    Ok(FrameReport {
        frame: cloud.frame,
        neighbor_entries: neighbors.entry_count(),
        ring_counts: rings.ring_counts(config.rings.max_ring_size),
        rings,
        bonds,
        polygon_tags,
        prisms,
        motifs,
        cluster_sizes,
        largest_cluster: largest,
    })
}

/// Analyse independent frames in parallel. Results keep the input order.
pub fn analyze_frames(
    frames: &[(PointCloud, Vec<Vec<i64>>)],
    config: &AnalysisConfig,
) -> Vec<Result<FrameReport, TopologyError>> {
    frames
        .par_iter()
        .map(|(cloud, rings)| analyze_frame(cloud, rings, config))
        .collect()
}
