//! Operations on point clouds, neighbour lists and rings.

pub mod bonds;
pub mod cluster;
pub mod correspondence;
pub mod neighbors;
pub mod pbc;
pub mod pipeline;
pub mod prisms;
pub mod rdf;
pub mod rings;
pub mod shape_match;
pub mod spatial;
pub mod transform;

// Re-export commonly used items
pub use bonds::{bonds_from_prisms, bonds_from_rings, BondSet};
pub use cluster::{clusters, largest_cluster, largest_ice_cluster, recenter, ClusterSet, LargestCluster};
pub use correspondence::{reference_polygon, reference_prism_block, relative_order, Axis, RelativeOrder};
pub use neighbors::{neighbor_list, NeighborListBuilder, TypeFilter};
pub use pipeline::{analyze_frame, analyze_frames, FrameReport};
pub use prisms::{find_prism_blocks, PrismSearch};
pub use rdf::Rdf;
pub use rings::{assign_polygon_types, RingRegistry};
pub use shape_match::{BlockMatch, PrismMatch, ShapeMatcher, DEFAULT_RMSD_THRESHOLD};
pub use spatial::PeriodicKdIndex;
pub use transform::{kabsch_alignment, rmsd, RigidTransform};
