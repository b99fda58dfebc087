//! Core data types: particles, boxes, neighbour lists and rings.

pub mod cloud;
pub mod neighbors;
pub mod ring;

// Re-export commonly used items
pub use cloud::{IceState, MotifTag, ParticleCount, Point, PointCloud, SimBox, TopologyError};
pub use neighbors::{IdNeighborList, IndexNeighborList, ListMode, NeighborList, ParticleId};
pub use ring::{Bond, PrismBlock, Ring};
