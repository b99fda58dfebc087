//! Structural analysis of ice and water snapshots from molecular-dynamics
//! trajectories: periodic neighbour lists, primitive-ring validation, bonds,
//! prism-block detection by shape matching, and ice-like cluster analysis.

pub mod adapters;
pub mod config;
pub mod ops;
pub mod types;

pub use config::{AnalysisConfig, ConfigError};
pub use types::cloud::{IceState, MotifTag, Point, PointCloud, SimBox, TopologyError};
