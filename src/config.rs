//! Analysis parameters, loaded from TOML.
//!
//! Every field has a default, so an empty file (or `AnalysisConfig::default()`)
//! is a complete configuration.
//!
//! # Example TOML
//! ```toml
//! [neighbors]
//! cutoff = 3.5
//! type_a = 2
//!
//! [rings]
//! max_ring_size = 6
//!
//! [shape]
//! rmsd_threshold = 0.35
//! axis = "z"
//!
//! [cluster]
//! recenter = true
//! ```

use crate::ops::correspondence::Axis;
use crate::ops::neighbors::TypeFilter;
use crate::ops::shape_match::DEFAULT_RMSD_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Root configuration for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub neighbors: NeighborConfig,
    #[serde(default)]
    pub rings: RingConfig,
    #[serde(default)]
    pub shape: ShapeConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub rdf: RdfConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborConfig {
    /// Neighbour (hydrogen-bond) distance cutoff.
    pub cutoff: f64,
    pub type_a: Option<i32>,
    pub type_b: Option<i32>,
    /// Fatal upper bound on neighbours per particle.
    pub max_neighbors: Option<usize>,
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            cutoff: 3.5,
            type_a: None,
            type_b: None,
            max_neighbors: None,
        }
    }
}

impl NeighborConfig {
    pub fn type_filter(&self) -> TypeFilter {
        TypeFilter::from_options(self.type_a, self.type_b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Largest ring size reported in per-size counts.
    pub max_ring_size: usize,
    /// Bonds longer than this are dropped; `None` keeps every ring bond.
    pub bond_cutoff: Option<f64>,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            max_ring_size: 6,
            bond_cutoff: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    pub rmsd_threshold: f64,
    pub axis: Axis,
    /// Whether to search ring pairs for prism blocks at all.
    pub find_prisms: bool,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            rmsd_threshold: DEFAULT_RMSD_THRESHOLD,
            axis: Axis::Z,
            find_prisms: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub enabled: bool,
    /// Unwrap and centre the largest cluster.
    pub recenter: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            recenter: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RdfConfig {
    pub binwidth: f64,
    pub max_radius: Option<f64>,
    pub volume: Option<f64>,
}

impl Default for RdfConfig {
    fn default() -> Self {
        Self {
            binwidth: 0.05,
            max_radius: None,
            volume: None,
        }
    }
}

impl AnalysisConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Copy of `self` with unusable values reported and replaced by their
    /// defaults.
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        let defaults = Self::default();

        if !positive(out.neighbors.cutoff) {
            log::warn!(
                "neighbour cutoff {} must be positive, using {}",
                out.neighbors.cutoff,
                defaults.neighbors.cutoff
            );
            out.neighbors.cutoff = defaults.neighbors.cutoff;
        }
        if out.rings.max_ring_size < 3 {
            log::warn!(
                "max ring size {} is below 3, using {}",
                out.rings.max_ring_size,
                defaults.rings.max_ring_size
            );
            out.rings.max_ring_size = defaults.rings.max_ring_size;
        }
        if let Some(c) = out.rings.bond_cutoff.filter(|&c| !positive(c)) {
            log::warn!("bond cutoff {c} must be positive, keeping all bonds");
            out.rings.bond_cutoff = None;
        }
        if !positive(out.shape.rmsd_threshold) {
            log::warn!(
                "rmsd threshold {} must be positive, using {}",
                out.shape.rmsd_threshold,
                defaults.shape.rmsd_threshold
            );
            out.shape.rmsd_threshold = defaults.shape.rmsd_threshold;
        }
        if !positive(out.rdf.binwidth) {
            log::warn!(
                "rdf bin width {} must be positive, using {}",
                out.rdf.binwidth,
                defaults.rdf.binwidth
            );
            out.rdf.binwidth = defaults.rdf.binwidth;
        }
        out
    }
}

fn positive(v: f64) -> bool {
    v > 0.0 && v.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_is_default() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.neighbors.type_filter(), TypeFilter::All);
    }

    #[test]
    fn test_partial_sections() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [neighbors]
            cutoff = 3.2
            type_a = 2

            [shape]
            axis = "x"

            [cluster]
            recenter = true
            "#,
        )
        .unwrap();
        assert_eq!(config.neighbors.cutoff, 3.2);
        assert_eq!(config.neighbors.type_filter(), TypeFilter::Single(2));
        assert_eq!(config.shape.axis, Axis::X);
        assert_eq!(config.shape.rmsd_threshold, DEFAULT_RMSD_THRESHOLD);
        assert!(config.cluster.enabled);
        assert!(config.cluster.recenter);
    }

    #[test]
    fn test_sanitized_replaces_bad_values() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [neighbors]
            cutoff = -1.0
            [rings]
            max_ring_size = 2
            bond_cutoff = 0.0
            [shape]
            rmsd_threshold = 0.0
            "#,
        )
        .unwrap()
        .sanitized();
        let defaults = AnalysisConfig::default();
        assert_eq!(config.neighbors.cutoff, defaults.neighbors.cutoff);
        assert_eq!(config.rings.max_ring_size, 6);
        assert_eq!(config.rings.bond_cutoff, None);
        assert_eq!(config.shape.rmsd_threshold, defaults.shape.rmsd_threshold);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            AnalysisConfig::from_toml_str("[neighbors]\ncutoff = \"far\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            AnalysisConfig::from_file("/nonexistent/analysis.toml"),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rdf]\nbinwidth = 0.1\nmax_radius = 8.0").unwrap();
        let config = AnalysisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.rdf.binwidth, 0.1);
        assert_eq!(config.rdf.max_radius, Some(8.0));
    }
}
