//! Core data structures for a single trajectory frame.
//!
//! A frame is a `PointCloud`: an ordered list of `Point`s inside an
//! orthogonal periodic `SimBox`. Every point carries a stable, trajectory
//! assigned identifier; its storage index is its position in `points` and is
//! only meaningful for the frame it was read in.

use glam::DVec3;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised by the core analysis types and operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("box length along axis {axis} must be positive, got {length}")]
    InvalidBox { axis: usize, length: f64 },
    #[error("cutoff must be positive, got {0}")]
    InvalidCutoff(f64),
    #[error("search radius {radius} exceeds half the smallest box length {half_box}")]
    RadiusBeyondHalfBox { radius: f64, half_box: f64 },
    #[error("duplicate particle identifier {0}")]
    DuplicateIdentifier(i64),
    #[error("unknown particle identifier {0}")]
    UnknownIdentifier(i64),
    #[error("index {index} out of range for {len} particles")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("particle {particle} has {count} neighbours, capacity is {capacity}")]
    NeighborCapacityExceeded {
        particle: usize,
        count: usize,
        capacity: usize,
    },
    #[error("invalid ring: {0}")]
    InvalidRing(String),
    #[error("threshold must be positive, got {0}")]
    InvalidThreshold(f64),
    #[error("histogram bin width must be positive, got {0}")]
    InvalidBinWidth(f64),
    #[error("ring sizes differ: {0} and {1}")]
    RingSizeMismatch(usize, usize),
    #[error("no bonded correspondence between the two rings")]
    NoCorrespondence,
    #[error("point sets cannot be aligned: {0}")]
    DegenerateAlignment(String),
    #[error("particle count has not been initialized")]
    Uninitialized,
    #[error("declared {declared} particles but {stored} are stored")]
    CountMismatch { declared: usize, stored: usize },
}

/// Classification of a particle by an external order-parameter analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IceState {
    #[default]
    Water,
    Ice,
}

impl IceState {
    pub fn from_flag(is_ice: bool) -> Self {
        if is_ice {
            IceState::Ice
        } else {
            IceState::Water
        }
    }

    pub fn is_ice(self) -> bool {
        self == IceState::Ice
    }
}

/// Structural motif assigned to a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MotifTag {
    #[default]
    Unclassified,
    /// Member of a primitive ring with this many nodes.
    Ring(usize),
    /// Member of an accepted prism block built from rings of this size.
    Prism(usize),
}

impl MotifTag {
    /// Integer code written for downstream tools. Unclassified particles get 1.
    pub fn code(self) -> i32 {
        match self {
            MotifTag::Unclassified => 1,
            MotifTag::Ring(n) | MotifTag::Prism(n) => n as i32,
        }
    }

    /// Ring size backing this tag, if any.
    pub fn size(self) -> Option<usize> {
        match self {
            MotifTag::Unclassified => None,
            MotifTag::Ring(n) | MotifTag::Prism(n) => Some(n),
        }
    }

    /// Replace `self` with `candidate` when unclassified or when the candidate
    /// belongs to a strictly larger ring. A prism tag also replaces a ring
    /// tag of the same size, which leaves `code()` unchanged. Returns true if
    /// the tag changed.
    pub fn promote(&mut self, candidate: MotifTag) -> bool {
        let replace = match (*self, candidate) {
            (_, MotifTag::Unclassified) => false,
            (MotifTag::Unclassified, _) => true,
            (MotifTag::Ring(current), MotifTag::Prism(new)) => new >= current,
            (current, new) => new.size() > current.size(),
        };
        if replace {
            *self = candidate;
        }
        replace
    }
}

/// Single particle of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Trajectory-assigned identifier, stable across frames.
    pub id: i64,
    pub position: DVec3,
    pub type_id: i32,
    pub mol_id: i64,
    pub in_slice: bool,
    pub ice: IceState,
    pub motif: MotifTag,
}

impl Point {
    pub fn new(id: i64, type_id: i32, position: DVec3) -> Self {
        Self {
            id,
            position,
            type_id,
            mol_id: id,
            in_slice: true,
            ice: IceState::Water,
            motif: MotifTag::Unclassified,
        }
    }
}

/// Orthogonal periodic simulation box.
///
/// Edge lengths are validated at construction, so every `SimBox` in
/// circulation has strictly positive lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimBox {
    lengths: DVec3,
    low: DVec3,
    tilt: Option<[f64; 3]>,
}

impl SimBox {
    /// Box with lower corner at the origin.
    pub fn new(lengths: DVec3) -> Result<Self, TopologyError> {
        for axis in 0..3 {
            let length = lengths[axis];
            if !(length > 0.0) || !length.is_finite() {
                return Err(TopologyError::InvalidBox { axis, length });
            }
        }
        Ok(Self {
            lengths,
            low: DVec3::ZERO,
            tilt: None,
        })
    }

    pub fn cubic(length: f64) -> Result<Self, TopologyError> {
        Self::new(DVec3::splat(length))
    }

    /// Box spanning `low..high` along each axis.
    pub fn from_bounds(low: DVec3, high: DVec3) -> Result<Self, TopologyError> {
        Ok(Self::new(high - low)?.with_low(low))
    }

    pub fn with_low(mut self, low: DVec3) -> Self {
        self.low = low;
        self
    }

    /// Attach triclinic tilt factors. They are carried through unchanged;
    /// distance calculations treat the box as orthogonal.
    pub fn with_tilt(mut self, tilt: [f64; 3]) -> Self {
        self.tilt = Some(tilt);
        self
    }

    pub fn lengths(&self) -> DVec3 {
        self.lengths
    }

    pub fn low(&self) -> DVec3 {
        self.low
    }

    pub fn high(&self) -> DVec3 {
        self.low + self.lengths
    }

    pub fn center(&self) -> DVec3 {
        self.low + 0.5 * self.lengths
    }

    pub fn tilt(&self) -> Option<[f64; 3]> {
        self.tilt
    }

    pub fn volume(&self) -> f64 {
        self.lengths.x * self.lengths.y * self.lengths.z
    }

    pub fn min_length(&self) -> f64 {
        self.lengths.min_element()
    }
}

/// Whether the number of particles in a cloud is known yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleCount {
    Uninitialized,
    Initialized(usize),
}

impl ParticleCount {
    pub fn get(self) -> Result<usize, TopologyError> {
        match self {
            ParticleCount::Uninitialized => Err(TopologyError::Uninitialized),
            ParticleCount::Initialized(n) => Ok(n),
        }
    }
}

/// All particles of one frame plus the periodic box they live in.
#[derive(Debug, Clone)]
pub struct PointCloud {
    pub points: Vec<Point>,
    pub sim_box: SimBox,
    pub frame: usize,
    declared: Option<usize>,
    id_index: HashMap<i64, usize>,
}

impl PointCloud {
    /// Empty cloud whose particle count is not yet known.
    pub fn new(sim_box: SimBox, frame: usize) -> Self {
        Self {
            points: Vec::new(),
            sim_box,
            frame,
            declared: None,
            id_index: HashMap::new(),
        }
    }

    /// Build a populated cloud. Identifiers must be unique.
    pub fn from_points(
        points: Vec<Point>,
        sim_box: SimBox,
        frame: usize,
    ) -> Result<Self, TopologyError> {
        let mut cloud = Self::new(sim_box, frame);
        cloud.points.reserve(points.len());
        for point in points {
            cloud.push(point)?;
        }
        cloud.declared = Some(cloud.points.len());
        Ok(cloud)
    }

    /// Append a point, registering its identifier.
    pub fn push(&mut self, point: Point) -> Result<usize, TopologyError> {
        let index = self.points.len();
        if self.id_index.insert(point.id, index).is_some() {
            self.rebuild_index();
            return Err(TopologyError::DuplicateIdentifier(point.id));
        }
        self.points.push(point);
        Ok(index)
    }

    /// Record the particle count announced by the input (e.g. a dump header).
    pub fn declare_count(&mut self, n: usize) {
        self.declared = Some(n);
        self.points.reserve(n.saturating_sub(self.points.len()));
    }

    pub fn particle_count(&self) -> ParticleCount {
        match self.declared {
            None => ParticleCount::Uninitialized,
            Some(n) => ParticleCount::Initialized(n),
        }
    }

    /// Check that the declared count matches the stored points.
    pub fn validate(&self) -> Result<usize, TopologyError> {
        let declared = self.particle_count().get()?;
        if declared != self.points.len() {
            return Err(TopologyError::CountMismatch {
                declared,
                stored: self.points.len(),
            });
        }
        Ok(declared)
    }

    /// Mark the cloud as complete with whatever points it holds.
    pub fn finalize(&mut self) {
        self.declared = Some(self.points.len());
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Point, TopologyError> {
        self.points.get(index).ok_or(TopologyError::IndexOutOfRange {
            index,
            len: self.points.len(),
        })
    }

    pub fn position(&self, index: usize) -> Result<DVec3, TopologyError> {
        self.get(index).map(|p| p.position)
    }

    pub fn positions(&self) -> Vec<DVec3> {
        self.points.iter().map(|p| p.position).collect()
    }

    /// Storage index of the particle with identifier `id`.
    pub fn index_of(&self, id: i64) -> Option<usize> {
        self.id_index.get(&id).copied()
    }

    pub fn require_index(&self, id: i64) -> Result<usize, TopologyError> {
        self.index_of(id).ok_or(TopologyError::UnknownIdentifier(id))
    }

    pub fn ice_flags(&self) -> Vec<bool> {
        self.points.iter().map(|p| p.ice.is_ice()).collect()
    }

    pub fn has_type(&self, type_id: i32) -> bool {
        self.points.iter().any(|p| p.type_id == type_id)
    }

    /// New cloud holding only the particles at `indices`, in that order,
    /// with a freshly built identifier map.
    pub fn subset(&self, indices: &[usize]) -> Result<PointCloud, TopologyError> {
        let points = indices
            .iter()
            .map(|&i| self.get(i).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        PointCloud::from_points(points, self.sim_box, self.frame)
    }

    fn rebuild_index(&mut self) {
        self.id_index = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();
    }
}
