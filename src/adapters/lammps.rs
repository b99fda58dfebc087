//! LAMMPS text dump reader.
//!
//! A dump is a sequence of frames, each made of `ITEM:` sections:
//! ```text
//! ITEM: TIMESTEP
//! 1000
//! ITEM: NUMBER OF ATOMS
//! 2
//! ITEM: BOX BOUNDS pp pp pp
//! 0.0 20.0
//! 0.0 20.0
//! 0.0 20.0
//! ITEM: ATOMS id mol type x y z
//! 1 1 2 1.0 2.0 3.0
//! 2 1 1 1.5 2.0 3.0
//! ```
//! Atom columns are located by name, so any column order works. A bound line
//! with a third value carries a tilt factor.

use super::{open, parse_token, InputError};
use crate::ops::pbc;
use crate::types::cloud::{Point, PointCloud, SimBox};
use glam::DVec3;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// One frame of a dump.
#[derive(Debug, Clone)]
pub struct DumpFrame {
    pub timestep: i64,
    pub cloud: PointCloud,
}

/// Streaming dump reader over any buffered source.
///
/// Frames are numbered from 1 in the order they are read; the number is
/// stored in `PointCloud::frame`.
pub struct LammpsReader<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
    pending: Option<String>,
    frames_read: usize,
    type_filter: Option<i32>,
    slice: Option<(DVec3, DVec3)>,
}

impl LammpsReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, InputError> {
        Ok(Self::new(open(path)?))
    }
}

impl<R: BufRead> LammpsReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            pending: None,
            frames_read: 0,
            type_filter: None,
            slice: None,
        }
    }

    /// Keep only particles of this type.
    pub fn with_type(mut self, type_id: i32) -> Self {
        self.type_filter = Some(type_id);
        self
    }

    /// Flag particles inside `low..high` as in the slice. An axis whose
    /// bounds are equal is not restricted.
    pub fn with_slice(mut self, low: DVec3, high: DVec3) -> Self {
        self.slice = Some((low, high));
        self
    }

    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// Read the next frame. Returns `None` at EOF.
    pub fn read_frame(&mut self) -> Result<Option<DumpFrame>, InputError> {
        let header = loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        if !header.trim().starts_with("ITEM: TIMESTEP") {
            return Err(self.format_error(format!("expected ITEM: TIMESTEP, found {:?}", header.trim())));
        }
        let timestep: i64 = self.value_line("a timestep")?;

        let mut natoms: Option<usize> = None;
        let mut bounds: Option<BoxBounds> = None;
        let mut points: Option<Vec<Point>> = None;

        while let Some(line) = self.next_line()? {
            let trimmed = line.trim();
            if trimmed.starts_with("ITEM: TIMESTEP") {
                self.pending = Some(line);
                break;
            }
            let Some(section) = trimmed.strip_prefix("ITEM:").map(str::trim) else {
                if !trimmed.is_empty() {
                    log::debug!("line {}: ignoring {:?} outside a section", self.line_no, trimmed);
                }
                continue;
            };

            if section.starts_with("NUMBER OF ATOMS") {
                natoms = Some(self.value_line("an atom count")?);
            } else if section.starts_with("BOX BOUNDS") {
                bounds = Some(self.read_bounds()?);
            } else if let Some(names) = section.strip_prefix("ATOMS") {
                let n = natoms
                    .ok_or_else(|| self.format_error("ATOMS section before NUMBER OF ATOMS".into()))?;
                let columns = Columns::parse(names, self.line_no)?;
                points = Some(self.read_atoms(n, &columns)?);
            } else {
                log::debug!("line {}: skipping section {:?}", self.line_no, section);
            }
        }

        let bounds = bounds.ok_or_else(|| self.format_error("frame has no BOX BOUNDS section".into()))?;
        let points = points.ok_or_else(|| self.format_error("frame has no ATOMS section".into()))?;

        let mut sim_box = SimBox::from_bounds(bounds.low, bounds.high)?;
        if let Some(tilt) = bounds.tilt {
            sim_box = sim_box.with_tilt(tilt);
        }

        self.frames_read += 1;
        let mut cloud = PointCloud::new(sim_box, self.frames_read);
        for mut point in points {
            if self.type_filter.is_some_and(|t| t != point.type_id) {
                continue;
            }
            if let Some((low, high)) = self.slice {
                point.in_slice = pbc::in_region(point.position, low, high);
            }
            cloud.push(point)?;
        }
        cloud.finalize();

        Ok(Some(DumpFrame { timestep, cloud }))
    }

    /// Read the frame numbered `target`, skipping the ones before it.
    /// Returns `None` when the dump ends first.
    pub fn read_frame_number(&mut self, target: usize) -> Result<Option<DumpFrame>, InputError> {
        while let Some(frame) = self.read_frame()? {
            if self.frames_read == target {
                return Ok(Some(frame));
            }
            if self.frames_read > target {
                break;
            }
        }
        Ok(None)
    }

    pub fn read_all_frames(&mut self) -> Result<Vec<DumpFrame>, InputError> {
        let mut frames = Vec::new();
        while let Some(frame) = self.read_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn next_line(&mut self) -> Result<Option<String>, InputError> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        match self.lines.next() {
            None => Ok(None),
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line?))
            }
        }
    }

    fn require_line(&mut self, what: &str) -> Result<String, InputError> {
        self.next_line()?
            .ok_or_else(|| self.format_error(format!("unexpected end of file, expected {what}")))
    }

    fn value_line<T: std::str::FromStr>(&mut self, expected: &'static str) -> Result<T, InputError> {
        let line = self.require_line(expected)?;
        let token = line.split_whitespace().next().unwrap_or("");
        parse_token(token, self.line_no, expected)
    }

    fn read_bounds(&mut self) -> Result<BoxBounds, InputError> {
        let mut low = DVec3::ZERO;
        let mut high = DVec3::ZERO;
        let mut tilt = [0.0; 3];
        let mut tilted = false;

        for axis in 0..3 {
            let line = self.require_line("a box bound line")?;
            let values = line
                .split_whitespace()
                .map(|t| parse_token::<f64>(t, self.line_no, "a box bound"))
                .collect::<Result<Vec<_>, _>>()?;
            match values[..] {
                [lo, hi] => {
                    low[axis] = lo;
                    high[axis] = hi;
                }
                [lo, hi, t] => {
                    low[axis] = lo;
                    high[axis] = hi;
                    tilt[axis] = t;
                    tilted = true;
                }
                _ => {
                    return Err(self.format_error(format!(
                        "box bound line needs 2 or 3 values, found {}",
                        values.len()
                    )))
                }
            }
        }

        Ok(BoxBounds {
            low,
            high,
            tilt: tilted.then_some(tilt),
        })
    }

    fn read_atoms(&mut self, n: usize, columns: &Columns) -> Result<Vec<Point>, InputError> {
        let mut points = Vec::with_capacity(n);
        for read in 0..n {
            let line = self
                .next_line()?
                .ok_or_else(|| self.format_error(format!("expected {n} atoms, found {read}")))?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < columns.width {
                return Err(self.format_error(format!(
                    "atom line has {} columns, header names {}",
                    tokens.len(),
                    columns.width
                )));
            }

            let line_no = self.line_no;
            let id: i64 = parse_token(tokens[columns.id], line_no, "an atom id")?;
            let type_id: i32 = match columns.type_id {
                Some(c) => parse_token(tokens[c], line_no, "an atom type")?,
                None => 1,
            };
            let mut position = DVec3::ZERO;
            for (axis, &c) in columns.position.iter().enumerate() {
                position[axis] = parse_token(tokens[c], line_no, "a coordinate")?;
            }

            let mut point = Point::new(id, type_id, position);
            if let Some(c) = columns.mol {
                point.mol_id = parse_token(tokens[c], line_no, "a molecule id")?;
            }
            points.push(point);
        }
        Ok(points)
    }

    fn format_error(&self, message: String) -> InputError {
        InputError::Format {
            line: self.line_no,
            message,
        }
    }
}

/// Read one frame (numbered from 1) of the dump at `path`.
pub fn lammps_file_frame(
    path: &Path,
    frame: usize,
    type_filter: Option<i32>,
) -> Result<Option<DumpFrame>, InputError> {
    let mut reader = LammpsReader::open(path)?;
    if let Some(t) = type_filter {
        reader = reader.with_type(t);
    }
    reader.read_frame_number(frame)
}

struct BoxBounds {
    low: DVec3,
    high: DVec3,
    tilt: Option<[f64; 3]>,
}

/// Positions of the named columns in an ATOMS header.
#[derive(Debug)]
struct Columns {
    id: usize,
    type_id: Option<usize>,
    mol: Option<usize>,
    position: [usize; 3],
    width: usize,
}

impl Columns {
    fn parse(names: &str, line: usize) -> Result<Self, InputError> {
        let names: Vec<&str> = names.split_whitespace().collect();
        let find = |candidates: &[&str]| names.iter().position(|n| candidates.contains(n));
        let require = |candidates: &[&str]| {
            find(candidates).ok_or_else(|| InputError::Format {
                line,
                message: format!("ATOMS header has no {} column", candidates[0]),
            })
        };

        Ok(Self {
            id: require(&["id"])?,
            type_id: find(&["type"]),
            mol: find(&["mol"]),
            position: [require(&["x", "xu"])?, require(&["y", "yu"])?, require(&["z", "zu"])?],
            width: names.len(),
        })
    }
}
