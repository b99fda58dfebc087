//! Text formats at the boundary of the analysis.
//!
//! Strict `parse_*`/`read_*` functions return every problem as an
//! `InputError`. The `load_*` helpers recover instead: a missing file gives an
//! empty result and a malformed record is skipped, both reported through
//! `log`.

pub mod lammps;
pub mod rings;
pub mod xyz;

use crate::types::cloud::TopologyError;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use lammps::{lammps_file_frame, DumpFrame, LammpsReader};
pub use rings::{load_bonds, load_rings, parse_bonds, parse_rings, read_bonds, read_rings};
pub use xyz::{cloud_to_xyz, load_xyz, parse_xyz, read_xyz};

#[derive(Error, Debug)]
pub enum InputError {
    #[error("file does not exist: {0}")]
    Missing(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: cannot parse {token:?} as {expected}")]
    Malformed {
        line: usize,
        token: String,
        expected: &'static str,
    },
    #[error("line {line}: {message}")]
    Format { line: usize, message: String },
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Open `path` for buffered reading, reporting a missing file as
/// `InputError::Missing`.
pub(crate) fn open(path: &Path) -> Result<BufReader<File>, InputError> {
    match File::open(path) {
        Ok(file) => Ok(BufReader::new(file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(InputError::Missing(path.to_path_buf())),
        Err(e) => Err(e.into()),
    }
}

/// Parse one whitespace-separated token.
pub(crate) fn parse_token<T: std::str::FromStr>(
    token: &str,
    line: usize,
    expected: &'static str,
) -> Result<T, InputError> {
    token.parse().map_err(|_| InputError::Malformed {
        line,
        token: token.to_string(),
        expected,
    })
}
