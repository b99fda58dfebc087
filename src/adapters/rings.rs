//! Ring and bond lists produced by external ring-enumeration tools.
//!
//! Both files hold one record per line as whitespace-separated integers:
//! ```text
//! 272    214    906   1361    388      1
//! 388   1361   1042   1548    237      1
//! ```
//! The last column is a marker and is not part of the record; every other
//! column is a particle identifier. Bond files carry one header line before
//! the records.

use super::{open, parse_token, InputError};
use std::io::BufRead;
use std::path::Path;

/// Parse a ring file. Any malformed line fails the whole parse.
pub fn parse_rings(reader: impl BufRead) -> Result<Vec<Vec<i64>>, InputError> {
    parse_records(reader, 0)
}

/// Parse a bond file, skipping its header line.
pub fn parse_bonds(reader: impl BufRead) -> Result<Vec<Vec<i64>>, InputError> {
    parse_records(reader, 1)
}

pub fn read_rings(path: &Path) -> Result<Vec<Vec<i64>>, InputError> {
    parse_rings(open(path)?)
}

pub fn read_bonds(path: &Path) -> Result<Vec<Vec<i64>>, InputError> {
    parse_bonds(open(path)?)
}

/// Rings from `path`; a missing or unreadable file gives no rings and a
/// malformed line is skipped.
pub fn load_rings(path: &Path) -> Vec<Vec<i64>> {
    load_records(path, 0)
}

/// Bonds from `path`, recovering like `load_rings`.
pub fn load_bonds(path: &Path) -> Vec<Vec<i64>> {
    load_records(path, 1)
}

fn parse_records(reader: impl BufRead, header_lines: usize) -> Result<Vec<Vec<i64>>, InputError> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate().skip(header_lines) {
        if let Some(record) = parse_record(&line?, i + 1)? {
            records.push(record);
        }
    }
    Ok(records)
}

fn load_records(path: &Path, header_lines: usize) -> Vec<Vec<i64>> {
    let reader = match open(path) {
        Ok(r) => r,
        Err(e) => {
            log::error!("{e}");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate().skip(header_lines) {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("{}: read failed at line {}: {}", path.display(), i + 1, e);
                break;
            }
        };
        match parse_record(&line, i + 1) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => log::warn!("{}: skipping record: {}", path.display(), e),
        }
    }
    records
}

/// Identifiers of one record, without the trailing marker. Blank lines give
/// `None`.
fn parse_record(line: &str, line_no: usize) -> Result<Option<Vec<i64>>, InputError> {
    let mut values = line
        .split_whitespace()
        .map(|t| parse_token::<i64>(t, line_no, "an integer"))
        .collect::<Result<Vec<_>, _>>()?;
    if values.is_empty() {
        return Ok(None);
    }
    values.pop();
    Ok(Some(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_parse_rings_drops_marker_column() {
        let text = "272 214 906 1361 388 1\n\n388   1361   1042 1\n";
        let rings = parse_rings(Cursor::new(text)).unwrap();
        assert_eq!(rings, vec![vec![272, 214, 906, 1361, 388], vec![388, 1361, 1042]]);
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        let text = "1 2 3 1\n4 five 6 1\n";
        match parse_rings(Cursor::new(text)) {
            Err(InputError::Malformed { line, token, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(token, "five");
            }
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn test_bond_header_is_skipped() {
        let text = "481 Bonds\n1 2 1\n2 3 1\n";
        let bonds = parse_bonds(Cursor::new(text)).unwrap();
        assert_eq!(bonds, vec![vec![1, 2], vec![2, 3]]);
    }

    #[test]
    fn test_load_recovers_missing_file() {
        assert!(load_rings(Path::new("/nonexistent/rings.dat")).is_empty());
        assert!(matches!(
            read_rings(Path::new("/nonexistent/rings.dat")),
            Err(InputError::Missing(_))
        ));
    }

    #[test]
    fn test_load_skips_malformed_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1 2 3 1\n4 x 6 1\n7 8 9 1\n").unwrap();
        let rings = load_rings(file.path());
        assert_eq!(rings, vec![vec![1, 2, 3], vec![7, 8, 9]]);
        assert!(read_rings(file.path()).is_err());
    }
}
