//! XYZ coordinate files.
//!
//! ```text
//! 3
//! comment line
//! O 1.0 2.0 3.0
//! O 1.5 2.0 3.0
//! O 2.0 2.0 3.0
//! ```
//! XYZ carries no box, so the caller supplies one. Every particle gets type
//! 1 and its 1-based row number as identifier.

use super::{open, parse_token, InputError};
use crate::types::cloud::{Point, PointCloud, SimBox};
use glam::DVec3;
use std::io::{self, BufRead, Write};
use std::path::Path;

pub fn parse_xyz(reader: impl BufRead, sim_box: SimBox) -> Result<PointCloud, InputError> {
    let mut lines = reader.lines().enumerate();

    let (count_line, count) = match lines.next() {
        Some((i, line)) => (i + 1, line?),
        None => {
            return Err(InputError::Format {
                line: 1,
                message: "empty XYZ file".into(),
            })
        }
    };
    let count_token = count.split_whitespace().next().unwrap_or("");
    let declared: usize = parse_token(count_token, count_line, "a particle count")?;

    // comment
    if let Some((_, line)) = lines.next() {
        line?;
    }

    let mut cloud = PointCloud::new(sim_box, 0);
    cloud.declare_count(declared);
    for (i, line) in lines {
        let line = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() < 4 {
            return Err(InputError::Format {
                line: i + 1,
                message: format!("expected element and 3 coordinates, found {} columns", tokens.len()),
            });
        }
        let mut position = DVec3::ZERO;
        for axis in 0..3 {
            position[axis] = parse_token(tokens[axis + 1], i + 1, "a coordinate")?;
        }
        let id = cloud.len() as i64 + 1;
        cloud.push(Point::new(id, 1, position))?;
    }

    cloud.validate()?;
    Ok(cloud)
}

pub fn read_xyz(path: &Path, sim_box: SimBox) -> Result<PointCloud, InputError> {
    parse_xyz(open(path)?, sim_box)
}

/// Particles from `path`, or `None` when the file is missing or malformed.
/// A count line that disagrees with the rows is reported and the rows kept.
pub fn load_xyz(path: &Path, sim_box: SimBox) -> Option<PointCloud> {
    match read_xyz(path, sim_box) {
        Ok(cloud) => Some(cloud),
        Err(InputError::Topology(e)) => {
            log::warn!("{}: {}, keeping the rows read", path.display(), e);
            let reader = open(path).ok()?;
            lenient_rows(reader, sim_box)
        }
        Err(e) => {
            log::error!("{}: {}", path.display(), e);
            None
        }
    }
}

fn lenient_rows(reader: impl BufRead, sim_box: SimBox) -> Option<PointCloud> {
    let mut cloud = PointCloud::new(sim_box, 0);
    for line in reader.lines().skip(2) {
        let line = line.ok()?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 4 {
            continue;
        }
        let coords: Option<Vec<f64>> = tokens[1..4].iter().map(|t| t.parse().ok()).collect();
        if let Some(c) = coords {
            let id = cloud.len() as i64 + 1;
            cloud.push(Point::new(id, 1, DVec3::new(c[0], c[1], c[2]))).ok()?;
        }
    }
    cloud.finalize();
    Some(cloud)
}

/// Write `cloud` as XYZ, labelling every particle with `element`.
pub fn cloud_to_xyz(cloud: &PointCloud, element: &str, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "{}", cloud.len())?;
    writeln!(writer, "frame {}", cloud.frame)?;
    for point in &cloud.points {
        let p = point.position;
        writeln!(writer, "{} {:.6} {:.6} {:.6}", element, p.x, p.y, p.z)?;
    }
    Ok(())
}
