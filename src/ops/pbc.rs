//! Minimum-image geometry in an orthogonal periodic box.

use crate::types::cloud::SimBox;
use glam::DVec3;

/// Reduce one displacement component into `[-L/2, L/2)`.
#[inline]
fn reduce(d: f64, length: f64) -> f64 {
    d - length * (d / length + 0.5).floor()
}

/// Minimum-image displacement from `a` to `b`.
///
/// Each component of `b - a` is shifted by the nearest integer multiple of the
/// box length along that axis so it lies in `[-L/2, L/2)`.
pub fn delta(a: DVec3, b: DVec3, sim_box: &SimBox) -> DVec3 {
    let d = b - a;
    let l = sim_box.lengths();
    DVec3::new(reduce(d.x, l.x), reduce(d.y, l.y), reduce(d.z, l.z))
}

/// Minimum-image distance between `a` and `b`.
pub fn distance(a: DVec3, b: DVec3, sim_box: &SimBox) -> f64 {
    delta(a, b, sim_box).length()
}

/// Squared minimum-image distance.
pub fn distance_squared(a: DVec3, b: DVec3, sim_box: &SimBox) -> f64 {
    delta(a, b, sim_box).length_squared()
}

/// Periodic image of `p` closest to `reference`.
pub fn nearest_image(reference: DVec3, p: DVec3, sim_box: &SimBox) -> DVec3 {
    reference + delta(reference, p, sim_box)
}

/// Map `p` back into the primary cell `[low, low + L)`.
pub fn wrap_into_box(p: DVec3, sim_box: &SimBox) -> DVec3 {
    let low = sim_box.low();
    let l = sim_box.lengths();
    let r = p - low;
    let wrapped = r - l * (r / l).floor();
    // Floating-point rounding can leave a component equal to L.
    let fix = |v: f64, len: f64| if v >= len { v - len } else { v };
    low + DVec3::new(fix(wrapped.x, l.x), fix(wrapped.y, l.y), fix(wrapped.z, l.z))
}

/// Whether `p` lies inside the axis-aligned region `low..=high`. A degenerate
/// axis (`low == high`) places no constraint on that axis.
pub fn in_region(p: DVec3, low: DVec3, high: DVec3) -> bool {
    (0..3).all(|k| low[k] == high[k] || (p[k] >= low[k] && p[k] <= high[k]))
}

/// Centroid of a point set. Points are assumed already unwrapped.
pub fn centroid(points: &[DVec3]) -> DVec3 {
    if points.is_empty() {
        return DVec3::ZERO;
    }
    let sum: DVec3 = points.iter().copied().sum();
    sum / points.len() as f64
}

/// Unwrap a sequence so every point is the nearest image of the first one.
pub fn unwrap_about_first(points: &[DVec3], sim_box: &SimBox) -> Vec<DVec3> {
    match points.first() {
        None => Vec::new(),
        Some(&first) => points
            .iter()
            .map(|&p| nearest_image(first, p, sim_box))
            .collect(),
    }
}
