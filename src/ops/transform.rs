//! Rigid-body alignment of corresponding point sets.
//!
//! Provides:
//! - Kabsch alignment (rotation + translation, no scaling)
//! - Per-point residuals and RMSD after the fit
//!
//! The 3x3 SVD is computed from a Jacobi eigen-decomposition of `HᵀH`, so no
//! linear-algebra backend is needed.

use crate::ops::pbc::centroid;
use crate::types::cloud::TopologyError;
use glam::{DMat3, DVec3};

/// Singular values below this are treated as zero.
const SINGULAR_EPS: f64 = 1e-10;

/// Proper rotation followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: DMat3,
    pub translation: DVec3,
}

impl RigidTransform {
    pub const IDENTITY: Self = Self {
        rotation: DMat3::IDENTITY,
        translation: DVec3::ZERO,
    };

    pub fn apply(&self, p: DVec3) -> DVec3 {
        self.rotation * p + self.translation
    }
}

/// Kabsch algorithm: find the rotation and translation that best map `target`
/// onto `reference` in the least-squares sense.
///
/// Returns a transform such that `aligned = rotation * target + translation`.
/// Both sets must have the same length, at least three points, and must not be
/// collinear.
pub fn kabsch_alignment(
    reference: &[DVec3],
    target: &[DVec3],
) -> Result<RigidTransform, TopologyError> {
    if reference.len() != target.len() {
        return Err(TopologyError::DegenerateAlignment(format!(
            "{} reference points but {} target points",
            reference.len(),
            target.len()
        )));
    }
    if reference.len() < 3 {
        return Err(TopologyError::DegenerateAlignment(format!(
            "need at least 3 points, got {}",
            reference.len()
        )));
    }

    let ref_centroid = centroid(reference);
    let tgt_centroid = centroid(target);

    // H = sum over points of t * rᵀ, stored column-major
    let mut h = DMat3::ZERO;
    for (r, t) in reference.iter().zip(target) {
        let r = *r - ref_centroid;
        let t = *t - tgt_centroid;
        h += DMat3::from_cols(t * r.x, t * r.y, t * r.z);
    }

    let (u, s, v) = svd_3x3(h)?;
    if s[1] < SINGULAR_EPS {
        return Err(TopologyError::DegenerateAlignment(
            "point sets are collinear".to_string(),
        ));
    }

    let mut rotation = v * u.transpose();
    if rotation.determinant() < 0.0 {
        let v_flipped = DMat3::from_cols(v.x_axis, v.y_axis, -v.z_axis);
        rotation = v_flipped * u.transpose();
    }

    let translation = ref_centroid - rotation * tgt_centroid;
    Ok(RigidTransform {
        rotation,
        translation,
    })
}

/// Distance from each reference point to its aligned target point.
pub fn fit_residuals(reference: &[DVec3], target: &[DVec3]) -> Result<Vec<f64>, TopologyError> {
    let transform = kabsch_alignment(reference, target)?;
    Ok(reference
        .iter()
        .zip(target)
        .map(|(r, t)| transform.apply(*t).distance(*r))
        .collect())
}

/// Root-mean-square of a set of residual distances.
pub fn rmsd(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = residuals.iter().map(|d| d * d).sum();
    (sum_sq / residuals.len() as f64).sqrt()
}

// ============================================================================
// SVD (Jacobi iteration on the 3x3 normal matrix)
// ============================================================================

/// Returns `(U, singular values, V)` with `A = U diag(s) Vᵀ`, singular values
/// in decreasing order and `U` a proper rotation.
fn svd_3x3(a: DMat3) -> Result<(DMat3, [f64; 3], DMat3), TopologyError> {
    let (eigenvalues, v) = jacobi_eigendecomposition(a.transpose() * a)?;
    let s = eigenvalues.map(|e| e.max(0.0).sqrt());

    let mut u_cols = [DVec3::ZERO; 3];
    for j in 0..3 {
        if s[j] > SINGULAR_EPS {
            u_cols[j] = (a * v.col(j)) / s[j];
        }
    }

    let u0 = u_cols[0].normalize_or_zero();
    let u1 = (u_cols[1] - u_cols[1].dot(u0) * u0).normalize_or_zero();
    // Planar input leaves the last column undetermined; complete the basis.
    let u2 = if s[2] > SINGULAR_EPS {
        let w = u_cols[2] - u_cols[2].dot(u0) * u0 - u_cols[2].dot(u1) * u1;
        w.normalize_or_zero()
    } else {
        u0.cross(u1)
    };

    Ok((DMat3::from_cols(u0, u1, u2), s, v))
}

/// Eigenvalues (descending) and eigenvectors (as columns) of a symmetric
/// 3x3 matrix.
fn jacobi_eigendecomposition(m: DMat3) -> Result<([f64; 3], DMat3), TopologyError> {
    const MAX_ITER: usize = 64;

    // symmetric, so column-major storage reads the same as row-major
    let mut a = m.to_cols_array_2d();
    let mut v = [[0.0f64; 3]; 3];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for _ in 0..MAX_ITER {
        let (mut p, mut q, mut max_val) = (0, 1, 0.0f64);
        for i in 0..3 {
            for j in (i + 1)..3 {
                if a[i][j].abs() > max_val {
                    max_val = a[i][j].abs();
                    p = i;
                    q = j;
                }
            }
        }
        if max_val < 1e-14 {
            break;
        }

        let diff = a[q][q] - a[p][p];
        let theta = if diff.abs() < 1e-14 {
            std::f64::consts::FRAC_PI_4
        } else {
            0.5 * (2.0 * a[p][q] / diff).atan()
        };
        let (s, c) = theta.sin_cos();

        let mut next = a;
        next[p][p] = c * c * a[p][p] - 2.0 * s * c * a[p][q] + s * s * a[q][q];
        next[q][q] = s * s * a[p][p] + 2.0 * s * c * a[p][q] + c * c * a[q][q];
        next[p][q] = 0.0;
        next[q][p] = 0.0;
        for i in 0..3 {
            if i != p && i != q {
                next[i][p] = c * a[i][p] - s * a[i][q];
                next[p][i] = next[i][p];
                next[i][q] = s * a[i][p] + c * a[i][q];
                next[q][i] = next[i][q];
            }
        }
        a = next;

        for row in v.iter_mut() {
            let (vip, viq) = (row[p], row[q]);
            row[p] = c * vip - s * viq;
            row[q] = s * vip + c * viq;
        }
    }

    let eigenvalues = [a[0][0], a[1][1], a[2][2]];
    if eigenvalues.iter().any(|e| !e.is_finite()) {
        return Err(TopologyError::DegenerateAlignment(
            "non-finite coordinates".to_string(),
        ));
    }

    let mut order = [0usize, 1, 2];
    order.sort_by(|&i, &j| eigenvalues[j].total_cmp(&eigenvalues[i]));

    let sorted = order.map(|k| eigenvalues[k]);
    let col = |k: usize| DVec3::new(v[0][k], v[1][k], v[2][k]);
    let vectors = DMat3::from_cols(col(order[0]), col(order[1]), col(order[2]));
    Ok((sorted, vectors))
}
