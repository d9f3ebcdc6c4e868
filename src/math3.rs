/*
    Copyright 2023 github.com/programaquatic

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

//! Small 3x3 dense linear algebra helpers the material models need:
//! symmetric eigendecomposition (one-sided Jacobi), SVD built on top of it,
//! and polar decomposition. This does not mirror any fluid-only MLS-MPM
//! implementation; it follows the standard MPM-course reference approach
//! (Jacobi-eigenvalue SVD of `F^T F`) used by elastoplastic MPM solvers
//! generally.

use bevy_math::{Mat3A, Vec3A};

/// Symmetric 3x3 eigendecomposition via cyclic Jacobi rotations.
/// Returns (eigenvectors as columns of a rotation matrix, eigenvalues).
pub fn jacobi_eigen_symmetric(m: Mat3A) -> (Mat3A, Vec3A) {
    let mut a = m;
    let mut v = Mat3A::IDENTITY;

    for _ in 0..24 {
        // find largest off-diagonal element
        let (mut p, mut q, mut max_val) = (0usize, 1usize, a.x_axis.y.abs());
        let off = [
            (0usize, 1usize, a.x_axis.y.abs()),
            (0usize, 2usize, a.x_axis.z.abs()),
            (1usize, 2usize, a.y_axis.z.abs()),
        ];
        for &(i, j, val) in &off {
            if val > max_val {
                max_val = val;
                p = i;
                q = j;
            }
        }
        if max_val < 1e-9 {
            break;
        }

        let app = get(&a, p, p);
        let aqq = get(&a, q, q);
        let apq = get(&a, p, q);
        let phi = 0.5 * (2.0 * apq).atan2(app - aqq);
        let (s, c) = phi.sin_cos();

        let mut rot = Mat3A::IDENTITY;
        set(&mut rot, p, p, c);
        set(&mut rot, q, q, c);
        set(&mut rot, p, q, s);
        set(&mut rot, q, p, -s);

        a = rot.transpose() * a * rot;
        v *= rot;
    }

    let eigenvalues = Vec3A::new(get(&a, 0, 0), get(&a, 1, 1), get(&a, 2, 2));
    (v, eigenvalues)
}

#[inline]
fn get(m: &Mat3A, row: usize, col: usize) -> f32 {
    let c = match col {
        0 => m.x_axis,
        1 => m.y_axis,
        _ => m.z_axis,
    };
    match row {
        0 => c.x,
        1 => c.y,
        _ => c.z,
    }
}

#[inline]
fn set(m: &mut Mat3A, row: usize, col: usize, value: f32) {
    let c = match col {
        0 => &mut m.x_axis,
        1 => &mut m.y_axis,
        _ => &mut m.z_axis,
    };
    match row {
        0 => c.x = value,
        1 => c.y = value,
        _ => c.z = value,
    }
}

/// SVD of a general 3x3 matrix `F = U * diag(sigma) * V^T`, with singular
/// values sorted descending. Built from the eigendecomposition of `F^T F`
/// (standard MPM-course approach), adequate for constitutive-model use
/// where `F` is close to the identity and never singular for long.
pub fn svd3(f: Mat3A) -> (Mat3A, Vec3A, Mat3A) {
    let ftf = f.transpose() * f;
    let (mut v, eigenvalues) = jacobi_eigen_symmetric(ftf);

    let mut sigma = Vec3A::new(
        eigenvalues.x.max(0.0).sqrt(),
        eigenvalues.y.max(0.0).sqrt(),
        eigenvalues.z.max(0.0).sqrt(),
    );

    // sort descending (simple 3-element sort), keeping V's columns in sync
    let mut idx = [0usize, 1, 2];
    idx.sort_by(|&a, &b| {
        sigma_at(sigma, b)
            .partial_cmp(&sigma_at(sigma, a))
            .unwrap()
    });
    let cols = [v.x_axis, v.y_axis, v.z_axis];
    v = Mat3A::from_cols(cols[idx[0]], cols[idx[1]], cols[idx[2]]);
    sigma = Vec3A::new(
        sigma_at(sigma, idx[0]),
        sigma_at(sigma, idx[1]),
        sigma_at(sigma, idx[2]),
    );

    let mut u_cols = [Vec3A::ZERO; 3];
    for i in 0..3 {
        let vi = match i {
            0 => v.x_axis,
            1 => v.y_axis,
            _ => v.z_axis,
        };
        let s = sigma_at(sigma, i);
        u_cols[i] = if s > 1e-8 {
            (f * vi) / s
        } else {
            Vec3A::ZERO
        };
    }
    // Gram-Schmidt to keep U orthonormal even where sigma collapsed to 0.
    let mut u0 = if u_cols[0].length_squared() > 1e-12 {
        u_cols[0].normalize()
    } else {
        Vec3A::X
    };
    let mut u1 = u_cols[1] - u0 * u0.dot(u_cols[1]);
    u1 = if u1.length_squared() > 1e-12 {
        u1.normalize()
    } else {
        u0.cross(Vec3A::Y).normalize()
    };
    let mut u2 = u0.cross(u1);
    if u2.dot(u_cols[2]) < 0.0 && u_cols[2].length_squared() > 1e-12 {
        u1 = -u1;
        u2 = -u2;
    }
    if u0.length_squared() < 0.5 {
        u0 = u1.cross(u2);
    }
    let u = Mat3A::from_cols(u0, u1, u2);

    (u, sigma, v)
}

#[inline]
fn sigma_at(s: Vec3A, i: usize) -> f32 {
    match i {
        0 => s.x,
        1 => s.y,
        _ => s.z,
    }
}

/// Polar decomposition `F = R * S` with `R` orthogonal, `S` symmetric
/// positive semi-definite, via the SVD (`R = U V^T`, `S = V diag(sigma) V^T`).
pub fn polar_decompose(f: Mat3A) -> (Mat3A, Mat3A) {
    let (u, sigma, v) = svd3(f);
    let r = u * v.transpose();
    let s = v * Mat3A::from_diagonal(sigma.into()) * v.transpose();
    (r, s)
}

pub fn mat3_from_diag(v: Vec3A) -> Mat3A {
    Mat3A::from_diagonal(v.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svd_reconstructs_identity() {
        let (u, sigma, v) = svd3(Mat3A::IDENTITY);
        let recon = u * mat3_from_diag(sigma) * v.transpose();
        for i in 0..3 {
            for j in 0..3 {
                let expect = if i == j { 1.0 } else { 0.0 };
                assert!((get(&recon, i, j) - expect).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn svd_reconstructs_diagonal_matrix() {
        let f = Mat3A::from_diagonal(Vec3A::new(2.0, 0.5, 1.2).into());
        let (u, sigma, v) = svd3(f);
        let recon = u * mat3_from_diag(sigma) * v.transpose();
        for i in 0..3 {
            for j in 0..3 {
                assert!((get(&recon, i, j) - get(&f, i, j)).abs() < 1e-2);
            }
        }
    }

    #[test]
    fn polar_decompose_identity_is_identity() {
        let (r, s) = polar_decompose(Mat3A::IDENTITY);
        assert!((r.x_axis - Vec3A::X).length() < 1e-3);
        assert!((s.x_axis - Vec3A::X).length() < 1e-3);
    }
}
