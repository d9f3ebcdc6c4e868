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

//! Quadratic B-spline MLS kernel. Axis-separable: the 3x3x3 stencil weight
//! is the product of three per-axis weight lookups, so we precompute the
//! per-axis weights once per particle and multiply inside the 27-node loop
//! instead of re-deriving them.

use bevy_math::{IVec3, Vec3A};

/// `base = floor(p - 0.5)` componentwise, given `p` already in grid units.
#[inline]
pub fn base_cell(p: Vec3A) -> IVec3 {
    IVec3::new(
        (p.x - 0.5).floor() as i32,
        (p.y - 0.5).floor() as i32,
        (p.z - 0.5).floor() as i32,
    )
}

/// Fractional offset from the base cell, always in `[0, 1)^3`:
/// `f = p - base - 0.5`.
#[inline]
pub fn fractional(p: Vec3A, base: IVec3) -> Vec3A {
    p - base.as_vec3a() - Vec3A::splat(0.5)
}

/// Per-axis weights `w0, w1, w2` packed as `[w0; w1; w2]` Vec3A lanes, one
/// element per axis. `axis_weights(f)[k].x/.y/.z` is the weight for offset
/// `k` along the x/y/z axis respectively, a 4-lane-friendly layout whose
/// 4th lane is left at 0 implicitly by callers that pack into Vec4.
#[inline]
pub fn axis_weights(f: Vec3A) -> [Vec3A; 3] {
    debug_assert!(f.x >= -1e-4 && f.x < 1.0001);
    debug_assert!(f.y >= -1e-4 && f.y < 1.0001);
    debug_assert!(f.z >= -1e-4 && f.z < 1.0001);
    [
        Vec3A::new(
            0.5 * (0.5 - f.x).powi(2),
            0.5 * (0.5 - f.y).powi(2),
            0.5 * (0.5 - f.z).powi(2),
        ),
        Vec3A::new(
            0.75 - f.x.powi(2),
            0.75 - f.y.powi(2),
            0.75 - f.z.powi(2),
        ),
        Vec3A::new(
            0.5 * (0.5 + f.x).powi(2),
            0.5 * (0.5 + f.y).powi(2),
            0.5 * (0.5 + f.z).powi(2),
        ),
    ]
}

/// Weight of stencil offset `(i, j, k)` given the precomputed axis weights.
#[inline]
pub fn stencil_weight(weights: &[Vec3A; 3], i: usize, j: usize, k: usize) -> f32 {
    weights[i].x * weights[j].y * weights[k].z
}

/// A particle's full kernel context: its base cell and axis weights,
/// computed once and reused across the 27-node loop.
pub struct Stencil {
    pub base: IVec3,
    pub weights: [Vec3A; 3],
}

impl Stencil {
    pub fn new(pos: Vec3A) -> Self {
        let base = base_cell(pos);
        let f = fractional(pos, base);
        Stencil {
            base,
            weights: axis_weights(f),
        }
    }

    #[inline]
    pub fn weight(&self, i: usize, j: usize, k: usize) -> f32 {
        stencil_weight(&self.weights, i, j, k)
    }

    #[inline]
    pub fn cell_coord(&self, i: usize, j: usize, k: usize) -> IVec3 {
        self.base + IVec3::new(i as i32, j as i32, k as i32)
    }

    /// Iterate the 27 stencil cells as `(i, j, k, weight, cell_coord)`.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, usize, f32, IVec3)) {
        for k in 0..3 {
            for j in 0..3 {
                for i in 0..3 {
                    f(i, j, k, self.weight(i, j, k), self.cell_coord(i, j, k));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_partition_of_unity() {
        for x in [0.01f32, 0.25, 0.5, 0.75, 0.99] {
            let p = Vec3A::splat(2.0 + x);
            let s = Stencil::new(p);
            let mut sum = 0.0;
            s.for_each(|_, _, _, w, _| sum += w);
            assert!((sum - 1.0).abs() < 1e-5, "sum={sum}");
        }
    }

    #[test]
    fn base_cell_matches_floor_minus_half() {
        let p = Vec3A::new(3.2, 3.2, 3.2);
        assert_eq!(base_cell(p), IVec3::new(2, 2, 2));
    }
}
