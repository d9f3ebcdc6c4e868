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

//! Fixed corotated model: `P = 2*mu*(F-R) + lambda*(J-1)*J*F^-T`. Grounded
//! on the solid branch in `water/mlsmpm.rs::p2g_stage2_solids`, which
//! already computes the analogous Neo-Hookean first Piola-Kirchhoff stress
//! for its single hard-coded solid material.

use bevy_math::Mat3A;

use crate::material::hencky_sound_speed;
use crate::math3::polar_decompose;

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct JellyState {
    pub lambda: f32,
    pub mu: f32,
}

pub fn first_piola_kirchhoff(dg_e: Mat3A, lambda: f32, mu: f32) -> Mat3A {
    let (r, _s) = polar_decompose(dg_e);
    let j = dg_e.determinant();
    let f_inv_t = dg_e.transpose().inverse();
    (dg_e - r) * (2.0 * mu) + f_inv_t * (lambda * (j - 1.0) * j)
}

pub fn calculate_force(dg_e: Mat3A, vol: f32, s: &JellyState) -> Mat3A {
    let p = first_piola_kirchhoff(dg_e, s.lambda, s.mu);
    -vol * p * dg_e.transpose()
}

pub fn plasticity(dg_e: &mut Mat3A, f_inc: Mat3A, _s: &JellyState) -> i32 {
    *dg_e = f_inc * *dg_e;
    0
}

pub fn sound_speed(density: f32, s: &JellyState) -> f32 {
    hencky_sound_speed(s.lambda, s.mu, density)
}

pub fn potential_energy(dg_e: Mat3A, vol: f32, s: &JellyState) -> f32 {
    let (r, _) = polar_decompose(dg_e);
    let j = dg_e.determinant();
    let frob = (dg_e - r).to_cols_array().iter().map(|v| v * v).sum::<f32>();
    vol * (s.mu * frob + 0.5 * s.lambda * (j - 1.0) * (j - 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_deformation_zero_stress() {
        let s = JellyState { lambda: 1000.0, mu: 500.0 };
        let stress = calculate_force(Mat3A::IDENTITY, 1.0, &s);
        assert!(stress.x_axis.length() < 1e-3);
    }
}
