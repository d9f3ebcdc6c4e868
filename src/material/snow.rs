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

//! Snow: fixed corotated elasticity with exponential hardening and a
//! singular-value clamp that accumulates plastic compression/stretch in
//! `jp`, following the Disney snow model.

use bevy_math::Mat3A;

use crate::material::jelly::first_piola_kirchhoff;
use crate::material::hencky_sound_speed;
use crate::math3::svd3;

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct SnowState {
    pub lambda_0: f32,
    pub mu_0: f32,
    pub hardening: f32,
    pub critical_compression: f32,
    pub critical_stretch: f32,
    /// Accumulated `det(dg_p)`, starts at 1.
    pub jp: f32,
}

impl SnowState {
    fn hardened(&self) -> (f32, f32) {
        let e = (self.hardening * (1.0 - self.jp)).exp();
        (self.lambda_0 * e, self.mu_0 * e)
    }
}

pub fn calculate_force(dg_e: Mat3A, vol: f32, s: &SnowState) -> Mat3A {
    let (lambda, mu) = s.hardened();
    let p = first_piola_kirchhoff(dg_e, lambda, mu);
    -vol * p * dg_e.transpose()
}

pub fn plasticity(dg_e: &mut Mat3A, f_inc: Mat3A, s: &mut SnowState) -> i32 {
    let f_trial = f_inc * *dg_e;
    let (u, sigma, v) = svd3(f_trial);
    let lo = 1.0 - s.critical_compression;
    let hi = 1.0 + s.critical_stretch;
    let mut clamped = 0;
    let clamp = |x: f32| -> f32 {
        if x < lo || x > hi {
            clamped += 1;
        }
        x.clamp(lo, hi)
    };
    let cx = clamp(sigma.x);
    let cy = clamp(sigma.y);
    let cz = clamp(sigma.z);
    let sigma_clamped = bevy_math::Vec3A::new(cx, cy, cz);

    let jp_new = s.jp * (sigma.x * sigma.y * sigma.z) / (cx * cy * cz).max(1e-12);
    s.jp = jp_new.clamp(0.05, 20.0);

    *dg_e = u * crate::math3::mat3_from_diag(sigma_clamped) * v.transpose();
    clamped
}

pub fn sound_speed(density: f32, s: &SnowState) -> f32 {
    let (lambda, mu) = s.hardened();
    hencky_sound_speed(lambda, mu, density)
}

pub fn potential_energy(dg_e: Mat3A, vol: f32, s: &SnowState) -> f32 {
    let (lambda, mu) = s.hardened();
    let (_, sigma, _) = svd3(dg_e);
    let j = sigma.x * sigma.y * sigma.z;
    let frob = (sigma.x - 1.0).powi(2) + (sigma.y - 1.0).powi(2) + (sigma.z - 1.0).powi(2);
    vol * (mu * frob + 0.5 * lambda * (j - 1.0) * (j - 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SnowState {
        SnowState {
            lambda_0: 1000.0,
            mu_0: 500.0,
            hardening: 10.0,
            critical_compression: 0.025,
            critical_stretch: 0.0075,
            jp: 1.0,
        }
    }

    #[test]
    fn zero_deformation_zero_stress() {
        let s = base();
        let stress = calculate_force(Mat3A::IDENTITY, 1.0, &s);
        assert!(stress.x_axis.length() < 1e-3);
    }

    #[test]
    fn plasticity_identity_is_noop() {
        let mut s = base();
        let mut dg_e = Mat3A::IDENTITY;
        let clamped = plasticity(&mut dg_e, Mat3A::IDENTITY, &mut s);
        assert_eq!(clamped, 0);
        assert!((s.jp - 1.0).abs() < 1e-6);
    }
}
