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

//! Sand: Drucker-Prager yield surface with a log-strain return mapping,
//! as used by the "Drucker-Prager elastoplasticity for sand" MPM course
//! material. Elastic response shares the Hencky stress with the elastic
//! family; plasticity projects the log singular values back onto the
//! friction cone.

use bevy_math::{Mat3A, Vec3A};

use crate::material::elastic::hencky_stress;
use crate::material::hencky_sound_speed;
use crate::math3::{mat3_from_diag, svd3};

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct SandState {
    pub lambda: f32,
    pub mu: f32,
    pub friction_angle_deg: f32,
    pub cohesion: f32,
}

impl SandState {
    fn alpha(&self) -> f32 {
        let phi = self.friction_angle_deg.to_radians();
        (2.0_f32).sqrt() * 2.0 * phi.sin() / (3.0 - phi.sin())
    }
}

pub fn calculate_force(dg_e: Mat3A, vol: f32, s: &SandState) -> Mat3A {
    hencky_stress(dg_e, vol, s.lambda, s.mu)
}

pub fn plasticity(dg_e: &mut Mat3A, f_inc: Mat3A, s: &SandState) -> i32 {
    let f_trial = f_inc * *dg_e;
    let (u, sigma, v) = svd3(f_trial);
    let log_sigma = Vec3A::new(
        sigma.x.max(1e-6).ln(),
        sigma.y.max(1e-6).ln(),
        sigma.z.max(1e-6).ln(),
    );
    let tr = log_sigma.x + log_sigma.y + log_sigma.z;
    let dev = log_sigma - Vec3A::splat(tr / 3.0);
    let dev_norm = dev.length();

    if dev_norm < 1e-12 || tr > s.cohesion {
        // Pure dilation, or no deviatoric strain at all: project onto the
        // cone's apex (isotropic expansion only).
        *dg_e = Mat3A::IDENTITY;
        return 1;
    }

    let alpha = s.alpha();
    let delta_gamma = dev_norm + (3.0 * s.lambda + 2.0 * s.mu) / (2.0 * s.mu) * tr * alpha;
    if delta_gamma <= 0.0 {
        *dg_e = f_trial;
        return 0;
    }

    let new_dev = dev * (1.0 - delta_gamma / dev_norm).max(0.0);
    let new_log_sigma = new_dev + Vec3A::splat(tr / 3.0);
    let new_sigma = Vec3A::new(new_log_sigma.x.exp(), new_log_sigma.y.exp(), new_log_sigma.z.exp());
    *dg_e = u * mat3_from_diag(new_sigma) * v.transpose();
    1
}

pub fn sound_speed(density: f32, s: &SandState) -> f32 {
    hencky_sound_speed(s.lambda, s.mu, density)
}

pub fn potential_energy(dg_e: Mat3A, vol: f32, s: &SandState) -> f32 {
    crate::material::elastic::hencky_potential_energy(dg_e, vol, s.lambda, s.mu)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SandState {
        SandState {
            lambda: 1000.0,
            mu: 500.0,
            friction_angle_deg: 30.0,
            cohesion: 0.0,
        }
    }

    #[test]
    fn zero_deformation_zero_stress() {
        let s = base();
        let stress = calculate_force(Mat3A::IDENTITY, 1.0, &s);
        assert!(stress.x_axis.length() < 1e-3);
    }

    #[test]
    fn plasticity_identity_leaves_dg_e_identity() {
        let s = base();
        let mut dg_e = Mat3A::IDENTITY;
        plasticity(&mut dg_e, Mat3A::IDENTITY, &s);
        assert!((dg_e - Mat3A::IDENTITY).x_axis.length() < 1e-4);
    }
}
