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

//! Visco: rate-dependent Maxwell relaxation layered on top of the Hencky
//! elastic response. The deviatoric part of the log singular values
//! decays toward zero every step by a fixed per-step factor, the discrete
//! form of `d(dev)/dt = -dev/tau` integrated with a matrix exponential;
//! the isotropic part is left untouched so volume is unaffected by
//! relaxation.

use bevy_math::{Mat3A, Vec3A};

use crate::material::elastic::hencky_stress;
use crate::material::hencky_sound_speed;
use crate::math3::{mat3_from_diag, svd3};

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct ViscoState {
    pub lambda: f32,
    pub mu: f32,
    /// Relaxation timescale, in seconds.
    pub relaxation_time: f32,
    /// `exp(-dt/relaxation_time)` for the current step, recomputed by the
    /// caller whenever `dt` changes; `1.0` disables relaxation entirely.
    pub decay_per_step: f32,
}

pub fn calculate_force(dg_e: Mat3A, vol: f32, s: &ViscoState) -> Mat3A {
    hencky_stress(dg_e, vol, s.lambda, s.mu)
}

pub fn plasticity(dg_e: &mut Mat3A, f_inc: Mat3A, s: &ViscoState) -> i32 {
    let f_trial = f_inc * *dg_e;
    let (u, sigma, v) = svd3(f_trial);
    let log_sigma = Vec3A::new(
        sigma.x.max(1e-6).ln(),
        sigma.y.max(1e-6).ln(),
        sigma.z.max(1e-6).ln(),
    );
    let tr = log_sigma.x + log_sigma.y + log_sigma.z;
    let dev = log_sigma - Vec3A::splat(tr / 3.0);

    let decay = s.decay_per_step.clamp(0.0, 1.0);
    let relaxed_dev = dev * decay;
    let relaxed_log_sigma = relaxed_dev + Vec3A::splat(tr / 3.0);
    let relaxed_sigma = Vec3A::new(
        relaxed_log_sigma.x.exp(),
        relaxed_log_sigma.y.exp(),
        relaxed_log_sigma.z.exp(),
    );
    *dg_e = u * mat3_from_diag(relaxed_sigma) * v.transpose();
    0
}

pub fn sound_speed(density: f32, s: &ViscoState) -> f32 {
    hencky_sound_speed(s.lambda, s.mu, density)
}

pub fn potential_energy(dg_e: Mat3A, vol: f32, s: &ViscoState) -> f32 {
    crate::material::elastic::hencky_potential_energy(dg_e, vol, s.lambda, s.mu)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ViscoState {
        ViscoState { lambda: 1000.0, mu: 500.0, relaxation_time: 0.1, decay_per_step: 1.0 }
    }

    #[test]
    fn zero_deformation_zero_stress() {
        let s = base();
        let stress = calculate_force(Mat3A::IDENTITY, 1.0, &s);
        assert!(stress.x_axis.length() < 1e-3);
    }

    #[test]
    fn full_decay_collapses_to_isotropic() {
        let mut s = base();
        s.decay_per_step = 0.0;
        let mut dg_e = Mat3A::from_diagonal(bevy_math::Vec3::new(1.2, 0.9, 1.0));
        plasticity(&mut dg_e, Mat3A::IDENTITY, &s);
        let j = dg_e.determinant().cbrt();
        let expected = Mat3A::IDENTITY * j;
        assert!((dg_e - expected).x_axis.length() < 1e-3);
    }
}
