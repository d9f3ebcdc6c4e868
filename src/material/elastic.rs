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

//! StVK-Hencky elastic model: `P = U(2*mu*Sigma^-1*logSigma +
//! lambda*(Sigma logSigma)*Sigma^-1) V^T`.

use bevy_math::{Mat3A, Vec3A};

use crate::material::hencky_sound_speed;
use crate::math3::{mat3_from_diag, svd3};

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct ElasticState {
    pub lambda: f32,
    pub mu: f32,
}

/// Shared by Elastic/Sand/VonMises/Visco: the Hencky hyperelastic stress
/// built from the log of the singular values of `dg_e`.
pub fn hencky_stress(dg_e: Mat3A, vol: f32, lambda: f32, mu: f32) -> Mat3A {
    let (u, sigma, v) = svd3(dg_e);
    let log_sigma = Vec3A::new(
        sigma.x.max(1e-6).ln(),
        sigma.y.max(1e-6).ln(),
        sigma.z.max(1e-6).ln(),
    );
    let tr_log = log_sigma.x + log_sigma.y + log_sigma.z;
    let inv_sigma = Vec3A::new(
        1.0 / sigma.x.max(1e-6),
        1.0 / sigma.y.max(1e-6),
        1.0 / sigma.z.max(1e-6),
    );
    let diag = Vec3A::new(
        (2.0 * mu * log_sigma.x + lambda * tr_log) * inv_sigma.x,
        (2.0 * mu * log_sigma.y + lambda * tr_log) * inv_sigma.y,
        (2.0 * mu * log_sigma.z + lambda * tr_log) * inv_sigma.z,
    );
    let p = u * mat3_from_diag(diag) * v.transpose();
    -vol * p * dg_e.transpose()
}

pub fn hencky_potential_energy(dg_e: Mat3A, vol: f32, lambda: f32, mu: f32) -> f32 {
    let (_, sigma, _) = svd3(dg_e);
    let log_sigma = Vec3A::new(
        sigma.x.max(1e-6).ln(),
        sigma.y.max(1e-6).ln(),
        sigma.z.max(1e-6).ln(),
    );
    let tr_log = log_sigma.x + log_sigma.y + log_sigma.z;
    vol * (mu * log_sigma.length_squared() + 0.5 * lambda * tr_log * tr_log)
}

pub fn calculate_force(dg_e: Mat3A, vol: f32, s: &ElasticState) -> Mat3A {
    hencky_stress(dg_e, vol, s.lambda, s.mu)
}

pub fn plasticity(dg_e: &mut Mat3A, f_inc: Mat3A, _s: &ElasticState) -> i32 {
    *dg_e = f_inc * *dg_e;
    0
}

pub fn sound_speed(density: f32, s: &ElasticState) -> f32 {
    hencky_sound_speed(s.lambda, s.mu, density)
}

pub fn potential_energy(dg_e: Mat3A, vol: f32, s: &ElasticState) -> f32 {
    hencky_potential_energy(dg_e, vol, s.lambda, s.mu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_deformation_zero_stress() {
        let s = ElasticState { lambda: 1000.0, mu: 500.0 };
        let stress = calculate_force(Mat3A::IDENTITY, 1.0, &s);
        assert!(stress.x_axis.length() < 1e-3);
        assert!(stress.y_axis.length() < 1e-3);
        assert!(stress.z_axis.length() < 1e-3);
    }
}
