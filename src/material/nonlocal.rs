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

//! Nonlocal Granular Fluidity (NGF) rheology (Kamrin-Koval): a
//! pressure-dependent frictional flow rule where the local friction
//! coefficient is a function of the inertial number, and the plastic
//! flow rate is relaxed toward equilibrium by a nonlocal diffusion term
//! (`lap_gf`, the Laplacian of the fluidity field across the grid)
//! rather than by the local stress state alone.
//!
//! Unlike the solid-family materials, the Cauchy stress itself is part
//! of the persisted particle state (`stress`) rather than recomputed
//! from `dg_e` on every call, since the flow rule couples pressure and
//! shear through the fluidity field rather than through a deformation
//! gradient.

use bevy_math::{Mat3A, Vec3A};

use crate::math3::svd3;

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct NonlocalState {
    pub lambda: f32,
    pub mu: f32,
    pub mu_s: f32,
    pub mu_2: f32,
    pub i_0: f32,
    pub rho_grain: f32,
    pub grain_diameter: f32,
    /// Nonlocal diffusion coefficient (`A` in Kamrin-Koval), scales `lap_gf`.
    pub nonlocal_amplitude: f32,

    pub gf: f32,
    pub tau: f32,
    pub p: f32,
    pub stress: Mat3A,
}

pub fn calculate_force(vol: f32, s: &NonlocalState) -> Mat3A {
    -vol * s.stress
}

pub fn plasticity(dg_e: &mut Mat3A, f_inc: Mat3A, lap_gf: f32, s: &mut NonlocalState) -> i32 {
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

    let p_trial = -s.lambda * tr - (2.0 / 3.0) * s.mu * tr;
    let tau_trial = 2.0 * s.mu * dev_norm;

    if p_trial <= 0.0 {
        // Disconnected / unconfined: no frictional resistance is possible,
        // so the whole step is plastic and the fluidity saturates at the
        // rate-independent limit.
        let gamma_dot_eq = tau_trial / (2.0 * s.mu).max(1e-9);
        s.gf = (gamma_dot_eq / s.mu_2.max(1e-9)).max(0.0);
        s.tau = 0.0;
        s.p = 0.0;
        s.stress = Mat3A::ZERO;
        *dg_e = f_trial;
        return 1;
    }

    let gamma_dot_eq = s.gf * tau_trial;
    let inertial_number = if gamma_dot_eq > 0.0 {
        gamma_dot_eq * s.grain_diameter * (s.rho_grain / p_trial).sqrt()
    } else {
        0.0
    };
    let mu_local = s.mu_s + (s.mu_2 - s.mu_s) / (s.i_0 / inertial_number.max(1e-9) + 1.0);
    let tau_yield = mu_local * p_trial;

    s.gf = (s.gf + s.nonlocal_amplitude * lap_gf).max(0.0);

    if tau_trial <= tau_yield || dev_norm < 1e-12 {
        s.tau = tau_trial;
        s.p = p_trial;
        let diag = Vec3A::new(
            (2.0 * s.mu * dev.x - p_trial) ,
            (2.0 * s.mu * dev.y - p_trial),
            (2.0 * s.mu * dev.z - p_trial),
        );
        s.stress = crate::math3::mat3_from_diag(diag);
        *dg_e = f_trial;
        return 0;
    }

    let scale = (tau_yield / tau_trial).max(0.0);
    let new_dev = dev * scale;
    let new_log_sigma = new_dev + Vec3A::splat(tr / 3.0);
    let new_sigma = Vec3A::new(
        new_log_sigma.x.exp(),
        new_log_sigma.y.exp(),
        new_log_sigma.z.exp(),
    );
    *dg_e = u * crate::math3::mat3_from_diag(new_sigma) * v.transpose();
    s.tau = tau_yield;
    s.p = p_trial;
    let diag = Vec3A::new(
        2.0 * s.mu * new_dev.x - p_trial,
        2.0 * s.mu * new_dev.y - p_trial,
        2.0 * s.mu * new_dev.z - p_trial,
    );
    s.stress = crate::math3::mat3_from_diag(diag);
    1
}

pub fn sound_speed(density: f32, s: &NonlocalState) -> f32 {
    let c2 = (s.lambda + 2.0 * s.mu) / density.max(1e-6);
    c2.max(1e-20).sqrt()
}

pub fn potential_energy(s: &NonlocalState) -> f32 {
    s.p.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> NonlocalState {
        NonlocalState {
            lambda: 1000.0,
            mu: 500.0,
            mu_s: 0.4,
            mu_2: 0.6,
            i_0: 0.3,
            rho_grain: 2500.0,
            grain_diameter: 0.001,
            nonlocal_amplitude: 0.01,
            gf: 0.0,
            tau: 0.0,
            p: 0.0,
            stress: Mat3A::ZERO,
        }
    }

    #[test]
    fn disconnected_state_matches_closed_form() {
        let mut s = base();
        let mut dg_e = Mat3A::from_diagonal(bevy_math::Vec3::new(1.2, 1.0, 1.0));
        plasticity(&mut dg_e, Mat3A::IDENTITY, 0.0, &mut s);
        assert_eq!(s.tau, 0.0);
        assert_eq!(s.p, 0.0);
        assert!(s.gf >= 0.0);
        assert!((dg_e - Mat3A::from_diagonal(bevy_math::Vec3::new(1.2, 1.0, 1.0))).x_axis.length() < 1e-4);
    }

    #[test]
    fn zero_deformation_zero_force() {
        let s = base();
        let stress = calculate_force(1.0, &s);
        assert_eq!(stress, Mat3A::ZERO);
    }
}
