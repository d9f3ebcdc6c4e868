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

//! Small-strain linear elastic model, the cheapest member of the elastic
//! family: `sigma = lambda*tr(eps)*I + 2*mu*eps`, `eps = sym(F) - I`.

use bevy_math::Mat3A;

use crate::material::hencky_sound_speed;

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct LinearState {
    pub lambda: f32,
    pub mu: f32,
}

fn strain(dg_e: Mat3A) -> Mat3A {
    (dg_e + dg_e.transpose()) * 0.5 - Mat3A::IDENTITY
}

pub fn calculate_force(dg_e: Mat3A, vol: f32, s: &LinearState) -> Mat3A {
    let eps = strain(dg_e);
    let trace = eps.x_axis.x + eps.y_axis.y + eps.z_axis.z;
    let sigma = eps * (2.0 * s.mu) + Mat3A::IDENTITY * (s.lambda * trace);
    -vol * sigma
}

pub fn plasticity(dg_e: &mut Mat3A, f_inc: Mat3A, _s: &LinearState) -> i32 {
    *dg_e = f_inc * *dg_e;
    0
}

pub fn sound_speed(density: f32, s: &LinearState) -> f32 {
    hencky_sound_speed(s.lambda, s.mu, density)
}

pub fn potential_energy(dg_e: Mat3A, vol: f32, s: &LinearState) -> f32 {
    let eps = strain(dg_e);
    let trace = eps.x_axis.x + eps.y_axis.y + eps.z_axis.z;
    let frob = eps.to_cols_array().iter().map(|v| v * v).sum::<f32>();
    vol * (s.mu * frob + 0.5 * s.lambda * trace * trace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_deformation_zero_stress() {
        let s = LinearState { lambda: 1000.0, mu: 500.0 };
        let stress = calculate_force(Mat3A::IDENTITY, 1.0, &s);
        assert!(stress.x_axis.length() < 1e-5);
    }
}
