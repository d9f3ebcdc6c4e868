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

//! Water: a Tait equation-of-state fluid, grounded on the EOS pressure
//! stage in `water/mlsmpm.rs` (`p = k*((rho/rho0)^gamma - 1)`, here tracked
//! directly in terms of the volume ratio `J`). Unlike the solid-family
//! materials, the fluid carries no deformation-gradient memory:
//! `plasticity` folds the whole step's volume change into `j` and resets
//! `dg_e` to identity.

use bevy_math::Mat3A;

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct WaterState {
    pub bulk_modulus: f32,
    pub gamma: f32,
    /// Current volume ratio relative to rest volume, starts at 1.
    pub j: f32,
}

impl WaterState {
    fn pressure(&self) -> f32 {
        self.bulk_modulus * (self.j.powf(-self.gamma) - 1.0)
    }
}

pub fn calculate_force(vol: f32, s: &WaterState) -> Mat3A {
    let p = s.pressure();
    Mat3A::IDENTITY * (-vol * p)
}

pub fn plasticity(dg_e: &mut Mat3A, f_inc: Mat3A, s: &mut WaterState) -> i32 {
    let f_trial = f_inc * *dg_e;
    s.j *= f_trial.determinant() / dg_e.determinant().max(1e-12);
    s.j = s.j.max(1e-4);
    *dg_e = Mat3A::IDENTITY;
    0
}

pub fn sound_speed(density: f32, s: &WaterState) -> f32 {
    let c2 = s.gamma * s.bulk_modulus / density.max(1e-6);
    c2.max(1e-20).sqrt()
}

pub fn potential_energy(s: &WaterState) -> f32 {
    let j = s.j;
    s.bulk_modulus * (j.powf(1.0 - s.gamma) / (s.gamma - 1.0) + j) / s.gamma.max(1e-6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_density_zero_stress() {
        let s = WaterState { bulk_modulus: 1.0e4, gamma: 7.0, j: 1.0 };
        let stress = calculate_force(1.0, &s);
        assert!(stress.x_axis.length() < 1e-3);
    }
}
