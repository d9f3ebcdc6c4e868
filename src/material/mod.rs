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

//! Material contract and dispatch table.
//!
//! Virtual inheritance in the source lineage is replaced with a tagged
//! variant (`MaterialState`) and a vtable-free `match` dispatch keyed by
//! the tag, rather than boxed trait objects: every particle carries its
//! material's config and evolving state inline.

pub mod elastic;
pub mod jelly;
pub mod linear;
pub mod nonlocal;
pub mod sand;
pub mod snow;
pub mod visco;
pub mod von_mises;
pub mod water;

use bevy_math::{Mat3A, Vec3A};

use crate::error::{EngineError, EngineResult};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "material")]
pub enum MaterialState {
    Elastic(elastic::ElasticState),
    Jelly(jelly::JellyState),
    Linear(linear::LinearState),
    Snow(snow::SnowState),
    Sand(sand::SandState),
    VonMises(von_mises::VonMisesState),
    Visco(visco::ViscoState),
    Water(water::WaterState),
    Nonlocal(nonlocal::NonlocalState),
}

/// The operations every material implements, dispatched through a single
/// `match` rather than a vtable.
impl MaterialState {
    /// `-vol * P * F^T` — pure function of particle state, must not mutate.
    pub fn calculate_force(&self, dg_e: Mat3A, vol: f32) -> Mat3A {
        match self {
            MaterialState::Elastic(s) => elastic::calculate_force(dg_e, vol, s),
            MaterialState::Jelly(s) => jelly::calculate_force(dg_e, vol, s),
            MaterialState::Linear(s) => linear::calculate_force(dg_e, vol, s),
            MaterialState::Snow(s) => snow::calculate_force(dg_e, vol, s),
            MaterialState::Sand(s) => sand::calculate_force(dg_e, vol, s),
            MaterialState::VonMises(s) => von_mises::calculate_force(dg_e, vol, s),
            MaterialState::Visco(s) => visco::calculate_force(dg_e, vol, s),
            MaterialState::Water(s) => water::calculate_force(vol, s),
            MaterialState::Nonlocal(s) => nonlocal::calculate_force(vol, s),
        }
    }

    /// Updates `dg_e` (and private plastic state); returns an
    /// implementation-defined counter (e.g. number of clamped singular
    /// values).
    pub fn plasticity(&mut self, dg_e: &mut Mat3A, f_inc: Mat3A, lap_gf: f32) -> i32 {
        match self {
            MaterialState::Elastic(s) => elastic::plasticity(dg_e, f_inc, s),
            MaterialState::Jelly(s) => jelly::plasticity(dg_e, f_inc, s),
            MaterialState::Linear(s) => linear::plasticity(dg_e, f_inc, s),
            MaterialState::Snow(s) => snow::plasticity(dg_e, f_inc, s),
            MaterialState::Sand(s) => sand::plasticity(dg_e, f_inc, s),
            MaterialState::VonMises(s) => von_mises::plasticity(dg_e, f_inc, s),
            MaterialState::Visco(s) => visco::plasticity(dg_e, f_inc, s),
            MaterialState::Water(s) => water::plasticity(dg_e, f_inc, s),
            MaterialState::Nonlocal(s) => nonlocal::plasticity(dg_e, f_inc, lap_gf, s),
        }
    }

    /// `dx / (c_sound + |v|)`; zero means "no constraint".
    pub fn get_allowed_dt(&self, dx: f32, velocity: Vec3A, density: f32) -> f32 {
        let c_sound = match self {
            MaterialState::Elastic(s) => elastic::sound_speed(density, s),
            MaterialState::Jelly(s) => jelly::sound_speed(density, s),
            MaterialState::Linear(s) => linear::sound_speed(density, s),
            MaterialState::Snow(s) => snow::sound_speed(density, s),
            MaterialState::Sand(s) => sand::sound_speed(density, s),
            MaterialState::VonMises(s) => von_mises::sound_speed(density, s),
            MaterialState::Visco(s) => visco::sound_speed(density, s),
            MaterialState::Water(s) => water::sound_speed(density, s),
            MaterialState::Nonlocal(s) => nonlocal::sound_speed(density, s),
        };
        if c_sound <= 0.0 {
            0.0
        } else {
            dx / (c_sound + velocity.length())
        }
    }

    pub fn potential_energy(&self, dg_e: Mat3A, vol: f32) -> f32 {
        match self {
            MaterialState::Elastic(s) => elastic::potential_energy(dg_e, vol, s),
            MaterialState::Jelly(s) => jelly::potential_energy(dg_e, vol, s),
            MaterialState::Linear(s) => linear::potential_energy(dg_e, vol, s),
            MaterialState::Snow(s) => snow::potential_energy(dg_e, vol, s),
            MaterialState::Sand(s) => sand::potential_energy(dg_e, vol, s),
            MaterialState::VonMises(s) => von_mises::potential_energy(dg_e, vol, s),
            MaterialState::Visco(s) => visco::potential_energy(dg_e, vol, s),
            MaterialState::Water(s) => water::potential_energy(s),
            MaterialState::Nonlocal(s) => nonlocal::potential_energy(s),
        }
    }

    pub fn get_name(&self) -> &'static str {
        match self {
            MaterialState::Elastic(_) => "elastic",
            MaterialState::Jelly(_) => "jelly",
            MaterialState::Linear(_) => "linear",
            MaterialState::Snow(_) => "snow",
            MaterialState::Sand(_) => "sand",
            MaterialState::VonMises(_) => "von_mises",
            MaterialState::Visco(_) => "visco",
            MaterialState::Water(_) => "water",
            MaterialState::Nonlocal(_) => "nonlocal",
        }
    }

    /// Nonlocal fluidity carried by this particle, scattered onto the grid
    /// fluidity field during rasterize; zero for every other material.
    pub fn granular_fluidity(&self) -> f32 {
        match self {
            MaterialState::Nonlocal(s) => s.gf,
            _ => 0.0,
        }
    }

    pub fn get_debug_info(&self) -> String {
        match self {
            MaterialState::Water(s) => format!("J={:.4}", s.j),
            MaterialState::Snow(s) => format!("Jp={:.4}", s.jp),
            MaterialState::Nonlocal(s) => {
                format!("gf={:.5} tau={:.4} p={:.4}", s.gf, s.tau, s.p)
            }
            _ => String::from("-"),
        }
    }
}

/// `λ, μ` from Young's modulus / Poisson ratio.
pub fn lame_parameters(youngs_modulus: f32, poisson_ratio: f32) -> EngineResult<(f32, f32)> {
    if !(-0.999..0.4999).contains(&poisson_ratio) || youngs_modulus <= 0.0 {
        return Err(EngineError::InvalidConfig {
            material: "elastic-family",
            detail: format!(
                "youngs_modulus={youngs_modulus}, poisson_ratio={poisson_ratio} out of range"
            ),
        });
    }
    let lambda = youngs_modulus * poisson_ratio / ((1.0 + poisson_ratio) * (1.0 - 2.0 * poisson_ratio));
    let mu = youngs_modulus / (2.0 * (1.0 + poisson_ratio));
    Ok((lambda, mu))
}

#[inline]
pub(crate) fn hencky_sound_speed(lambda: f32, mu: f32, density: f32) -> f32 {
    let c2 = (lambda + 2.0 * mu) / density.max(1e-6);
    c2.max(1e-20).sqrt()
}
