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

//! Scenario and material configuration, loaded the way `assets/constants.json`
//! is loaded elsewhere in this codebase: strip `//`-prefixed lines, then
//! `serde_json::from_str`. Failures surface as `EngineError::InvalidConfig`
//! instead of `.expect`-ing.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::material::{
    elastic::ElasticState, jelly::JellyState, linear::LinearState, nonlocal::NonlocalState,
    sand::SandState, snow::SnowState, visco::ViscoState, von_mises::VonMisesState,
    water::WaterState, lame_parameters, MaterialState,
};

/// Reads `path`, strips `//`-prefixed comment lines, and deserializes as `T`.
pub fn read_json<T>(path: &Path) -> EngineResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    let raw = fs::read_to_string(path).map_err(|e| EngineError::InvalidConfig {
        material: "config-file",
        detail: format!("failed to open {}: {e}", path.display()),
    })?;
    let mut stripped = String::with_capacity(raw.len());
    for line in raw.lines() {
        if !line.trim_start().starts_with("//") {
            stripped.push_str(line);
        }
    }
    serde_json::from_str(&stripped).map_err(|e| EngineError::InvalidConfig {
        material: "config-file",
        detail: format!("format error in {}: {e}", path.display()),
    })
}

/// One entry of the configuration table: the recognized option names per
/// material family, tagged by `kind` in JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MaterialConfig {
    Elastic { youngs_modulus: f32, poisson_ratio: f32 },
    Jelly { youngs_modulus: f32, poisson_ratio: f32 },
    Linear { youngs_modulus: f32, poisson_ratio: f32 },
    Snow {
        youngs_modulus: f32,
        poisson_ratio: f32,
        hardening: f32,
        theta_c: f32,
        theta_s: f32,
        #[serde(default = "default_jp")]
        jp: f32,
    },
    Sand {
        youngs_modulus: f32,
        poisson_ratio: f32,
        friction_angle: f32,
        #[serde(default)]
        cohesion: f32,
    },
    VonMises { youngs_modulus: f32, poisson_ratio: f32, yield_stress: f32 },
    Visco {
        youngs_modulus: f32,
        poisson_ratio: f32,
        tau: f32,
        #[serde(default = "default_decay")]
        decay_per_step: f32,
    },
    Water { k: f32, gamma: f32 },
    Nonlocal {
        s_mod: f32,
        b_mod: f32,
        a_mat: f32,
        dia: f32,
        density: f32,
        mu_s: f32,
        mu_2: f32,
        i_0: f32,
    },
}

fn default_jp() -> f32 {
    1.0
}

fn default_decay() -> f32 {
    1.0
}

impl MaterialConfig {
    /// Builds the initial `MaterialState` for a freshly spawned particle.
    /// Returns `InvalidConfig` if the family's parameters are out of the
    /// physically valid range (elastic family: `lame_parameters`).
    pub fn build(&self) -> EngineResult<MaterialState> {
        match self {
            MaterialConfig::Elastic { youngs_modulus, poisson_ratio } => {
                let (lambda, mu) = lame_parameters(*youngs_modulus, *poisson_ratio)?;
                Ok(MaterialState::Elastic(ElasticState { lambda, mu }))
            }
            MaterialConfig::Jelly { youngs_modulus, poisson_ratio } => {
                let (lambda, mu) = lame_parameters(*youngs_modulus, *poisson_ratio)?;
                Ok(MaterialState::Jelly(JellyState { lambda, mu }))
            }
            MaterialConfig::Linear { youngs_modulus, poisson_ratio } => {
                let (lambda, mu) = lame_parameters(*youngs_modulus, *poisson_ratio)?;
                Ok(MaterialState::Linear(LinearState { lambda, mu }))
            }
            MaterialConfig::Snow { youngs_modulus, poisson_ratio, hardening, theta_c, theta_s, jp } => {
                let (lambda, mu) = lame_parameters(*youngs_modulus, *poisson_ratio)?;
                Ok(MaterialState::Snow(SnowState {
                    lambda_0: lambda,
                    mu_0: mu,
                    hardening: *hardening,
                    critical_compression: *theta_c,
                    critical_stretch: *theta_s,
                    jp: *jp,
                }))
            }
            MaterialConfig::Sand { youngs_modulus, poisson_ratio, friction_angle, cohesion } => {
                let (lambda, mu) = lame_parameters(*youngs_modulus, *poisson_ratio)?;
                Ok(MaterialState::Sand(SandState {
                    lambda,
                    mu,
                    friction_angle_deg: *friction_angle,
                    cohesion: *cohesion,
                }))
            }
            MaterialConfig::VonMises { youngs_modulus, poisson_ratio, yield_stress } => {
                let (lambda, mu) = lame_parameters(*youngs_modulus, *poisson_ratio)?;
                Ok(MaterialState::VonMises(VonMisesState { lambda, mu, yield_stress: *yield_stress }))
            }
            MaterialConfig::Visco { youngs_modulus, poisson_ratio, tau, decay_per_step } => {
                let (lambda, mu) = lame_parameters(*youngs_modulus, *poisson_ratio)?;
                Ok(MaterialState::Visco(ViscoState {
                    lambda,
                    mu,
                    relaxation_time: *tau,
                    decay_per_step: *decay_per_step,
                }))
            }
            MaterialConfig::Water { k, gamma } => {
                if *k <= 0.0 || *gamma <= 0.0 {
                    return Err(EngineError::InvalidConfig {
                        material: "water",
                        detail: format!("k={k}, gamma={gamma} must both be positive"),
                    });
                }
                Ok(MaterialState::Water(WaterState { bulk_modulus: *k, gamma: *gamma, j: 1.0 }))
            }
            MaterialConfig::Nonlocal { s_mod, b_mod, a_mat, dia, density, mu_s, mu_2, i_0 } => {
                if *mu_2 <= *mu_s {
                    return Err(EngineError::InvalidConfig {
                        material: "nonlocal",
                        detail: format!("mu_2={mu_2} must exceed mu_s={mu_s}"),
                    });
                }
                Ok(MaterialState::Nonlocal(NonlocalState {
                    lambda: *b_mod,
                    mu: *s_mod,
                    mu_s: *mu_s,
                    mu_2: *mu_2,
                    i_0: *i_0,
                    rho_grain: *density,
                    grain_diameter: *dia,
                    nonlocal_amplitude: *a_mat,
                    gf: 0.0,
                    tau: 0.0,
                    p: 0.0,
                    stress: bevy_math::Mat3A::ZERO,
                }))
            }
        }
    }
}

/// World/runtime configuration: the handful of scalars every scenario
/// needs regardless of which materials it uses.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    pub dt: f32,
    pub gravity_y: f32,
    pub damping: f32,
    pub max_blocks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            dt: 1.0 / 60.0,
            gravity_y: -9.8,
            damping: 0.0,
            max_blocks: 1 << 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_config_builds_rest_state() {
        let cfg = MaterialConfig::Water { k: 1.0e4, gamma: 7.0 };
        let state = cfg.build().unwrap();
        assert_eq!(state.get_name(), "water");
    }

    #[test]
    fn elastic_config_rejects_out_of_range_poisson_ratio() {
        let cfg = MaterialConfig::Elastic { youngs_modulus: 1000.0, poisson_ratio: 0.5 };
        assert!(cfg.build().is_err());
    }

    #[test]
    fn nonlocal_config_requires_mu_2_above_mu_s() {
        let cfg = MaterialConfig::Nonlocal {
            s_mod: 1000.0,
            b_mod: 2000.0,
            a_mat: 0.01,
            dia: 0.001,
            density: 2500.0,
            mu_s: 0.6,
            mu_2: 0.4,
            i_0: 0.3,
        };
        assert!(cfg.build().is_err());
    }
}
