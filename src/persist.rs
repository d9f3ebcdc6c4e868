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

//! Persisted state layout for replay: a block-ordered dump of particles
//! plus the live-block set. The `states` field is carried as a raw `u32`
//! (not re-derived) so the encoding stays bit-exact across a save/load
//! round trip.

use bevy_math::{Mat3A, Vec3A};
use serde::{Deserialize, Serialize};

use crate::grid::block::BlockOffset;
use crate::material::MaterialState;
use crate::particle::MPMParticle;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedParticle {
    pub pos: [f32; 3],
    pub velocity: [f32; 3],
    pub apic_b: [f32; 9],
    pub apic_c: [f32; 9],
    pub dg_e: [f32; 9],
    pub vol: f32,
    pub mass: f32,
    pub states: u32,
    pub material: MaterialState,
}

fn mat3_to_array(m: Mat3A) -> [f32; 9] {
    let cols = m.to_cols_array();
    cols
}

fn array_to_mat3(a: [f32; 9]) -> Mat3A {
    Mat3A::from_cols_array(&a)
}

impl From<&MPMParticle> for PersistedParticle {
    fn from(p: &MPMParticle) -> Self {
        PersistedParticle {
            pos: p.pos.into(),
            velocity: p.velocity.into(),
            apic_b: mat3_to_array(p.apic_b),
            apic_c: mat3_to_array(p.apic_c),
            dg_e: mat3_to_array(p.dg_e),
            vol: p.vol,
            mass: p.mass,
            states: p.states,
            material: p.material.clone(),
        }
    }
}

impl From<PersistedParticle> for MPMParticle {
    fn from(s: PersistedParticle) -> Self {
        let mut p = MPMParticle::new(Vec3A::from(s.pos), s.mass, s.vol, s.material);
        p.velocity = Vec3A::from(s.velocity);
        p.apic_b = array_to_mat3(s.apic_b);
        p.apic_c = array_to_mat3(s.apic_c);
        p.dg_e = array_to_mat3(s.dg_e);
        p.states = s.states;
        p
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub particles: Vec<PersistedParticle>,
    pub live_blocks: Vec<BlockOffset>,
}

impl PersistedSnapshot {
    pub fn capture(particles: &[MPMParticle], live_blocks: &[BlockOffset]) -> Self {
        PersistedSnapshot {
            particles: particles.iter().map(PersistedParticle::from).collect(),
            live_blocks: live_blocks.to_vec(),
        }
    }

    pub fn restore(self) -> (Vec<MPMParticle>, Vec<BlockOffset>) {
        let particles = self.particles.into_iter().map(MPMParticle::from).collect();
        (particles, self.live_blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{linear::LinearState, MaterialState};

    #[test]
    fn particle_round_trips_through_persisted_form() {
        let mut p = MPMParticle::new(
            Vec3A::new(1.0, 2.0, 3.0),
            2.0,
            1.0,
            MaterialState::Linear(LinearState { lambda: 10.0, mu: 5.0 }),
        );
        p.velocity = Vec3A::new(0.1, 0.2, 0.3);
        p.states = 0b1010;

        let persisted = PersistedParticle::from(&p);
        let back = MPMParticle::from(persisted);

        assert_eq!(back.pos, p.pos);
        assert_eq!(back.velocity, p.velocity);
        assert_eq!(back.states, p.states);
        assert_eq!(back.mass, p.mass);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let p = MPMParticle::new(
            Vec3A::new(1.0, 2.0, 3.0),
            2.0,
            1.0,
            MaterialState::Linear(LinearState { lambda: 10.0, mu: 5.0 }),
        );
        let snapshot = PersistedSnapshot::capture(&[p], &[]);

        let json = serde_json::to_string(&snapshot).expect("snapshot serializes");
        let back: PersistedSnapshot = serde_json::from_str(&json).expect("snapshot deserializes");

        let (particles, _) = back.restore();
        assert_eq!(particles.len(), 1);
        assert_eq!(particles[0].pos, Vec3A::new(1.0, 2.0, 3.0));
        match &particles[0].material {
            MaterialState::Linear(s) => {
                assert_eq!(s.lambda, 10.0);
                assert_eq!(s.mu, 5.0);
            }
            other => panic!("expected Linear, got {other:?}"),
        }
    }
}
