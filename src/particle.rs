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

//! Particle record. Owned exclusively by a flat array indexed by id;
//! mutated only by its owning block's P2G/G2P pass.

use bevy_math::{Mat3A, Vec3A};

use crate::material::MaterialState;

#[derive(Clone, Debug)]
pub struct MPMParticle {
    pub pos: Vec3A,
    pub velocity: Vec3A,
    pub mass: f32,
    pub vol: f32,

    /// APIC affine velocity matrix ("B").
    pub apic_b: Mat3A,
    /// APIC-C quadratic term matrix.
    pub apic_c: Mat3A,

    /// Elastic deformation gradient, shared by every material.
    pub dg_e: Mat3A,

    /// Per-rigid side tags, mirroring the grid `states` encoding.
    pub states: u32,

    pub boundary_normal: Vec3A,
    pub boundary_distance: f32,
    pub sticky: bool,

    pub material: MaterialState,
}

impl MPMParticle {
    pub fn new(pos: Vec3A, mass: f32, vol: f32, material: MaterialState) -> Self {
        MPMParticle {
            pos,
            velocity: Vec3A::ZERO,
            mass,
            vol,
            apic_b: Mat3A::ZERO,
            apic_c: Mat3A::ZERO,
            dg_e: Mat3A::IDENTITY,
            states: 0,
            boundary_normal: Vec3A::ZERO,
            boundary_distance: f32::MAX,
            sticky: false,
            material,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Vec3A {
        self.velocity
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }
}
