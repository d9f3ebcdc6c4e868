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

//! CPIC-style cutting: per-rigid-body side tags on particles and grid
//! nodes keep thin rigid surfaces from leaking momentum across them, and
//! friction projection resolves a node's velocity against a rigid
//! body's surface once both sides agree they are in contact.

use bevy_math::Vec3A;

use crate::consts::MAX_NUM_RIGID_BODIES;
use crate::grid::state::side_tag;

/// A grid node and a particle are compatible for direct momentum
/// transfer for rigid body `r` unless they are tagged on opposite sides
/// of its cutting surface (both tagged "active" with differing side
/// bits).
#[inline]
pub fn same_side(particle_states: u32, grid_states: u32, rigid: usize) -> bool {
    let p = side_tag(particle_states, rigid);
    let g = side_tag(grid_states, rigid);
    let p_active = p & 0b10 != 0;
    let g_active = g & 0b10 != 0;
    if !p_active || !g_active {
        true
    } else {
        (p & 0b01) == (g & 0b01)
    }
}

/// Whether `particle_states` and `grid_states` are compatible across
/// every tracked rigid body.
pub fn compatible(particle_states: u32, grid_states: u32) -> bool {
    (0..MAX_NUM_RIGID_BODIES).all(|r| same_side(particle_states, grid_states, r))
}

/// Projects a node velocity `v` against a rigid body moving with
/// `v_base` at the contact point, along outward normal `n`, with
/// friction coefficient `mu`:
/// - `mu == -1.0`: sticky contact, the node takes the rigid body's full
///   velocity.
/// - `mu <= -2.0`: slip with Coulomb friction, `-mu - 2.0` used as the
///   friction coefficient and the normal component dropped entirely.
/// - otherwise: the normal component is kept when separating (`rel.n >=
///   0`) and removed when approaching.
pub fn friction_project(v: Vec3A, v_base: Vec3A, n: Vec3A, mu: f32) -> Vec3A {
    if mu == -1.0 {
        return v_base;
    }

    let slip = mu <= -2.0;
    let mu_eff = if slip { -mu - 2.0 } else { mu };

    let rel = v - v_base;
    let vn = rel.dot(n);
    let v_n = n * vn;
    let v_t = rel - v_n;

    let eps = 1e-9;
    let t_norm = v_t.length();
    let s = (t_norm + vn.min(0.0) * mu_eff).max(0.0) / t_norm.max(eps);

    let normal_term = if slip { 0.0 } else { vn.max(0.0) };
    v_t * s + n * normal_term + v_base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_contact_takes_rigid_velocity() {
        let v = Vec3A::new(1.0, 2.0, 3.0);
        let v_base = Vec3A::new(0.5, 0.0, 0.0);
        let n = Vec3A::Y;
        assert_eq!(friction_project(v, v_base, n, -1.0), v_base);
    }

    #[test]
    fn separating_velocity_is_untouched() {
        let v = Vec3A::new(0.0, 5.0, 0.0);
        let v_base = Vec3A::ZERO;
        let n = Vec3A::Y;
        assert_eq!(friction_project(v, v_base, n, 0.0), v);
    }

    #[test]
    fn frictionless_slip_removes_only_normal_component() {
        let v = Vec3A::new(3.0, -1.0, 0.0);
        let v_base = Vec3A::ZERO;
        let n = Vec3A::Y;
        let result = friction_project(v, v_base, n, 0.0);
        assert!((result.y).abs() < 1e-5);
        assert!((result.x - 3.0).abs() < 1e-5);
    }

    #[test]
    fn untagged_rigid_is_always_compatible() {
        assert!(compatible(0, 0));
    }

    #[test]
    fn opposite_sides_are_incompatible() {
        let mut p = 0u32;
        let mut g = 0u32;
        p |= 0b10; // active, side 0
        g |= 0b11; // active, side 1
        assert!(!same_side(p, g, 0));
    }
}
