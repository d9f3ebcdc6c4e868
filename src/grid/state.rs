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

//! One fixed-size record per grid node.
//!
//! Mixing `f64` (`distance`) with `f32` (everything else) is deliberate, not
//! an oversight: the CDF-style coloring distance needs the extra precision
//! for stable sign tests near thin rigid surfaces, while the momentum path
//! stays in `f32` for bandwidth. Preserve these field widths; they are part
//! of the persisted replay format.

use bevy_math::Vec4;

use crate::consts::{ID_BITS, MAX_NUM_RIGID_BODIES, TAG_BITS};

/// `states` decoding: `side_tag(r) = (states >> (2*r)) & 3`, rigid id is
/// `(states >> TAG_BITS) - 1` (zero meaning "no rigid body touches this
/// cell").
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct GridState {
    /// Momentum vector in the first `dim` lanes, mass in the last lane.
    /// After post-rasterize normalization this holds velocity instead.
    pub velocity_and_mass: Vec4,
    /// Signed distance to the nearest rigid surface.
    pub distance: f64,
    /// Packed per-rigid side tags (low `2*R` bits) + rigid id + 1 (high bits).
    pub states: u32,
    /// Particles whose base cell lies in this node's block slot.
    pub particle_count: u32,
    /// Spinlock byte for the "use locks" build mode; unused under the
    /// default coloring discipline.
    pub lock: u8,
    /// Reserved bits, carried through for replay/forward-compat.
    pub flags: u16,
    /// Nonlocal material's fluidity scalar field.
    pub granular_fluidity: f32,
    pub aux0: f32,
    pub aux1: f32,
    pub aux2: f32,
    pub aux3: f32,
}

impl GridState {
    pub const fn zero() -> Self {
        GridState {
            velocity_and_mass: Vec4::ZERO,
            distance: 0.0,
            states: 0,
            particle_count: 0,
            lock: 0,
            flags: 0,
            granular_fluidity: 0.0,
            aux0: 0.0,
            aux1: 0.0,
            aux2: 0.0,
            aux3: 0.0,
        }
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.velocity_and_mass.w
    }

    #[inline]
    pub fn momentum(&self) -> bevy_math::Vec3A {
        bevy_math::Vec3A::new(
            self.velocity_and_mass.x,
            self.velocity_and_mass.y,
            self.velocity_and_mass.z,
        )
    }

    #[inline]
    pub fn set_velocity(&mut self, v: bevy_math::Vec3A) {
        self.velocity_and_mass.x = v.x;
        self.velocity_and_mass.y = v.y;
        self.velocity_and_mass.z = v.z;
    }

    /// Rigid body id touching this cell, or `None`.
    #[inline]
    pub fn rigid_id(&self) -> Option<usize> {
        let encoded = (self.states >> TAG_BITS) as usize;
        if encoded == 0 {
            None
        } else {
            Some(encoded - 1)
        }
    }

    #[inline]
    pub fn set_rigid_id(&mut self, id: Option<usize>) {
        let encoded = match id {
            None => 0u32,
            Some(id) => {
                debug_assert!(id < MAX_NUM_RIGID_BODIES);
                (id + 1) as u32
            }
        };
        self.states = (self.states & ((1 << TAG_BITS) - 1)) | (encoded << TAG_BITS);
    }

    #[inline]
    pub fn side_tag(&self, rigid: usize) -> u32 {
        side_tag(self.states, rigid)
    }

    #[inline]
    pub fn set_side_tag(&mut self, rigid: usize, active: bool, side: bool) {
        debug_assert!(rigid < MAX_NUM_RIGID_BODIES);
        let active_bit = 1u32 << (2 * rigid + 1);
        let side_bit = 1u32 << (2 * rigid);
        self.states = (self.states & !(active_bit | side_bit))
            | if active { active_bit } else { 0 }
            | if active && side { side_bit } else { 0 };
    }

    /// Merge another particle/cell's `states` bits into this one: grid
    /// `states` is the union of contributing particles'.
    #[inline]
    pub fn merge_states(&mut self, other: u32) {
        self.states |= other & ((1u32 << TAG_BITS) - 1);
    }

    /// Clears everything rasterize accumulates over a step: momentum/mass,
    /// fluidity, particle count, and the per-step side-tag bits. The rigid
    /// id (high bits of `states`) and the level-set `distance` are
    /// geometry-derived and persist across steps.
    #[inline]
    pub fn clear_for_step(&mut self) {
        self.velocity_and_mass = Vec4::ZERO;
        self.granular_fluidity = 0.0;
        self.particle_count = 0;
        self.states &= !((1u32 << TAG_BITS) - 1);
    }
}

#[inline]
pub fn side_tag(states: u32, rigid: usize) -> u32 {
    debug_assert!(rigid < MAX_NUM_RIGID_BODIES);
    (states >> (2 * rigid)) & 0b11
}

const _: () = assert!(ID_BITS > 0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rigid_id_roundtrip() {
        let mut g = GridState::zero();
        g.set_rigid_id(Some(5));
        assert_eq!(g.rigid_id(), Some(5));
        g.set_rigid_id(None);
        assert_eq!(g.rigid_id(), None);
    }

    #[test]
    fn side_tag_bits_independent_of_rigid_id() {
        let mut g = GridState::zero();
        g.set_rigid_id(Some(3));
        g.set_side_tag(2, true, true);
        assert_eq!(g.rigid_id(), Some(3));
        assert_eq!(g.side_tag(2) & 0b1, 1);
    }

    #[test]
    fn merge_states_is_union() {
        let mut g = GridState::zero();
        g.states = 0b0010;
        g.merge_states(0b0101);
        assert_eq!(g.states & 0b0111, 0b0111);
    }

    #[test]
    fn clear_for_step_preserves_rigid_id_but_not_mass_or_tags() {
        let mut g = GridState::zero();
        g.set_rigid_id(Some(4));
        g.set_side_tag(1, true, true);
        g.velocity_and_mass.w = 3.0;
        g.granular_fluidity = 0.5;
        g.particle_count = 2;

        g.clear_for_step();

        assert_eq!(g.rigid_id(), Some(4));
        assert_eq!(g.mass(), 0.0);
        assert_eq!(g.granular_fluidity, 0.0);
        assert_eq!(g.particle_count, 0);
        assert_eq!(g.side_tag(1), 0);
    }
}
