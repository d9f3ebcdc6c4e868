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

//! External rigid-body collaborator contract. The engine never owns
//! rigid-body dynamics; it only queries velocities and accumulates
//! impulses through this trait, so any physics backend (or a test
//! double) can sit on the other side of it.

use bevy_math::Vec3A;

use crate::consts::MAX_NUM_RIGID_BODIES;

/// Per-rigid-body friction coefficient slots consulted by
/// [`crate::coloring::friction_project`]; index 0 is the only one read
/// today but the slot array leaves room for multi-surface bodies.
pub const FRICTION_SLOTS: usize = 1;

pub trait RigidBody: Send + Sync {
    /// Stable id in `[0, MAX_NUM_RIGID_BODIES)`, used to index the grid
    /// and particle `states` side-tag bits.
    fn id(&self) -> usize;

    /// Velocity of the rigid body's material point nearest `world_pos`.
    fn velocity_at(&self, world_pos: Vec3A) -> Vec3A;

    /// Accumulates a transfer-engine impulse on the rigid body for this
    /// step; cleared by the next [`RigidBody::reset_tmp_velocity`].
    fn apply_tmp_impulse(&mut self, world_pos: Vec3A, impulse: Vec3A);

    /// Clears the step-scoped impulse accumulator.
    fn reset_tmp_velocity(&mut self);

    /// Folds the step's accumulated impulse into the rigid body's real
    /// velocity (and angular velocity, if it has one).
    fn apply_tmp_velocity(&mut self);

    /// Friction coefficients consulted by [`crate::coloring::friction_project`];
    /// encodes sticky (`-1.0`) / frictional-slip (`<= -2.0`) / frictionless
    /// (anything else) per the same convention as the grid `states` tags.
    fn frictions(&self) -> [f32; FRICTION_SLOTS];
}

/// Looks rigid bodies up by id for the transfer stages; ids must be
/// unique and below `MAX_NUM_RIGID_BODIES`.
#[derive(Default)]
pub struct RigidRegistry {
    bodies: Vec<Box<dyn RigidBody>>,
}

impl RigidRegistry {
    pub fn new() -> Self {
        RigidRegistry { bodies: Vec::new() }
    }

    pub fn register(&mut self, body: Box<dyn RigidBody>) {
        debug_assert!(body.id() < MAX_NUM_RIGID_BODIES);
        debug_assert!(self.bodies.iter().all(|b| b.id() != body.id()));
        self.bodies.push(body);
    }

    pub fn get(&self, id: usize) -> Option<&dyn RigidBody> {
        self.bodies.iter().find(|b| b.id() == id).map(|b| b.as_ref())
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Box<dyn RigidBody>> {
        self.bodies.iter_mut().find(|b| b.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn RigidBody> {
        self.bodies.iter().map(|b| b.as_ref())
    }

    pub fn reset_all_tmp_velocities(&mut self) {
        for b in &mut self.bodies {
            b.reset_tmp_velocity();
        }
    }

    pub fn apply_all_tmp_velocities(&mut self) {
        for b in &mut self.bodies {
            b.apply_tmp_velocity();
        }
    }
}

#[cfg(test)]
pub mod test_double {
    use super::*;

    /// A fixed-velocity rigid body, useful for unit tests that don't need
    /// real dynamics.
    pub struct StaticRigidBody {
        pub id: usize,
        pub velocity: Vec3A,
        pub friction: f32,
        pub accumulated_impulse: Vec3A,
    }

    impl RigidBody for StaticRigidBody {
        fn id(&self) -> usize {
            self.id
        }

        fn velocity_at(&self, _world_pos: Vec3A) -> Vec3A {
            self.velocity
        }

        fn apply_tmp_impulse(&mut self, _world_pos: Vec3A, impulse: Vec3A) {
            self.accumulated_impulse += impulse;
        }

        fn reset_tmp_velocity(&mut self) {
            self.accumulated_impulse = Vec3A::ZERO;
        }

        fn apply_tmp_velocity(&mut self) {
            // Infinite-mass test double: external impulses never move it.
        }

        fn frictions(&self) -> [f32; FRICTION_SLOTS] {
            [self.friction]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_double::StaticRigidBody;
    use super::*;

    #[test]
    fn registry_looks_up_by_id() {
        let mut reg = RigidRegistry::new();
        reg.register(Box::new(StaticRigidBody {
            id: 3,
            velocity: Vec3A::ZERO,
            friction: -1.0,
            accumulated_impulse: Vec3A::ZERO,
        }));
        assert!(reg.get(3).is_some());
        assert!(reg.get(4).is_none());
    }
}
