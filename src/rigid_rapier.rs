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

//! [`crate::rigid::RigidBody`] adapter over a `bevy_rapier3d` entity.
//!
//! The engine itself never touches an ECS `World`: a bevy system snapshots
//! the handful of components this needs (`Transform`, rapier's `Velocity`,
//! `ReadMassProperties`) once per step via [`RapierRigidBody::snapshot`],
//! registers the result with a [`crate::rigid::RigidRegistry`], runs the
//! transfer step, then a second system copies the accumulated impulse back
//! out through [`RapierRigidBody::drain_impulse`] onto the entity's
//! `ExternalImpulse`: build the collider snapshot from component data first,
//! then mutate the component from the result.

use bevy::prelude::{Entity, GlobalTransform};
use bevy_math::Vec3A;
use bevy_rapier3d::prelude::{ExternalImpulse, ReadMassProperties, Velocity};

use crate::rigid::{RigidBody, FRICTION_SLOTS};

fn to_vec3a(v: bevy::prelude::Vec3) -> Vec3A {
    Vec3A::new(v.x, v.y, v.z)
}

fn from_vec3a(v: Vec3A) -> bevy::prelude::Vec3 {
    bevy::prelude::Vec3::new(v.x, v.y, v.z)
}

/// A per-step snapshot of one rapier rigid body, adapted to
/// [`RigidBody`]. Cheap to construct and drop every frame; it borrows
/// nothing from the `World` after construction.
pub struct RapierRigidBody {
    entity: Entity,
    id: usize,
    translation: Vec3A,
    linvel: Vec3A,
    angvel: Vec3A,
    mass: f32,
    friction: f32,
    tmp_impulse: Vec3A,
    tmp_torque_impulse: Vec3A,
}

impl RapierRigidBody {
    /// Builds a snapshot from the components a system reads for `entity`.
    /// `id` must be the stable slot this body occupies in the grid/particle
    /// side-tag bits (`< MAX_NUM_RIGID_BODIES`).
    pub fn snapshot(
        entity: Entity,
        id: usize,
        transform: &GlobalTransform,
        velocity: &Velocity,
        mass_props: &ReadMassProperties,
        friction: f32,
    ) -> Self {
        RapierRigidBody {
            entity,
            id,
            translation: to_vec3a(transform.translation()),
            linvel: to_vec3a(velocity.linvel),
            angvel: to_vec3a(velocity.angvel),
            mass: mass_props.get().mass.max(1e-6),
            friction,
            tmp_impulse: Vec3A::ZERO,
            tmp_torque_impulse: Vec3A::ZERO,
        }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Writes the step's accumulated impulse into rapier's own
    /// `ExternalImpulse` component; rapier integrates it on the next
    /// physics tick rather than the engine moving the body itself.
    pub fn drain_impulse(&mut self, out: &mut ExternalImpulse) {
        out.impulse += from_vec3a(self.tmp_impulse);
        out.torque_impulse += from_vec3a(self.tmp_torque_impulse);
        self.tmp_impulse = Vec3A::ZERO;
        self.tmp_torque_impulse = Vec3A::ZERO;
    }
}

impl RigidBody for RapierRigidBody {
    fn id(&self) -> usize {
        self.id
    }

    fn velocity_at(&self, world_pos: Vec3A) -> Vec3A {
        self.linvel + self.angvel.cross(world_pos - self.translation)
    }

    fn apply_tmp_impulse(&mut self, world_pos: Vec3A, impulse: Vec3A) {
        self.tmp_impulse += impulse;
        self.tmp_torque_impulse += (world_pos - self.translation).cross(impulse);
    }

    fn reset_tmp_velocity(&mut self) {
        self.tmp_impulse = Vec3A::ZERO;
        self.tmp_torque_impulse = Vec3A::ZERO;
    }

    fn apply_tmp_velocity(&mut self) {
        self.linvel += self.tmp_impulse / self.mass;
    }

    fn frictions(&self) -> [f32; FRICTION_SLOTS] {
        [self.friction]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::prelude::{Transform, Vec3};
    use bevy_rapier3d::prelude::MassProperties;

    fn body_at_origin() -> RapierRigidBody {
        RapierRigidBody::snapshot(
            Entity::from_raw(0),
            0,
            &GlobalTransform::from(Transform::from_translation(Vec3::ZERO)),
            &Velocity { linvel: Vec3::ZERO, angvel: Vec3::ZERO },
            &ReadMassProperties(MassProperties { mass: 2.0, ..Default::default() }),
            -1.0,
        )
    }

    #[test]
    fn impulse_updates_linear_velocity_by_inverse_mass() {
        let mut body = body_at_origin();
        body.apply_tmp_impulse(Vec3A::ZERO, Vec3A::new(4.0, 0.0, 0.0));
        body.apply_tmp_velocity();
        assert!((body.linvel.x - 2.0).abs() < 1e-4);
    }

    #[test]
    fn stationary_body_has_zero_velocity_everywhere() {
        let body = body_at_origin();
        assert_eq!(body.velocity_at(Vec3A::new(3.0, 0.0, 0.0)), Vec3A::ZERO);
    }
}
