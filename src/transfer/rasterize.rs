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

//! Particle-to-grid: scatters mass, APIC affine momentum, the elastic
//! force contribution, and (for nonlocal-granular particles) fluidity
//! onto the 27-node quadratic stencil. A
//! particle whose side tag disagrees with a rigid-aware cell's tag never
//! contributes to that cell's momentum; instead the velocity difference
//! against the rigid body's friction-projected surface velocity, plus the
//! stress contribution, is redirected as an impulse (CPIC cutting).
//! Impulses are collected into a shared sink rather than applied directly
//! to a `RigidRegistry`, since many blocks rasterize concurrently under
//! the scheduler's coloring and `RigidBody::apply_tmp_impulse` takes
//! `&mut self`; the caller drains the sink and applies impulses
//! sequentially once the color's parallel phase has finished.

use std::sync::Mutex;

use bevy_math::Vec4;

use crate::coloring;
use crate::grid::cache::GridCache;
use crate::grid::kernel::Stencil;
use crate::particle::MPMParticle;
use crate::rigid::RigidRegistry;
use bevy_math::Vec3A;

/// `(rigid_id, world_pos, impulse)` entries collected during rasterize,
/// to be applied to the matching `RigidBody` after the parallel phase.
pub type ImpulseSink = Mutex<Vec<(usize, Vec3A, Vec3A)>>;

/// Rasterizes every particle in `particles` onto `cache`. `dt` scales the
/// elastic force term only; gravity and grid-wide normalization are
/// applied afterward, once per node, not per particle contribution.
pub fn rasterize_block(
    particles: &[MPMParticle],
    cache: &mut GridCache,
    rigids: &RigidRegistry,
    impulses: &ImpulseSink,
    dt: f32,
) {
    for p in particles {
        let stencil = Stencil::new(p.pos);
        let force = p.material.calculate_force(p.dg_e, p.vol);
        let stress_term = force * (4.0 * dt);
        let c = p.apic_b * 4.0;
        let gf = p.material.granular_fluidity();

        stencil.for_each(|_i, _j, _k, w, cell_coord| {
            if w <= 0.0 {
                return;
            }

            let cell = cache.get_mut(cell_coord);
            let dpos = cell_coord.as_vec3a() - p.pos;
            let stress_contrib = stress_term * dpos * w;

            if let Some(rigid_id) = cell.rigid_id() {
                if !coloring::same_side(p.states, cell.states, rigid_id) {
                    let projected = match rigids.get(rigid_id) {
                        Some(rb) => {
                            let v_base = rb.velocity_at(cell_coord.as_vec3a());
                            let friction = rb.frictions()[0];
                            let normal = (p.pos - cell_coord.as_vec3a())
                                .try_normalize()
                                .unwrap_or(Vec3A::Y);
                            coloring::friction_project(p.velocity, v_base, normal, friction)
                        }
                        None => p.velocity,
                    };
                    let impulse = (p.velocity - projected) * (p.mass * w) + stress_contrib;
                    impulses
                        .lock()
                        .unwrap()
                        .push((rigid_id, cell_coord.as_vec3a(), impulse));
                    return;
                }
            }

            let momentum = (p.velocity + c * dpos) * (p.mass * w) + stress_contrib;

            cell.velocity_and_mass += Vec4::new(momentum.x, momentum.y, momentum.z, w * p.mass);
            cell.granular_fluidity += w * p.mass * gf;
            cell.merge_states(p.states);
            cell.particle_count += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::{IVec3, Mat3A, Vec3A};

    use crate::grid::sparse::SparseGrid;
    use crate::material::{linear::LinearState, MaterialState};
    use crate::rigid::RigidRegistry;
    use std::sync::Mutex;

    fn still_particle(pos: Vec3A, mass: f32) -> MPMParticle {
        let mut p = MPMParticle::new(
            pos,
            mass,
            1.0,
            MaterialState::Linear(LinearState { lambda: 0.0, mu: 0.0 }),
        );
        p.velocity = Vec3A::ZERO;
        p.apic_b = Mat3A::ZERO;
        p
    }

    #[test]
    fn stationary_particle_conserves_mass() {
        let mut grid = SparseGrid::new(64);
        let offset = grid.coord_to_block_offset(IVec3::ZERO);
        grid.allocate(offset).unwrap();
        let mut cache = GridCache::load(&grid, IVec3::ZERO);
        let rigids = RigidRegistry::new();
        let impulses: ImpulseSink = Mutex::new(Vec::new());

        let particles = vec![still_particle(Vec3A::splat(2.0), 3.0)];
        rasterize_block(&particles, &mut cache, &rigids, &impulses, 1.0 / 60.0);

        let mut total_mass = 0.0;
        for k in 0..3 {
            for j in 0..3 {
                for i in 0..3 {
                    let coord = IVec3::new(2, 2, 2) + IVec3::new(i - 1, j - 1, k - 1);
                    total_mass += cache.get(coord).mass();
                }
            }
        }
        assert!((total_mass - 3.0).abs() < 1e-3);
    }

    #[test]
    fn affine_contribution_scales_with_mass() {
        let mut grid = SparseGrid::new(64);
        let offset = grid.coord_to_block_offset(IVec3::ZERO);
        grid.allocate(offset).unwrap();
        let mut cache = GridCache::load(&grid, IVec3::ZERO);
        let rigids = RigidRegistry::new();
        let impulses: ImpulseSink = Mutex::new(Vec::new());

        let mut p = MPMParticle::new(
            Vec3A::splat(2.5),
            2.0,
            1.0,
            MaterialState::Linear(LinearState { lambda: 0.0, mu: 0.0 }),
        );
        p.velocity = Vec3A::new(1.0, 0.0, 0.0);
        p.apic_b = Mat3A::from_cols(Vec3A::new(1.0, 0.0, 0.0), Vec3A::ZERO, Vec3A::ZERO);

        let stencil = Stencil::new(p.pos);
        let c = p.apic_b * 4.0;
        let corner = IVec3::new(1, 1, 1);
        let w = stencil.weight(0, 0, 0);
        let dpos = corner.as_vec3a() - p.pos;
        let expected = (p.velocity + c * dpos) * (p.mass * w);

        let particles = vec![p];
        rasterize_block(&particles, &mut cache, &rigids, &impulses, 1.0 / 60.0);

        let momentum = cache.get(corner).momentum();
        assert!((momentum - expected).length() < 1e-4);
    }

    #[test]
    fn cut_cell_impulse_uses_friction_projected_velocity() {
        use crate::rigid::test_double::StaticRigidBody;

        let mut grid = SparseGrid::new(64);
        let offset = grid.coord_to_block_offset(IVec3::ZERO);
        grid.allocate(offset).unwrap();
        let mut cache = GridCache::load(&grid, IVec3::ZERO);

        let corner = IVec3::new(1, 1, 1);
        cache.get_mut(corner).set_rigid_id(Some(0));
        cache.get_mut(corner).set_side_tag(0, true, true);

        let mut rigids = RigidRegistry::new();
        rigids.register(Box::new(StaticRigidBody {
            id: 0,
            velocity: Vec3A::ZERO,
            friction: -1.0, // sticky: node takes the rigid's velocity exactly
            accumulated_impulse: Vec3A::ZERO,
        }));
        let impulses: ImpulseSink = Mutex::new(Vec::new());

        let mut p = still_particle(Vec3A::splat(2.5), 2.0);
        p.velocity = Vec3A::new(3.0, 0.0, 0.0);
        p.states = 0b10; // active, opposite side from the cell's tag

        let stencil = Stencil::new(p.pos);
        let w = stencil.weight(0, 0, 0);
        let expected = p.velocity * (p.mass * w); // sticky: v_base = 0

        let particles = vec![p];
        rasterize_block(&particles, &mut cache, &rigids, &impulses, 1.0 / 60.0);

        let pushed = impulses.lock().unwrap();
        assert_eq!(pushed.len(), 1);
        let (rigid_id, _pos, impulse) = pushed[0];
        assert_eq!(rigid_id, 0);
        assert!((impulse - expected).length() < 1e-4);
        assert_eq!(cache.get(corner).mass(), 0.0);
    }
}
