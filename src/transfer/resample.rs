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

//! Grid-to-particle: rebuilds each particle's velocity and APIC affine
//! matrix from the 27-node stencil, advances position by `dt`, and runs
//! the material's plasticity update on the incremental deformation
//! gradient. A node whose side tag disagrees with the particle's sees a
//! friction-projected velocity instead of its raw one, so a particle
//! never "reads through" a rigid cutting surface either.

use bevy_math::{Mat3A, Vec3A};

use crate::coloring;
use crate::grid::cache::GridCache;
use crate::grid::kernel::Stencil;
use crate::particle::MPMParticle;
use crate::rigid::RigidRegistry;

/// Resamples every particle in `particles` from `cache`, which must
/// already hold normalized (not momentum) velocities. `lap_gf` is the
/// nonlocal fluidity Laplacian at the particle's block, consumed only by
/// [`crate::material::MaterialState::Nonlocal`].
pub fn resample_block(
    particles: &mut [MPMParticle],
    cache: &GridCache,
    rigids: &RigidRegistry,
    dt: f32,
    damping: f32,
    lap_gf: f32,
) {
    for p in particles.iter_mut() {
        let stencil = Stencil::new(p.pos);
        let mut new_velocity = Vec3A::ZERO;
        let mut b = Mat3A::ZERO;

        stencil.for_each(|_i, _j, _k, w, cell_coord| {
            if w <= 0.0 {
                return;
            }
            let cell = cache.get(cell_coord);
            if cell.mass() <= 0.0 {
                return;
            }

            let mut v_i = Vec3A::new(
                cell.velocity_and_mass.x,
                cell.velocity_and_mass.y,
                cell.velocity_and_mass.z,
            );

            if let Some(rigid_id) = cell.rigid_id() {
                if !coloring::same_side(p.states, cell.states, rigid_id) {
                    if let Some(rb) = rigids.get(rigid_id) {
                        let v_base = rb.velocity_at(cell_coord.as_vec3a());
                        let friction = rb.frictions()[0];
                        let normal = (p.pos - cell_coord.as_vec3a())
                            .try_normalize()
                            .unwrap_or(Vec3A::Y);
                        v_i = coloring::friction_project(v_i, v_base, normal, friction);
                    }
                }
            }

            new_velocity += v_i * w;
            let dpos = cell_coord.as_vec3a() - p.pos;
            b += Mat3A::from_cols(v_i * dpos.x, v_i * dpos.y, v_i * dpos.z) * w;
        });

        p.apic_b = b;
        p.apic_c = (b - b.transpose()) * 0.5;
        p.velocity = new_velocity * (1.0 - damping);

        let f_inc = Mat3A::IDENTITY + b * (4.0 * dt);
        p.material.plasticity(&mut p.dg_e, f_inc, lap_gf);

        p.pos += p.velocity * dt;

        if p.sticky && p.boundary_distance < 0.0 {
            p.pos -= p.velocity * dt;
            p.velocity = Vec3A::ZERO;
        } else if p.boundary_distance < 0.0 {
            let vn = p.velocity.dot(p.boundary_normal);
            if vn < 0.0 {
                p.velocity -= p.boundary_normal * vn;
                p.pos += p.boundary_normal * (-p.boundary_distance);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::IVec3;

    use crate::grid::sparse::SparseGrid;
    use crate::material::{linear::LinearState, MaterialState};

    #[test]
    fn uniform_grid_velocity_is_reproduced_exactly() {
        let mut grid = SparseGrid::new(64);
        let offset = grid.coord_to_block_offset(IVec3::ZERO);
        grid.allocate(offset).unwrap();
        let mut cache = GridCache::load(&grid, IVec3::ZERO);
        for k in 0..6 {
            for j in 0..6 {
                for i in 0..6 {
                    let c = cache.get_mut(IVec3::new(i, j, k));
                    c.velocity_and_mass = bevy_math::Vec4::new(1.0, 0.0, 0.0, 1.0);
                }
            }
        }

        let mut p = MPMParticle::new(
            Vec3A::splat(2.3),
            1.0,
            1.0,
            MaterialState::Linear(LinearState { lambda: 0.0, mu: 0.0 }),
        );
        let rigids = RigidRegistry::new();
        resample_block(std::slice::from_mut(&mut p), &cache, &rigids, 1.0 / 60.0, 0.0, 0.0);

        assert!((p.velocity.x - 1.0).abs() < 1e-4);
        assert!(p.velocity.y.abs() < 1e-4);
    }

    #[test]
    fn apic_c_is_always_antisymmetric() {
        let mut grid = SparseGrid::new(64);
        let offset = grid.coord_to_block_offset(IVec3::ZERO);
        grid.allocate(offset).unwrap();
        let mut cache = GridCache::load(&grid, IVec3::ZERO);
        for k in 0..6 {
            for j in 0..6 {
                for i in 0..6 {
                    let c = cache.get_mut(IVec3::new(i, j, k));
                    let v = Vec3A::new(i as f32 * 0.1, j as f32 * -0.2, k as f32 * 0.05);
                    c.velocity_and_mass = bevy_math::Vec4::new(v.x, v.y, v.z, 1.0);
                }
            }
        }

        let mut p = MPMParticle::new(
            Vec3A::splat(2.7),
            1.0,
            1.0,
            MaterialState::Linear(LinearState { lambda: 0.0, mu: 0.0 }),
        );
        let rigids = RigidRegistry::new();
        resample_block(std::slice::from_mut(&mut p), &cache, &rigids, 1.0 / 60.0, 0.0, 0.0);

        let sum = p.apic_c + p.apic_c.transpose();
        assert!(sum.x_axis.length() < 1e-4);
        assert!(sum.y_axis.length() < 1e-4);
        assert!(sum.z_axis.length() < 1e-4);
    }
}
