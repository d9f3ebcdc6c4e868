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

//! Ties the block scheduler and the two transfer kernels into a single
//! `step()`: clear every committed cell's per-step accumulators, rasterize,
//! a per-node normalization/gravity pass, then resample, matching the
//! reset-then-`update_grid_cells` barrier `water/grid.rs` uses (divide
//! momentum by mass, then fold in gravity and external force) generalized
//! from a single fluid field to the multi-material, rigid-aware grid here.

use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

use bevy_math::{IVec3, Vec3A};

use crate::error::EngineResult;
use crate::grid::cache::GridCache;
use crate::grid::scheduler;
use crate::grid::sparse::SparseGrid;
use crate::particle::MPMParticle;
use crate::rigid::RigidRegistry;
use crate::transfer::rasterize::{self, ImpulseSink};
use crate::transfer::resample;

pub struct Simulation {
    pub particles: Vec<MPMParticle>,
    pub grid: SparseGrid,
    pub rigids: RigidRegistry,
    pub dt: f32,
    pub gravity: Vec3A,
    pub damping: f32,
}

impl Simulation {
    pub fn new(max_blocks: usize, dt: f32, gravity_y: f32, damping: f32) -> Self {
        Simulation {
            particles: Vec::new(),
            grid: SparseGrid::new(max_blocks),
            rigids: RigidRegistry::new(),
            dt,
            gravity: Vec3A::new(0.0, gravity_y, 0.0),
            damping,
        }
    }

    /// Advances the whole particle set by one `dt`. Returns `Err` if the
    /// scheduler is cancelled or a block hits a resource limit.
    pub fn step(&mut self) -> EngineResult<()> {
        self.step_cancellable(None)
    }

    pub fn step_cancellable(&mut self, cancel: Option<&AtomicBool>) -> EngineResult<()> {
        log::debug!(
            "simulation step: {} particles, {} committed blocks",
            self.particles.len(),
            self.grid.committed_block_count()
        );

        self.rigids.reset_all_tmp_velocities();
        clear_grid(&mut self.grid);

        let metas = scheduler::sort_particles_by_block(&mut self.particles, &self.grid);
        let impulses: ImpulseSink = Mutex::new(Vec::new());
        let dt = self.dt;
        let rigids = &self.rigids;

        scheduler::run_colored(
            &metas,
            &mut self.particles,
            &mut self.grid,
            cancel,
            |_meta, pslice, cache| {
                rasterize::rasterize_block(pslice, cache, rigids, &impulses, dt);
                Ok(())
            },
        )?;

        for (rigid_id, world_pos, impulse) in impulses.into_inner().unwrap() {
            if let Some(rb) = self.rigids.get_mut(rigid_id) {
                rb.apply_tmp_impulse(world_pos, impulse);
            }
        }
        self.rigids.apply_all_tmp_velocities();

        normalize_grid(&mut self.grid, self.gravity, dt);

        let damping = self.damping;
        let rigids = &self.rigids;
        scheduler::run_colored(
            &metas,
            &mut self.particles,
            &mut self.grid,
            cancel,
            |_meta, pslice, cache| {
                let lap_gf = block_fluidity_laplacian(cache);
                resample::resample_block(pslice, cache, rigids, dt, damping, lap_gf);
                Ok(())
            },
        )?;

        Ok(())
    }
}

/// Zeroes every committed cell's per-step accumulators before rasterize
/// scatters onto them; otherwise a cell's mass and momentum would grow
/// every step instead of being rebuilt fresh from this step's particles.
fn clear_grid(grid: &mut SparseGrid) {
    for offset in grid.live_block_offsets() {
        if let Some(cells) = grid.block_mut(offset) {
            for cell in cells.iter_mut() {
                cell.clear_for_step();
            }
        }
    }
}

/// Per-node post-rasterize pass: momentum to velocity where mass is
/// present, gravity added afterward so it reaches massless cells exactly
/// as often as massive ones (never). Runs once per committed cell,
/// independent of block order, so no coloring discipline is needed here.
fn normalize_grid(grid: &mut SparseGrid, gravity: Vec3A, dt: f32) {
    for offset in grid.live_block_offsets() {
        if let Some(cells) = grid.block_mut(offset) {
            for cell in cells.iter_mut() {
                let mass = cell.mass();
                if mass <= 0.0 {
                    continue;
                }
                let v = cell.momentum() / mass + gravity * dt;
                cell.set_velocity(v);
                cell.granular_fluidity /= mass;
            }
        }
    }
}

/// Six-point finite-difference Laplacian of the grid fluidity field,
/// sampled at the block's interior cell `(1,1,1)` since the cache has no
/// negative-side halo to center a stencil on cell `(0,0,0)`.
fn block_fluidity_laplacian(cache: &GridCache) -> f32 {
    let o = cache.origin();
    let center = o + IVec3::new(1, 1, 1);
    let c = cache.get(center).granular_fluidity;
    let sum = cache.get(o + IVec3::new(0, 1, 1)).granular_fluidity
        + cache.get(o + IVec3::new(2, 1, 1)).granular_fluidity
        + cache.get(o + IVec3::new(1, 0, 1)).granular_fluidity
        + cache.get(o + IVec3::new(1, 2, 1)).granular_fluidity
        + cache.get(o + IVec3::new(1, 1, 0)).granular_fluidity
        + cache.get(o + IVec3::new(1, 1, 2)).granular_fluidity;
    sum - 6.0 * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{linear::LinearState, MaterialState};

    #[test]
    fn falling_particle_gains_downward_velocity() {
        let mut sim = Simulation::new(1 << 10, 1.0 / 60.0, -9.8, 0.0);
        sim.particles.push(MPMParticle::new(
            Vec3A::splat(4.0),
            1.0,
            1.0,
            MaterialState::Linear(LinearState { lambda: 0.0, mu: 0.0 }),
        ));

        sim.step().unwrap();

        assert!(sim.particles[0].velocity.y < 0.0);
    }

    #[test]
    fn step_preserves_particle_count() {
        let mut sim = Simulation::new(1 << 10, 1.0 / 60.0, -9.8, 0.0);
        for i in 0..5 {
            sim.particles.push(MPMParticle::new(
                Vec3A::new(4.0 + i as f32 * 0.3, 4.0, 4.0),
                1.0,
                1.0,
                MaterialState::Linear(LinearState { lambda: 100.0, mu: 50.0 }),
            ));
        }
        sim.step().unwrap();
        assert_eq!(sim.particles.len(), 5);
    }
}
