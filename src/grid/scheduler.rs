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

//! Block scheduler: an 8-color graph coloring over block coordinates
//! (parity of each axis) dispatches blocks in parallel within a color
//! while guaranteeing no two concurrently running blocks share a grid
//! cell through the positive-only halo. Particles are kept sorted by
//! owning block so each block's particle range can be carved out with
//! `split_at_mut`, giving every worker a genuinely disjoint `&mut` slice
//! without `unsafe`.

use std::sync::atomic::{AtomicBool, Ordering};

use bevy_math::IVec3;
use rayon::prelude::*;

use crate::consts::{BLOCK_X, BLOCK_Y, BLOCK_Z};
use crate::error::{EngineError, EngineResult};
use crate::grid::block::{self, BlockOffset};
use crate::grid::cache::GridCache;
use crate::grid::kernel::base_cell;
use crate::grid::sparse::SparseGrid;
use crate::particle::MPMParticle;

/// Metadata for one contiguous run of particles sharing a block, produced
/// by [`sort_particles_by_block`].
#[derive(Clone, Copy, Debug)]
pub struct BlockMeta {
    pub offset: BlockOffset,
    pub coord: IVec3,
    pub color: usize,
    pub particle_start: usize,
    pub particle_count: usize,
}

/// 8 = 2 (x parity) * 2 (y parity) * 2 (z parity); blocks of the same
/// color never touch through a one-cell positive halo.
#[inline]
pub fn block_color(coord: IVec3) -> usize {
    (coord.x.rem_euclid(2) as usize)
        | ((coord.y.rem_euclid(2) as usize) << 1)
        | ((coord.z.rem_euclid(2) as usize) << 2)
}

#[inline]
pub fn block_origin(block_coord: IVec3) -> IVec3 {
    IVec3::new(
        block_coord.x * BLOCK_X as i32,
        block_coord.y * BLOCK_Y as i32,
        block_coord.z * BLOCK_Z as i32,
    )
}

fn particle_block_coord(p: &MPMParticle) -> IVec3 {
    let base = base_cell(p.pos);
    block::cell_to_block(base).0
}

/// Sorts `particles` in place by owning block (the MLS base cell's block,
/// not the raw containing cell) and returns one contiguous `BlockMeta`
/// per occupied block, in sorted order.
pub fn sort_particles_by_block(particles: &mut [MPMParticle], grid: &SparseGrid) -> Vec<BlockMeta> {
    particles.sort_by_key(|p| grid.coord_to_block_offset(particle_block_coord(p)));

    let mut metas = Vec::new();
    let mut i = 0;
    while i < particles.len() {
        let coord = particle_block_coord(&particles[i]);
        let offset = grid.coord_to_block_offset(coord);
        let start = i;
        while i < particles.len() && grid.coord_to_block_offset(particle_block_coord(&particles[i])) == offset {
            i += 1;
        }
        metas.push(BlockMeta {
            offset,
            coord,
            color: block_color(coord),
            particle_start: start,
            particle_count: i - start,
        });
    }
    metas
}

/// Splits `particles` into one disjoint `&mut` slice per `meta`, in order.
/// `metas` must describe a contiguous, gapless partition of `particles`
/// (guaranteed by [`sort_particles_by_block`]).
pub fn split_blocks_mut<'p>(
    particles: &'p mut [MPMParticle],
    metas: &[BlockMeta],
) -> Vec<&'p mut [MPMParticle]> {
    let mut rest = particles;
    let mut out = Vec::with_capacity(metas.len());
    for meta in metas {
        let (head, tail) = rest.split_at_mut(meta.particle_count);
        out.push(head);
        rest = tail;
    }
    out
}

/// Ensures `block_coord` and every neighbor its positive-only halo write
/// can reach (the 8 corners of the unit cube in block-coordinate space)
/// are committed, so the cache's sequential write-back never hits an
/// uncommitted block.
fn ensure_halo_allocated(grid: &mut SparseGrid, block_coord: IVec3) -> EngineResult<()> {
    for dz in 0..=1 {
        for dy in 0..=1 {
            for dx in 0..=1 {
                let neighbor = block_coord + IVec3::new(dx, dy, dz);
                let offset = grid.coord_to_block_offset(neighbor);
                grid.allocate(offset)?;
            }
        }
    }
    Ok(())
}

/// Runs `block_fn` once per occupied block, grouped into 8 sequential
/// color phases with a full barrier between colors: within a color every
/// block runs in parallel against its own `GridCache`; write-back to the
/// shared `grid` happens sequentially once the color's parallel phase
/// completes. `cancel`, when set, is polled at each color boundary so a
/// long-running step can be aborted between phases.
pub fn run_colored<F>(
    metas: &[BlockMeta],
    particles: &mut [MPMParticle],
    grid: &mut SparseGrid,
    cancel: Option<&AtomicBool>,
    block_fn: F,
) -> EngineResult<()>
where
    F: Fn(&BlockMeta, &mut [MPMParticle], &mut GridCache) -> EngineResult<()> + Sync,
{
    let slices = split_blocks_mut(particles, metas);
    let mut combined: Vec<(&BlockMeta, &mut [MPMParticle])> = metas.iter().zip(slices).collect();
    let mut errors = Vec::new();

    for color in 0..8 {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(EngineError::Domain {
                    where_: "scheduler::run_colored",
                    detail: "cancelled at color boundary".to_string(),
                });
            }
        }

        let (this_color, rest): (Vec<_>, Vec<_>) =
            combined.into_iter().partition(|(m, _)| m.color == color);
        combined = rest;
        if this_color.is_empty() {
            continue;
        }

        for (meta, _) in &this_color {
            ensure_halo_allocated(grid, meta.coord)?;
        }

        let mut caches: Vec<GridCache> = this_color
            .iter()
            .map(|(meta, _)| GridCache::load(grid, block_origin(meta.coord)))
            .collect();

        let block_results: Vec<EngineResult<()>> = this_color
            .into_par_iter()
            .zip(caches.par_iter_mut())
            .map(|((meta, pslice), cache)| block_fn(meta, pslice, cache))
            .collect();

        for cache in &caches {
            cache.write_back(grid);
        }

        for result in block_results {
            if let Err(e) = result {
                errors.push(e);
            }
        }
    }

    if let Some(first) = errors.into_iter().next() {
        Err(first)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::Vec3A;
    use std::sync::atomic::AtomicUsize;

    fn dummy_particle(pos: Vec3A) -> MPMParticle {
        MPMParticle::new(
            pos,
            1.0,
            1.0,
            crate::material::MaterialState::Linear(crate::material::linear::LinearState {
                lambda: 1.0,
                mu: 1.0,
            }),
        )
    }

    #[test]
    fn sort_groups_particles_by_block() {
        let grid = SparseGrid::new(64);
        let mut particles = vec![
            dummy_particle(Vec3A::new(20.0, 0.5, 0.5)),
            dummy_particle(Vec3A::new(0.5, 0.5, 0.5)),
            dummy_particle(Vec3A::new(0.6, 0.5, 0.5)),
        ];
        let metas = sort_particles_by_block(&mut particles, &grid);
        assert_eq!(metas.len(), 2);
        let total: usize = metas.iter().map(|m| m.particle_count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn same_color_blocks_never_overlap_in_halo() {
        for ax in -3..=3 {
            for ay in -3..=3 {
                let a = IVec3::new(ax, ay, 0);
                let b = IVec3::new(ax + 2, ay, 0);
                if block_color(a) == block_color(b) {
                    // two blocks two apart on one axis share no cell even
                    // with a one-cell halo on both sides.
                    let halo_reach = BLOCK_X as i32 + 1;
                    assert!(block_origin(b).x - block_origin(a).x >= halo_reach);
                }
            }
        }
    }

    #[test]
    fn run_colored_visits_every_block_exactly_once() {
        let mut grid = SparseGrid::new(256);
        let mut particles: Vec<MPMParticle> = (0..8)
            .map(|i| dummy_particle(Vec3A::new(i as f32 * 20.0 + 0.5, 0.5, 0.5)))
            .collect();
        let metas = sort_particles_by_block(&mut particles, &grid);
        let visited = AtomicUsize::new(0);
        run_colored(&metas, &mut particles, &mut grid, None, |_meta, pslice, _cache| {
            visited.fetch_add(pslice.len(), Ordering::Relaxed);
            Ok(())
        })
        .unwrap();
        assert_eq!(visited.load(Ordering::Relaxed), 8);
    }
}
