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

//! Block-local haloed scratch copy of `GridState`.
//!
//! A particle is assigned to the block whose `[0,Bx)x[0,By)x[0,Bz)` local
//! range contains its MLS base cell (`floor(pos - 0.5)`), so the stencil's
//! three offsets `base, base+1, base+2` only ever reach one block past the
//! block's own range on the positive side, never the negative side. That
//! is why the halo here is one-cell-wide and positive-only: scratch index
//! equals world-cell-minus-block-origin directly, no shift.

use bevy_math::IVec3;

use crate::consts::{BLOCK_X, BLOCK_Y, BLOCK_Z};
use crate::grid::sparse::SparseGrid;
use crate::grid::state::GridState;

const CX: usize = (BLOCK_X + 2) as usize;
const CY: usize = (BLOCK_Y + 2) as usize;
const CZ: usize = (BLOCK_Z + 2) as usize;
pub const CACHE_CELLS: usize = CX * CY * CZ;

pub struct GridCache {
    origin: IVec3,
    cells: [GridState; CACHE_CELLS],
}

#[inline]
fn cache_index(local: IVec3) -> usize {
    debug_assert!(local.x >= 0 && (local.x as usize) < CX);
    debug_assert!(local.y >= 0 && (local.y as usize) < CY);
    debug_assert!(local.z >= 0 && (local.z as usize) < CZ);
    local.x as usize + local.y as usize * CX + local.z as usize * CX * CY
}

impl GridCache {
    /// Load the block at `origin` (in cell coordinates) plus its one-cell
    /// positive halo from `grid`.
    pub fn load(grid: &SparseGrid, origin: IVec3) -> Self {
        let mut cells = [GridState::zero(); CACHE_CELLS];
        for lz in 0..CZ as i32 {
            for ly in 0..CY as i32 {
                for lx in 0..CX as i32 {
                    let local = IVec3::new(lx, ly, lz);
                    cells[cache_index(local)] = grid.get(origin + local);
                }
            }
        }
        GridCache { origin, cells }
    }

    #[inline]
    pub fn origin(&self) -> IVec3 {
        self.origin
    }

    /// `world` must lie within the cached region (the block's own range
    /// plus its one-cell positive halo); this is guaranteed by the stencil
    /// invariant and is checked in debug builds only.
    #[inline]
    pub fn get(&self, world: IVec3) -> GridState {
        let local = world - self.origin;
        self.cells[cache_index(local)]
    }

    #[inline]
    pub fn get_mut(&mut self, world: IVec3) -> &mut GridState {
        let local = world - self.origin;
        &mut self.cells[cache_index(local)]
    }

    /// Write the block's own `[0,Bx)x[0,By)x[0,Bz)` range plus the positive
    /// halo back to `grid` (the halo write lands in the neighbor block,
    /// which is why two blocks whose neighborhoods overlap must never run
    /// concurrently under the scheduler's coloring discipline).
    pub fn write_back(&self, grid: &mut SparseGrid) {
        for lz in 0..CZ as i32 {
            for ly in 0..CY as i32 {
                for lx in 0..CX as i32 {
                    let local = IVec3::new(lx, ly, lz);
                    let world = self.origin + local;
                    *grid.get_mut(world) = self.cells[cache_index(local)];
                }
            }
        }
    }

    /// Writes back only the block's own owned cells (no halo); used by the
    /// non-rigid-aware momentum-only path where the halo is additive and
    /// handled by the `write_back` full variant instead.
    pub fn write_back_owned(&self, grid: &mut SparseGrid) {
        for lz in 0..BLOCK_Z as i32 {
            for ly in 0..BLOCK_Y as i32 {
                for lx in 0..BLOCK_X as i32 {
                    let local = IVec3::new(lx, ly, lz);
                    let world = self.origin + local;
                    *grid.get_mut(world) = self.cells[cache_index(local)];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::block;

    #[test]
    fn stencil_access_within_halo_never_panics() {
        let mut grid = SparseGrid::new(64);
        for bx in -1..=1 {
            for by in -1..=1 {
                for bz in -1..=1 {
                    let (block_coord, _) = block::cell_to_block(IVec3::new(
                        bx * BLOCK_X as i32,
                        by * BLOCK_Y as i32,
                        bz * BLOCK_Z as i32,
                    ));
                    let offset = grid.coord_to_block_offset(block_coord);
                    grid.allocate(offset).unwrap();
                }
            }
        }
        let cache = GridCache::load(&grid, IVec3::ZERO);
        // base in [0, Bx) with stencil reaching base+2, up to Bx+1.
        for base in 0..BLOCK_X as i32 {
            for k in 0..3 {
                let _ = cache.get(IVec3::new(base + k, 0, 0));
            }
        }
    }

    #[test]
    fn write_back_round_trips() {
        let mut grid = SparseGrid::new(16);
        let offset = grid.coord_to_block_offset(IVec3::ZERO);
        grid.allocate(offset).unwrap();
        let mut cache = GridCache::load(&grid, IVec3::ZERO);
        cache.get_mut(IVec3::new(1, 1, 1)).velocity_and_mass.w = 7.0;
        cache.write_back(&mut grid);
        assert_eq!(grid.get(IVec3::new(1, 1, 1)).mass(), 7.0);
    }
}
