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

//! Virtual-memory-backed sparse grid of `GridState` blocks.
//!
//! A real production build commits pages by `mmap`-ing a large reservation
//! and touching block-sized ranges; here the commit is simulated with a
//! page table (`HashMap<BlockOffset, Box<[GridState; N]>>`) capped by
//! `max_blocks`, which stands in for the address-space reservation and
//! gives `allocate` a concrete `ResourceExhausted` failure mode to surface.

use std::collections::{HashMap, HashSet};

use bevy_math::IVec3;

use crate::consts::BLOCK_CELLS;
use crate::error::{EngineError, EngineResult};
use crate::grid::block::{self, BlockOffset};
use crate::grid::state::GridState;

pub struct SparseGrid {
    blocks: HashMap<BlockOffset, Box<[GridState; BLOCK_CELLS]>>,
    /// Blocks known to contain at least one cell near a rigid surface;
    /// consulted to pick the rigid-aware block kernel.
    rigid_page_map: HashSet<BlockOffset>,
    max_blocks: usize,
}

impl SparseGrid {
    pub fn new(max_blocks: usize) -> Self {
        SparseGrid {
            blocks: HashMap::new(),
            rigid_page_map: HashSet::new(),
            max_blocks,
        }
    }

    #[inline]
    pub fn linear_to_coord(&self, offset: BlockOffset) -> IVec3 {
        block::linear_to_coord(offset)
    }

    #[inline]
    pub fn coord_to_block_offset(&self, coord: IVec3) -> BlockOffset {
        block::coord_to_block_offset(coord)
    }

    #[inline]
    pub fn is_allocated(&self, block_offset: BlockOffset) -> bool {
        self.blocks.contains_key(&block_offset)
    }

    pub fn allocate(&mut self, block_offset: BlockOffset) -> EngineResult<()> {
        if self.blocks.contains_key(&block_offset) {
            return Ok(());
        }
        if self.blocks.len() >= self.max_blocks {
            return Err(EngineError::ResourceExhausted(format!(
                "cannot commit block {block_offset}: {} blocks already committed (cap {})",
                self.blocks.len(),
                self.max_blocks
            )));
        }
        self.blocks
            .insert(block_offset, Box::new([GridState::zero(); BLOCK_CELLS]));
        Ok(())
    }

    pub fn mark_rigid_aware(&mut self, block_offset: BlockOffset) {
        self.rigid_page_map.insert(block_offset);
    }

    pub fn clear_rigid_page_map(&mut self) {
        self.rigid_page_map.clear();
    }

    #[inline]
    pub fn is_rigid_aware(&self, block_offset: BlockOffset) -> bool {
        self.rigid_page_map.contains(&block_offset)
    }

    /// Cells in uncommitted blocks read as zero.
    pub fn get(&self, coord: IVec3) -> GridState {
        let (block_coord, local) = block::cell_to_block(coord);
        let offset = self.coord_to_block_offset(block_coord);
        match self.blocks.get(&offset) {
            Some(cells) => cells[block::cell_linear_index(local)],
            None => GridState::zero(),
        }
    }

    /// Fatal: writing into an unallocated block is a programmer error, not
    /// a recoverable condition (the caller must `allocate` first).
    pub fn get_mut(&mut self, coord: IVec3) -> &mut GridState {
        let (block_coord, local) = block::cell_to_block(coord);
        let offset = self.coord_to_block_offset(block_coord);
        let cells = self
            .blocks
            .get_mut(&offset)
            .unwrap_or_else(|| panic!("write to uncommitted block at {block_coord:?}"));
        &mut cells[block::cell_linear_index(local)]
    }

    pub fn block(&self, block_offset: BlockOffset) -> Option<&[GridState; BLOCK_CELLS]> {
        self.blocks.get(&block_offset).map(|b| b.as_ref())
    }

    pub fn block_mut(&mut self, block_offset: BlockOffset) -> Option<&mut [GridState; BLOCK_CELLS]> {
        self.blocks.get_mut(&block_offset).map(|b| b.as_mut())
    }

    pub fn live_block_offsets(&self) -> Vec<BlockOffset> {
        self.blocks.keys().copied().collect()
    }

    pub fn committed_block_count(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncommitted_block_reads_zero() {
        let grid = SparseGrid::new(16);
        let s = grid.get(IVec3::new(3, 3, 3));
        assert_eq!(s.mass(), 0.0);
    }

    #[test]
    fn allocate_then_write_then_read() {
        let mut grid = SparseGrid::new(16);
        let offset = grid.coord_to_block_offset(IVec3::ZERO);
        grid.allocate(offset).unwrap();
        grid.get_mut(IVec3::new(1, 1, 1)).velocity_and_mass.w = 2.0;
        assert_eq!(grid.get(IVec3::new(1, 1, 1)).mass(), 2.0);
        assert_eq!(grid.get(IVec3::new(0, 0, 0)).mass(), 0.0);
    }

    #[test]
    fn allocation_cap_is_resource_exhausted() {
        let mut grid = SparseGrid::new(1);
        grid.allocate(grid.coord_to_block_offset(IVec3::new(0, 0, 0)))
            .unwrap();
        let err = grid
            .allocate(grid.coord_to_block_offset(IVec3::new(1, 0, 0)))
            .unwrap_err();
        assert!(matches!(err, EngineError::ResourceExhausted(_)));
    }

    #[test]
    #[should_panic(expected = "uncommitted block")]
    fn write_to_uncommitted_block_is_fatal() {
        let mut grid = SparseGrid::new(16);
        let _ = grid.get_mut(IVec3::new(0, 0, 0));
    }
}
