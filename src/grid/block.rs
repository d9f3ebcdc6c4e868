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

//! Block identity and the bit-interleaved (Morton / Z-order) coordinate
//! encoding: `linear_to_coord` is pure bit manipulation, no division or
//! multiplication, so it stays cheap on the hot dispatch path.

use bevy_math::IVec3;

use crate::consts::{BLOCK_X, BLOCK_Y, BLOCK_Z};

pub type BlockOffset = u64;

/// Block-local cell index within `[0, BLOCK_X) x [0, BLOCK_Y) x [0, BLOCK_Z)`,
/// laid out block-linear: x fastest, then y, then z.
#[inline]
pub fn cell_linear_index(local: IVec3) -> usize {
    debug_assert!((local.x as u32) < BLOCK_X);
    debug_assert!((local.y as u32) < BLOCK_Y);
    debug_assert!((local.z as u32) < BLOCK_Z);
    (local.x as usize) + (local.y as usize) * BLOCK_X as usize
        + (local.z as usize) * (BLOCK_X * BLOCK_Y) as usize
}

/// Interleave the low 21 bits of `v` with two zero bits between each bit.
#[inline]
fn spread_bits(v: u32) -> u64 {
    let mut x = v as u64 & 0x1f_ffff;
    x = (x | (x << 32)) & 0x1f00000000ffff;
    x = (x | (x << 16)) & 0x1f0000ff0000ff;
    x = (x | (x << 8)) & 0x100f00f00f00f00f;
    x = (x | (x << 4)) & 0x10c30c30c30c30c3;
    x = (x | (x << 2)) & 0x1249249249249249;
    x
}

#[inline]
fn compact_bits(v: u64) -> u32 {
    let mut x = v & 0x1249249249249249;
    x = (x | (x >> 2)) & 0x10c30c30c30c30c3;
    x = (x | (x >> 4)) & 0x100f00f00f00f00f;
    x = (x | (x >> 8)) & 0x1f0000ff0000ff;
    x = (x | (x >> 16)) & 0x1f00000000ffff;
    x = (x | (x >> 32)) & 0x1f_ffff;
    x as u32
}

/// Block coordinates (in units of whole blocks, not cells) to a Morton
/// offset. Coordinates must be non-negative.
#[inline]
pub fn coord_to_block_offset(block_coord: IVec3) -> BlockOffset {
    debug_assert!(block_coord.x >= 0 && block_coord.y >= 0 && block_coord.z >= 0);
    spread_bits(block_coord.x as u32)
        | (spread_bits(block_coord.y as u32) << 1)
        | (spread_bits(block_coord.z as u32) << 2)
}

/// Pure bit manipulation: Morton offset back to block coordinates.
#[inline]
pub fn linear_to_coord(offset: BlockOffset) -> IVec3 {
    IVec3::new(
        compact_bits(offset) as i32,
        compact_bits(offset >> 1) as i32,
        compact_bits(offset >> 2) as i32,
    )
}

/// World cell coordinate to the (block coordinate, local-cell) pair.
#[inline]
pub fn cell_to_block(cell: IVec3) -> (IVec3, IVec3) {
    let block = IVec3::new(
        cell.x.div_euclid(BLOCK_X as i32),
        cell.y.div_euclid(BLOCK_Y as i32),
        cell.z.div_euclid(BLOCK_Z as i32),
    );
    let local = IVec3::new(
        cell.x.rem_euclid(BLOCK_X as i32),
        cell.y.rem_euclid(BLOCK_Y as i32),
        cell.z.rem_euclid(BLOCK_Z as i32),
    );
    (block, local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morton_roundtrip() {
        for coord in [
            IVec3::new(0, 0, 0),
            IVec3::new(1, 0, 0),
            IVec3::new(0, 1, 0),
            IVec3::new(0, 0, 1),
            IVec3::new(7, 3, 5),
            IVec3::new(1023, 1, 1023),
        ] {
            let offset = coord_to_block_offset(coord);
            assert_eq!(linear_to_coord(offset), coord);
        }
    }

    #[test]
    fn cell_to_block_roundtrip_within_block() {
        let (block, local) = cell_to_block(IVec3::new(5, 9, -1));
        assert_eq!(block, IVec3::new(1, 2, -1));
        assert_eq!(local, IVec3::new(1, 1, 3));
    }

    #[test]
    fn block_linear_index_is_x_fastest() {
        assert_eq!(cell_linear_index(IVec3::new(0, 0, 0)), 0);
        assert_eq!(cell_linear_index(IVec3::new(1, 0, 0)), 1);
        assert_eq!(
            cell_linear_index(IVec3::new(0, 1, 0)),
            BLOCK_X as usize
        );
        assert_eq!(
            cell_linear_index(IVec3::new(0, 0, 1)),
            (BLOCK_X * BLOCK_Y) as usize
        );
    }
}
