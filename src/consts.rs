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

//! Compile-time constants that must be preserved across implementations
//! for replay compatibility.

/// Quadratic B-spline kernel order. Fixed; this engine has no other kernel.
pub const MPM_KERNEL_ORDER: u32 = 2;

/// This engine always runs the MLS-MPM affine form, never the plain
/// non-MLS PIC/FLIP fallback path.
pub const USE_MLS_MPM: bool = true;

/// Maximum number of simultaneously tracked rigid bodies.
pub const MAX_NUM_RIGID_BODIES: usize = 12;

/// Bit width of the `states` low region: `2 * MAX_NUM_RIGID_BODIES`.
pub const TAG_BITS: u32 = 24;

/// Bit width reserved for the encoded rigid-body id (`id + 1`).
pub const ID_BITS: u32 = 8;

const _: () = assert!(TAG_BITS as usize == 2 * MAX_NUM_RIGID_BODIES);
const _: () = assert!(TAG_BITS + ID_BITS == 32);

/// Block tile dimensions (power of two on every axis).
pub const BLOCK_X: u32 = 4;
pub const BLOCK_Y: u32 = 4;
pub const BLOCK_Z: u32 = 4;
pub const BLOCK_CELLS: usize = (BLOCK_X * BLOCK_Y * BLOCK_Z) as usize;

const _: () = assert!(BLOCK_X.is_power_of_two());
const _: () = assert!(BLOCK_Y.is_power_of_two());
const _: () = assert!(BLOCK_Z.is_power_of_two());
