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

//! A sparse, blocked, multi-material MLS-MPM transfer engine: particles and
//! a paged grid flow through particle-to-grid rasterize, a per-node
//! normalize/gravity pass, and grid-to-particle resample, colored for
//! lock-free parallel dispatch over disjoint blocks. Rigid bodies are an
//! external collaborator behind a trait, not owned state, so the engine has
//! no rendering or ECS dependency unless the `rapier-rigid-bodies` feature
//! asks for one.

pub mod coloring;
pub mod config;
pub mod consts;
pub mod error;
pub mod grid;
pub mod material;
pub mod math3;
pub mod particle;
pub mod persist;
pub mod rigid;
pub mod sim;
pub mod transfer;

#[cfg(feature = "rapier-rigid-bodies")]
pub mod rigid_rapier;
