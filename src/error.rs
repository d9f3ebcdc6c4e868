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

//! Error taxonomy for the transfer engine.
//!
//! `InternalInvariant` violations are not represented here: they are
//! programmer errors and abort via the `invariant!` macro instead of
//! propagating through `Result`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("domain error in {where_}: {detail}")]
    Domain { where_: &'static str, detail: String },

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("invalid material config for {material}: {detail}")]
    InvalidConfig { material: &'static str, detail: String },
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Fatal assertion for invariant violations: stencil escaping the
/// allocated region, `particle_count` mismatches, `states` encoding
/// overflow. These abort rather than propagate.
#[macro_export]
macro_rules! invariant {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            panic!("internal invariant violated: {}", format!($($arg)*));
        }
    };
}
