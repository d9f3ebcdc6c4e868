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

//! The background grid: sparse block storage, the quadratic MLS kernel,
//! block-local haloed scratch (`GridCache`), and the 8-color parallel
//! block scheduler that dispatches work across them.

pub mod block;
pub mod cache;
pub mod kernel;
pub mod scheduler;
pub mod sparse;
pub mod state;
