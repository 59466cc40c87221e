// Copyright 2025 the Kiln contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Kiln Core
//!
//! Device-independent foundation of the Kiln rendering engine: the texture
//! resource front end (pixel ownership, dirty tracking, upload scheduling),
//! the backend-agnostic upload planner, VRAM accounting, and the contracts a
//! graphics backend implements.

#![warn(missing_docs)]

pub mod asset;
pub mod math;
pub mod renderer;
pub mod resource;
pub mod utils;
