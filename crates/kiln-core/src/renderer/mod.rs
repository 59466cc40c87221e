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

//! Renderer-facing types: pixel formats, texture state enums, error
//! hierarchy, lighting helpers, and the backend trait contracts.

pub mod error;
pub mod format;
pub mod lightmap;
pub mod texture;
pub mod traits;

pub use error::{ResourceError, TextureError};
pub use format::TextureFormat;
pub use texture::{
    AddressMode, CompareFunction, FilterMode, LockMode, ParamFlags, PendingOps, TextureId,
    TextureKind, TextureOptions,
};
pub use traits::TextureBackend;
