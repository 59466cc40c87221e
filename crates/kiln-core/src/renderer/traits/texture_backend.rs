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

use crate::renderer::error::TextureError;
use crate::resource::texture::Texture;
use std::fmt::Debug;

/// The device-side half of a texture resource.
///
/// One implementation exists per graphics backend. The backend owns the
/// native GPU resource handle and performs the minimal upload satisfying
/// the front end's pending-operation set and dirty map. A backend is owned
/// by its `Texture` and never outlives it.
pub trait TextureBackend: Debug {
    /// Allocates the native resource for `texture`.
    ///
    /// Pixel-format negotiation happens here: a format the platform cannot
    /// express is a fatal construction-time error and must leave no
    /// partial native resource allocated.
    ///
    /// Storage for the full mip chain is reserved once; later uploads
    /// write sub-regions and never reallocate unless the resource is
    /// destroyed and reinitialized (e.g. by a resize).
    fn initialize(&mut self, texture: &Texture) -> Result<(), TextureError>;

    /// Performs the minimal GPU transfer for the texture's pending
    /// operations and dirty map, then commits the result back to the
    /// front end (new GPU size, cleared dirty state) via
    /// [`Texture::commit_upload`].
    ///
    /// A no-op when nothing is pending.
    fn upload(&mut self, texture: &mut Texture) -> Result<(), TextureError>;

    /// Releases the native handle after a context-loss event and re-marks
    /// the texture fully dirty, so a later `initialize` + `upload` pair
    /// restores the GPU-visible content from the untouched CPU-side
    /// levels.
    fn lose_context(&mut self, texture: &mut Texture);

    /// Releases the native handle. Terminal: unlike `lose_context`, the
    /// texture is not re-dirtied.
    fn destroy(&mut self);
}
