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

//! The owning-device record shared by every texture.

use crate::renderer::texture::TextureId;
use crate::resource::vram::VramTracker;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Device state every texture holds a reference to: the VRAM tracker, the
/// platform upload limit, the live-texture list, and the binding-cache
/// epoch.
///
/// Constructed once per graphics device by the backend crate and handed to
/// textures as `Arc<DeviceShared>`.
#[derive(Debug)]
pub struct DeviceShared {
    vram: VramTracker,
    max_texture_dimension: u32,
    live_textures: Mutex<Vec<TextureId>>,
    binding_epoch: AtomicU64,
}

impl DeviceShared {
    /// Creates the shared record with the platform's maximum texture
    /// dimension (used to decide when image-like sources must be
    /// downsampled before upload).
    pub fn new(max_texture_dimension: u32) -> Self {
        Self {
            vram: VramTracker::new(),
            max_texture_dimension,
            live_textures: Mutex::new(Vec::new()),
            binding_epoch: AtomicU64::new(0),
        }
    }

    /// The shared VRAM accounting object.
    pub fn vram(&self) -> &VramTracker {
        &self.vram
    }

    /// The platform's maximum texture dimension in texels.
    pub fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    /// Ids of all textures currently alive on this device.
    pub fn live_textures(&self) -> Vec<TextureId> {
        self.live_textures.lock().unwrap().clone()
    }

    /// The current binding-cache epoch. Descriptor/bind-group caches
    /// compare against this to detect staleness.
    pub fn binding_epoch(&self) -> u64 {
        self.binding_epoch.load(Ordering::Relaxed)
    }

    /// Invalidates cached bindings referencing destroyed resources.
    pub fn invalidate_bindings(&self) {
        self.binding_epoch.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn register(&self, id: TextureId) {
        self.live_textures.lock().unwrap().push(id);
    }

    pub(crate) fn unregister(&self, id: TextureId) {
        self.live_textures.lock().unwrap().retain(|&t| t != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_roundtrip() {
        let device = DeviceShared::new(4096);
        device.register(TextureId(1));
        device.register(TextureId(2));
        assert_eq!(device.live_textures(), vec![TextureId(1), TextureId(2)]);
        device.unregister(TextureId(1));
        assert_eq!(device.live_textures(), vec![TextureId(2)]);
        // Unregistering an unknown id is harmless.
        device.unregister(TextureId(99));
        assert_eq!(device.live_textures(), vec![TextureId(2)]);
    }

    #[test]
    fn binding_epoch_increments() {
        let device = DeviceShared::new(4096);
        let before = device.binding_epoch();
        device.invalidate_bindings();
        assert_eq!(device.binding_epoch(), before + 1);
    }
}
