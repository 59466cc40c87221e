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

//! End-to-end texture lifecycle tests against a recording backend.
//!
//! The recording backend implements the full `TextureBackend` contract
//! without a GPU: it executes the shared upload planner, remembers every
//! region it would have transferred, and commits footprints through the
//! same path a real device backend uses.

use kiln_core::renderer::error::TextureError;
use kiln_core::renderer::texture::{LockMode, TextureKind, TextureOptions};
use kiln_core::renderer::TextureBackend;
use kiln_core::resource::{plan_upload, DeviceShared, SourceImage, Texture, UploadRegion};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// What one upload pass transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RecordedPass {
    full: bool,
    regions: Vec<UploadRegion>,
    regenerated: Vec<u32>,
}

/// Shared log of backend activity, inspected by the tests after the
/// texture has consumed the backend.
#[derive(Debug, Default)]
struct BackendLog {
    passes: Mutex<Vec<RecordedPass>>,
    initializations: AtomicU64,
    losses: AtomicU64,
    destructions: AtomicU64,
}

impl BackendLog {
    fn passes(&self) -> Vec<RecordedPass> {
        self.passes.lock().unwrap().clone()
    }
}

#[derive(Debug)]
struct RecordingBackend {
    log: Arc<BackendLog>,
    alive: bool,
}

impl RecordingBackend {
    fn new(log: Arc<BackendLog>) -> Box<Self> {
        Box::new(Self { log, alive: false })
    }
}

impl TextureBackend for RecordingBackend {
    fn initialize(&mut self, _texture: &Texture) -> Result<(), TextureError> {
        self.log.initializations.fetch_add(1, Ordering::Relaxed);
        self.alive = true;
        Ok(())
    }

    fn upload(&mut self, texture: &mut Texture) -> Result<(), TextureError> {
        if !self.alive {
            return Err(TextureError::BackendError(
                "upload on uninitialized backend".into(),
            ));
        }
        let plan = plan_upload(texture);
        if plan.is_empty() {
            texture.commit_upload(texture.compute_gpu_size());
            return Ok(());
        }
        self.log.passes.lock().unwrap().push(RecordedPass {
            full: plan.full,
            regions: plan.regions,
            regenerated: plan.regenerate_slices,
        });
        texture.commit_upload(texture.compute_gpu_size());
        Ok(())
    }

    fn lose_context(&mut self, texture: &mut Texture) {
        self.log.losses.fetch_add(1, Ordering::Relaxed);
        self.alive = false;
        texture.mark_all_dirty();
    }

    fn destroy(&mut self) {
        self.log.destructions.fetch_add(1, Ordering::Relaxed);
        self.alive = false;
    }
}

fn device() -> Arc<DeviceShared> {
    Arc::new(DeviceShared::new(4096))
}

fn attach(texture: &mut Texture) -> Arc<BackendLog> {
    let log = Arc::new(BackendLog::default());
    texture
        .attach_backend(RecordingBackend::new(log.clone()))
        .unwrap();
    log
}

#[test]
fn gradient_upload_accounts_gpu_size() {
    let dev = device();
    let mut tex = Texture::new(
        dev.clone(),
        TextureOptions {
            name: "gradient".into(),
            width: 8,
            height: 8,
            ..Default::default()
        },
    )
    .unwrap();
    let log = attach(&mut tex);

    {
        let buf = tex.lock(0, 0, LockMode::Write).unwrap();
        for (i, px) in buf.chunks_exact_mut(4).enumerate() {
            let v = (i * 255 / 63) as u8;
            px.copy_from_slice(&[v, v, v, 255]);
        }
    }
    tex.unlock(true).unwrap();

    // 8x8 RGBA8 = 256 bytes attributed once the upload commits.
    assert_eq!(tex.gpu_size(), 256);
    assert_eq!(dev.vram().total_bytes(), 256);
    assert!(tex.pending_ops().is_empty());
    assert!(tex.dirty_levels().is_empty());

    let passes = log.passes();
    assert_eq!(passes.len(), 1);
    assert!(!passes[0].full);
    assert_eq!(passes[0].regions, vec![UploadRegion { level: 0, slice: 0 }]);
}

#[test]
fn array_slice_lock_uploads_only_that_region() {
    let dev = device();
    let mut tex = Texture::new(
        dev,
        TextureOptions {
            name: "decal-array".into(),
            width: 16,
            height: 16,
            slices: 4,
            kind: TextureKind::D2Array,
            ..Default::default()
        },
    )
    .unwrap();
    let log = attach(&mut tex);

    tex.lock(0, 2, LockMode::Write).unwrap();
    tex.unlock(true).unwrap();

    let passes = log.passes();
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].regions, vec![UploadRegion { level: 0, slice: 2 }]);
}

#[test]
fn read_lock_does_not_upload_immediately() {
    let dev = device();
    let mut tex = Texture::new(
        dev,
        TextureOptions {
            name: "readback".into(),
            width: 8,
            height: 8,
            ..Default::default()
        },
    )
    .unwrap();
    let log = attach(&mut tex);

    tex.lock(0, 0, LockMode::Read).unwrap();
    tex.unlock(true).unwrap();
    assert!(log.passes().is_empty());

    // The dirty state persists and is picked up by the next explicit flush.
    tex.flush_pending().unwrap();
    assert_eq!(log.passes().len(), 1);
}

#[test]
fn set_source_replaces_content_and_regenerates_mips() {
    let dev = device();
    let mut tex = Texture::new(
        dev.clone(),
        TextureOptions {
            name: "albedo".into(),
            width: 4,
            height: 4,
            mipmaps: true,
            ..Default::default()
        },
    )
    .unwrap();
    let log = attach(&mut tex);

    let frame = SourceImage::solid_rgba8(16, 16, [200, 100, 50, 255]);
    tex.set_source(&[frame], true).unwrap();

    assert_eq!((tex.width(), tex.height()), (16, 16));
    // 16x16 mip chain: 1024 + 256 + 64 + 16 + 4 bytes.
    assert_eq!(tex.gpu_size(), 1364);
    assert_eq!(dev.vram().total_bytes(), 1364);

    let passes = log.passes();
    assert_eq!(passes.len(), 1);
    assert!(passes[0].full);
    assert_eq!(passes[0].regenerated, vec![0]);
}

#[test]
fn invalid_source_falls_back_to_placeholder() {
    let dev = device();
    let mut tex = Texture::new(
        dev.clone(),
        TextureOptions {
            name: "video".into(),
            width: 8,
            height: 8,
            ..Default::default()
        },
    )
    .unwrap();
    attach(&mut tex);

    // Buffer too short for the claimed dimensions.
    let bad = SourceImage::new(8, 8, vec![0u8; 7]);
    tex.set_source(&[bad], true).unwrap();

    assert!(tex.invalid());
    assert_eq!((tex.width(), tex.height()), (4, 4));
    assert_eq!(tex.gpu_size(), 4 * 4 * 4);
    assert_eq!(dev.vram().total_bytes(), 64);

    // Recovery with a valid source on the same texture.
    let good = SourceImage::solid_rgba8(8, 8, [1, 2, 3, 255]);
    tex.set_source(&[good], true).unwrap();
    assert!(!tex.invalid());
    assert_eq!(tex.gpu_size(), 256);
}

#[test]
fn lose_context_redirties_and_reupload_restores() {
    let dev = device();
    let mut tex = Texture::new(
        dev.clone(),
        TextureOptions {
            name: "persistent".into(),
            width: 8,
            height: 8,
            ..Default::default()
        },
    )
    .unwrap();
    let log = attach(&mut tex);

    tex.lock(0, 0, LockMode::Write).unwrap();
    tex.unlock(true).unwrap();
    assert_eq!(log.passes().len(), 1);

    tex.lose_context();
    assert_eq!(log.losses.load(Ordering::Relaxed), 1);
    assert!(!tex.dirty_levels().is_empty());

    // CPU-side levels survived the loss; a fresh backend plus a full
    // upload restores the content.
    tex.attach_backend(RecordingBackend::new(log.clone())).unwrap();
    assert_eq!(log.initializations.load(Ordering::Relaxed), 2);
    tex.flush_pending().unwrap();

    let passes = log.passes();
    assert_eq!(passes.len(), 2);
    assert!(passes[1].full);
    assert_eq!(passes[1].regions, vec![UploadRegion { level: 0, slice: 0 }]);
}

#[test]
fn resize_reinitializes_the_backend() {
    let dev = device();
    let mut tex = Texture::new(
        dev.clone(),
        TextureOptions {
            name: "target".into(),
            width: 8,
            height: 8,
            ..Default::default()
        },
    )
    .unwrap();
    let log = attach(&mut tex);
    tex.commit_upload(tex.compute_gpu_size());
    assert_eq!(dev.vram().total_bytes(), 256);

    tex.resize(32, 32, 1).unwrap();
    assert_eq!(log.destructions.load(Ordering::Relaxed), 1);
    assert_eq!(log.initializations.load(Ordering::Relaxed), 2);
    assert_eq!(dev.vram().total_bytes(), 32 * 32 * 4);
}

#[test]
fn destroy_releases_vram_exactly_once() {
    let dev = device();
    let mut tex = Texture::new(
        dev.clone(),
        TextureOptions {
            name: "doomed".into(),
            width: 8,
            height: 8,
            ..Default::default()
        },
    )
    .unwrap();
    let log = attach(&mut tex);
    tex.commit_upload(tex.compute_gpu_size());
    let epoch = tex.device().binding_epoch();

    tex.destroy();
    assert_eq!(dev.vram().total_bytes(), 0);
    assert_eq!(log.destructions.load(Ordering::Relaxed), 1);
    assert_eq!(dev.binding_epoch(), epoch + 1);
    assert!(dev.live_textures().is_empty());

    // A second destroy (and the drop that follows) must not double-release.
    tex.destroy();
    assert_eq!(dev.vram().total_bytes(), 0);
    assert_eq!(log.destructions.load(Ordering::Relaxed), 1);

    assert!(matches!(
        tex.upload(false),
        Err(TextureError::Destroyed { .. })
    ));
}

#[test]
fn mipmap_toggle_reuploads_level_zero() {
    let dev = device();
    let mut tex = Texture::new(
        dev.clone(),
        TextureOptions {
            name: "toggled".into(),
            width: 8,
            height: 8,
            ..Default::default()
        },
    )
    .unwrap();
    let log = attach(&mut tex);

    tex.lock(0, 0, LockMode::Write).unwrap();
    tex.unlock(true).unwrap();
    assert_eq!(tex.gpu_size(), 256);

    // Enabling mipmaps forces the backend to reallocate its native
    // resource; level 0 must be written into the fresh resource before
    // the chain is regenerated from it.
    tex.set_mipmaps(true);
    tex.flush_pending().unwrap();

    let passes = log.passes();
    assert_eq!(passes.len(), 2);
    assert!(passes[1].full);
    assert!(passes[1]
        .regions
        .contains(&UploadRegion { level: 0, slice: 0 }));
    assert_eq!(passes[1].regenerated, vec![0]);
    // 8x8 full chain: 256 + 64 + 16 + 4 bytes.
    assert_eq!(tex.gpu_size(), 340);
    assert_eq!(dev.vram().total_bytes(), 340);
}

#[test]
fn deferred_uploads_batch_into_one_pass() {
    let dev = device();
    let mut tex = Texture::new(
        dev,
        TextureOptions {
            name: "batched".into(),
            width: 8,
            height: 8,
            slices: 2,
            kind: TextureKind::D2Array,
            ..Default::default()
        },
    )
    .unwrap();
    let log = attach(&mut tex);

    tex.lock(0, 0, LockMode::Write).unwrap();
    tex.unlock(false).unwrap();
    tex.lock(0, 1, LockMode::Write).unwrap();
    tex.unlock(false).unwrap();
    assert!(log.passes().is_empty());

    tex.flush_pending().unwrap();
    let passes = log.passes();
    assert_eq!(passes.len(), 1);
    assert_eq!(
        passes[0].regions,
        vec![
            UploadRegion { level: 0, slice: 0 },
            UploadRegion { level: 0, slice: 1 },
        ]
    );
}
