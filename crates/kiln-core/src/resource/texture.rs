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

//! The device-independent texture resource front end.
//!
//! A [`Texture`] owns its CPU-side pixel data per (mip level, slice),
//! tracks which regions are dirty, and schedules uploads. The actual GPU
//! transfer is delegated to a [`TextureBackend`] the texture owns; the
//! backend reads the dirty map, performs the minimal transfer, and commits
//! the result back through [`Texture::commit_upload`].
//!
//! All mutation happens on the thread owning the graphics context. The
//! READ/WRITE lock is a logical single-writer guard, not a thread lock.

use crate::math::Extent2D;
use crate::renderer::error::TextureError;
use crate::renderer::format::TextureFormat;
use crate::renderer::texture::{
    AddressMode, CompareFunction, FilterMode, LevelData, LockMode, ParamFlags, PendingOps,
    TextureId, TextureKind, TextureOptions,
};
use crate::renderer::traits::TextureBackend;
use crate::resource::device::DeviceShared;
use crate::resource::source::{is_valid_source, ImageSource};
use crate::resource::vram::VramCategory;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Side length of the placeholder a texture reverts to when a source
/// fails validation.
pub const PLACEHOLDER_DIM: u32 = 4;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

fn next_texture_id() -> TextureId {
    TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
}

/// A GPU texture resource: CPU-side pixel ownership, dirty tracking, and
/// upload scheduling.
///
/// Created with explicit dimensions and format (or from initial pixel
/// levels), mutated via `lock`/`unlock`, `set_source`, or property
/// setters, and destroyed explicitly (or on drop). Destruction releases
/// the backend resource, returns the VRAM footprint, and is idempotent.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    name: String,
    device: Arc<DeviceShared>,

    format: TextureFormat,
    kind: TextureKind,
    width: u32,
    height: u32,
    slices: u32,

    mipmaps: bool,
    min_filter: FilterMode,
    mag_filter: FilterMode,
    anisotropy: u32,
    address_u: AddressMode,
    address_v: AddressMode,
    address_w: AddressMode,
    compare: Option<CompareFunction>,

    storage: bool,
    flip_y: bool,
    premultiply_alpha: bool,
    category: VramCategory,

    /// CPU-side pixel data: level -> slice -> buffer. Non-layered textures
    /// keep the whole level (including volume depth) under slice 0.
    levels: BTreeMap<u32, BTreeMap<u32, Vec<u8>>>,
    /// Dirty regions: level -> set of dirty slices. Non-layered textures
    /// use the singleton slice {0}.
    dirty: BTreeMap<u32, BTreeSet<u32>>,

    pending: PendingOps,
    dirty_params: ParamFlags,
    lock: Option<LockMode>,
    invalid: bool,
    render_version: u64,
    gpu_size: u64,
    destroyed: bool,

    backend: Option<Box<dyn TextureBackend>>,
}

impl Texture {
    /// Creates a texture from a construction descriptor.
    ///
    /// Integer pixel formats force nearest filtering and disable mipmaps
    /// regardless of the requested options. Cubemaps must be constructed
    /// with exactly six slices. Supplying initial levels schedules a full
    /// upload.
    pub fn new(device: Arc<DeviceShared>, options: TextureOptions) -> Result<Self, TextureError> {
        if options.width == 0 || options.height == 0 {
            return Err(TextureError::InvalidDimensions {
                width: options.width,
                height: options.height,
            });
        }
        let slices = match options.kind {
            TextureKind::D2 => 1,
            TextureKind::Cube => {
                if options.slices != 6 {
                    return Err(TextureError::InvalidCubemapSlices {
                        slices: options.slices,
                    });
                }
                6
            }
            TextureKind::D3 | TextureKind::D2Array => options.slices.max(1),
        };

        let mut mipmaps = options.mipmaps;
        let mut min_filter = options.min_filter;
        let mut mag_filter = options.mag_filter;
        if options.format.is_integer() {
            if mipmaps || min_filter == FilterMode::Linear || mag_filter == FilterMode::Linear {
                log::debug!(
                    "Texture '{}': integer format {:?} forces nearest filtering without mipmaps",
                    options.name,
                    options.format
                );
            }
            mipmaps = false;
            min_filter = FilterMode::Nearest;
            mag_filter = FilterMode::Nearest;
        }

        let mut texture = Self {
            id: next_texture_id(),
            name: options.name,
            device,
            format: options.format,
            kind: options.kind,
            width: options.width,
            height: options.height,
            slices,
            mipmaps,
            min_filter,
            mag_filter,
            anisotropy: options.anisotropy.max(1),
            address_u: options.address_u,
            address_v: options.address_v,
            address_w: options.address_w,
            compare: options.compare,
            storage: options.storage,
            flip_y: options.flip_y,
            premultiply_alpha: options.premultiply_alpha,
            category: options.category,
            levels: BTreeMap::new(),
            dirty: BTreeMap::new(),
            pending: PendingOps::EMPTY,
            dirty_params: ParamFlags::EMPTY,
            lock: None,
            invalid: false,
            render_version: 0,
            gpu_size: 0,
            destroyed: false,
            backend: None,
        };

        if !options.initial_levels.is_empty() {
            texture.ingest_levels(options.initial_levels)?;
            texture.pending.insert(PendingOps::UPLOAD);
        }

        texture.device.register(texture.id);
        log::debug!(
            "Texture {:?} '{}' created: {:?} {}x{}x{} {:?}",
            texture.id,
            texture.name,
            texture.kind,
            texture.width,
            texture.height,
            texture.slices,
            texture.format
        );
        Ok(texture)
    }

    fn ingest_levels(&mut self, initial: Vec<LevelData>) -> Result<(), TextureError> {
        for (level, data) in initial.into_iter().enumerate() {
            let level = level as u32;
            let mut slices = BTreeMap::new();
            match (data, self.kind.is_layered()) {
                (LevelData::Whole(buf), false) => {
                    slices.insert(0, buf);
                }
                (LevelData::PerSlice(bufs), true) => {
                    if bufs.len() as u32 != self.slices {
                        return Err(TextureError::InvalidLevelData { level });
                    }
                    for (slice, buf) in bufs.into_iter().enumerate() {
                        slices.insert(slice as u32, buf);
                    }
                }
                _ => return Err(TextureError::InvalidLevelData { level }),
            }
            let dirty: BTreeSet<u32> = slices.keys().copied().collect();
            self.levels.insert(level, slices);
            self.dirty.insert(level, dirty);
        }
        Ok(())
    }

    // --- Identity and shape accessors ---

    /// The process-unique id.
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// The diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The texel format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// The dimensionality.
    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    /// Level-0 width in texels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Level-0 height in texels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The slice count: array layers, cubemap faces, or volume depth.
    pub fn slices(&self) -> u32 {
        self.slices
    }

    /// The level-0 extent.
    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }

    /// The owning device's shared record.
    pub fn device(&self) -> &Arc<DeviceShared> {
        &self.device
    }

    /// The VRAM category this texture's bytes are attributed to.
    pub fn category(&self) -> VramCategory {
        self.category
    }

    /// Whether a full mipmap chain is maintained.
    pub fn mipmaps(&self) -> bool {
        self.mipmaps
    }

    /// The number of mip levels the complete resource holds: 1 without
    /// mipmaps, otherwise `floor(log2(max(width, height))) + 1`.
    pub fn required_mip_levels(&self) -> u32 {
        if !self.mipmaps {
            1
        } else {
            32 - self.extent().max_dimension().leading_zeros()
        }
    }

    /// Whether the last source assignment failed validation. An invalid
    /// texture renders as a 4x4 placeholder.
    pub fn invalid(&self) -> bool {
        self.invalid
    }

    /// The outstanding lock, if any.
    pub fn lock_state(&self) -> Option<LockMode> {
        self.lock
    }

    /// Whether this texture is writable from compute shaders.
    pub fn storage(&self) -> bool {
        self.storage
    }

    /// Whether image-like sources are flipped vertically on upload.
    pub fn flip_y(&self) -> bool {
        self.flip_y
    }

    /// Whether image-like sources get alpha premultiplied on upload.
    pub fn premultiply_alpha(&self) -> bool {
        self.premultiply_alpha
    }

    /// Monotonic counter bumped by every observable state change;
    /// bind-group and descriptor caches compare against it.
    pub fn render_version(&self) -> u64 {
        self.render_version
    }

    /// The GPU byte footprint last committed by the backend.
    pub fn gpu_size(&self) -> u64 {
        self.gpu_size
    }

    // --- Sampling state accessors ---

    /// Minification filter.
    pub fn min_filter(&self) -> FilterMode {
        self.min_filter
    }

    /// Magnification filter.
    pub fn mag_filter(&self) -> FilterMode {
        self.mag_filter
    }

    /// Maximum anisotropy.
    pub fn anisotropy(&self) -> u32 {
        self.anisotropy
    }

    /// Address mode along U.
    pub fn address_u(&self) -> AddressMode {
        self.address_u
    }

    /// Address mode along V.
    pub fn address_v(&self) -> AddressMode {
        self.address_v
    }

    /// Address mode along W (volume textures only).
    pub fn address_w(&self) -> AddressMode {
        self.address_w
    }

    /// Compare-on-read function, if any.
    pub fn compare(&self) -> Option<CompareFunction> {
        self.compare
    }

    // --- Dirty state accessors (read by the planner and backends) ---

    /// The pending upload request set.
    pub fn pending_ops(&self) -> PendingOps {
        self.pending
    }

    /// The dirty map: level -> set of dirty slices.
    pub fn dirty_levels(&self) -> &BTreeMap<u32, BTreeSet<u32>> {
        &self.dirty
    }

    /// The CPU-side buffer for one (level, slice), if present.
    ///
    /// Backends read committed buffers through this; a buffer handed out
    /// by `lock` is the same storage, so it must not be read by a backend
    /// until the lock is released.
    pub fn level_data(&self, level: u32, slice: u32) -> Option<&[u8]> {
        self.levels
            .get(&level)
            .and_then(|slices| slices.get(&slice))
            .map(|buf| buf.as_slice())
    }

    /// Whether CPU-side data exists for one (level, slice).
    pub fn has_level_data(&self, level: u32, slice: u32) -> bool {
        self.level_data(level, slice).is_some()
    }

    /// The slice granularity of the dirty map: per-slice for layered
    /// textures, the singleton slice 0 otherwise.
    pub fn dirty_slice_count(&self) -> u32 {
        if self.kind.is_layered() {
            self.slices
        } else {
            1
        }
    }

    /// Returns and clears the sampler-parameter dirty flags. Called by the
    /// backend when it rebuilds its sampler state.
    pub fn take_param_flags(&mut self) -> ParamFlags {
        let flags = self.dirty_params;
        self.dirty_params.clear();
        flags
    }

    // --- Backend attachment ---

    /// Attaches (and initializes) the device backend. The native resource
    /// is allocated here and the current footprint attributed to the
    /// shared VRAM tracker.
    pub fn attach_backend(
        &mut self,
        mut backend: Box<dyn TextureBackend>,
    ) -> Result<(), TextureError> {
        backend.initialize(self)?;
        self.backend = Some(backend);
        let new_size = self.compute_gpu_size();
        self.device
            .vram()
            .reassign(self.category, self.gpu_size, new_size);
        self.gpu_size = new_size;
        Ok(())
    }

    /// Whether a backend is attached.
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    // --- Lock / unlock ---

    /// Locks one (level, slice) for CPU access and returns its buffer.
    ///
    /// The backing storage is allocated lazily, sized by the format's
    /// block layout and the mip-scaled dimensions. The region is flagged
    /// dirty and a partial upload is requested. The returned buffer must
    /// not be retained past `unlock`.
    pub fn lock(
        &mut self,
        level: u32,
        slice: u32,
        mode: LockMode,
    ) -> Result<&mut [u8], TextureError> {
        if self.destroyed {
            return Err(TextureError::Destroyed { id: self.id });
        }
        if self.lock.is_some() {
            log::error!("Texture {:?} '{}': lock while already locked", self.id, self.name);
            return Err(TextureError::AlreadyLocked { id: self.id });
        }
        if self.kind.is_layered() {
            if slice >= self.slices {
                return Err(TextureError::SliceOutOfRange {
                    slice,
                    slices: self.slices,
                });
            }
        } else if slice != 0 {
            return Err(TextureError::NotLayered { slice });
        }
        let levels = self.required_mip_levels();
        if level >= levels {
            return Err(TextureError::MipLevelOutOfRange { level, levels });
        }

        self.dirty.entry(level).or_default().insert(slice);
        self.pending.insert(PendingOps::UPLOAD_PARTIAL);
        self.lock = Some(mode);

        let byte_size = self.level_slice_byte_size(level) as usize;
        let buffer = self
            .levels
            .entry(level)
            .or_default()
            .entry(slice)
            .or_insert_with(|| vec![0u8; byte_size]);
        // A resize between uploads can leave a stale allocation behind.
        if buffer.len() != byte_size {
            buffer.resize(byte_size, 0);
        }
        Ok(buffer)
    }

    /// Releases the outstanding lock. A WRITE lock triggers an upload,
    /// immediately or deferred to the device's next flush. Unlocking
    /// without a lock is a diagnostic warning, not an error.
    pub fn unlock(&mut self, immediate: bool) -> Result<(), TextureError> {
        let Some(mode) = self.lock.take() else {
            log::warn!("Texture {:?} '{}': unlock without lock", self.id, self.name);
            return Ok(());
        };
        if mode == LockMode::Write && immediate {
            self.flush_pending()?;
        }
        Ok(())
    }

    // --- Source assignment ---

    /// Replaces level 0 with the given image-like source(s) and discards
    /// every other mip level.
    ///
    /// Layered textures require one source per slice, all with identical
    /// dimensions. Validation failure is recoverable: the texture becomes
    /// invalid and reverts to a 4x4 placeholder rather than failing the
    /// caller. Valid assignments always re-upload, so repeated calls with
    /// a live video frame behave as expected.
    pub fn set_source<S: ImageSource>(
        &mut self,
        sources: &[S],
        immediate: bool,
    ) -> Result<(), TextureError> {
        if self.destroyed {
            return Err(TextureError::Destroyed { id: self.id });
        }
        let expected = if self.kind.is_layered() { self.slices } else { 1 };
        let valid = sources.len() as u32 == expected
            && sources.iter().all(|s| is_valid_source(s, self.format))
            && sources
                .windows(2)
                .all(|w| w[0].width() == w[1].width() && w[0].height() == w[1].height());

        if !valid {
            log::warn!(
                "Texture {:?} '{}': source validation failed ({} source(s), expected {}); \
                 reverting to {}x{} placeholder",
                self.id,
                self.name,
                sources.len(),
                expected,
                PLACEHOLDER_DIM,
                PLACEHOLDER_DIM
            );
            self.invalid = true;
            self.width = PLACEHOLDER_DIM;
            self.height = PLACEHOLDER_DIM;
            self.levels.clear();
            self.dirty.clear();
        } else {
            self.invalid = false;
            self.width = sources[0].width();
            self.height = sources[0].height();
            // Source assignment always invalidates the mip chain.
            self.levels.clear();
            self.dirty.clear();
            let mut level0 = BTreeMap::new();
            let mut dirty0 = BTreeSet::new();
            for (slice, source) in sources.iter().enumerate() {
                level0.insert(slice as u32, source.pixels().to_vec());
                dirty0.insert(slice as u32);
            }
            self.levels.insert(0, level0);
            self.dirty.insert(0, dirty0);
        }

        self.pending.insert(PendingOps::UPLOAD | PendingOps::CLEAR_MIPS);
        self.render_version += 1;
        if immediate {
            self.flush_pending()?;
        }
        Ok(())
    }

    // --- Upload ---

    /// Requests a full re-upload, performed now or at the device's next
    /// flush.
    pub fn upload(&mut self, immediate: bool) -> Result<(), TextureError> {
        if self.destroyed {
            return Err(TextureError::Destroyed { id: self.id });
        }
        self.pending.insert(PendingOps::UPLOAD);
        if immediate {
            self.flush_pending()?;
        }
        Ok(())
    }

    /// Executes the backend upload pass for whatever is pending. A no-op
    /// when nothing is pending or no backend is attached.
    pub fn flush_pending(&mut self) -> Result<(), TextureError> {
        if self.destroyed || (self.pending.is_empty() && self.dirty.is_empty()) {
            return Ok(());
        }
        let Some(mut backend) = self.backend.take() else {
            return Ok(());
        };
        let result = backend.upload(self);
        self.backend = Some(backend);
        result
    }

    /// Commits the result of an upload pass: replaces the attributed VRAM
    /// footprint (decrement and increment paired in one call) and clears
    /// the pending set and dirty map.
    pub fn commit_upload(&mut self, new_gpu_size: u64) {
        self.device
            .vram()
            .reassign(self.category, self.gpu_size, new_gpu_size);
        self.gpu_size = new_gpu_size;
        self.pending.clear();
        self.dirty.clear();
    }

    /// Marks every required (level, slice) dirty and requests a full
    /// upload. Used after a resize or a context loss.
    pub fn mark_all_dirty(&mut self) {
        let slice_count = self.dirty_slice_count();
        for level in 0..self.required_mip_levels() {
            let slices: BTreeSet<u32> = (0..slice_count).collect();
            self.dirty.insert(level, slices);
        }
        self.pending.insert(PendingOps::UPLOAD);
    }

    /// The expected GPU byte footprint of the complete resource at its
    /// current shape (all required mip levels, all slices).
    pub fn compute_gpu_size(&self) -> u64 {
        let ext = self.extent();
        let mut total = 0u64;
        for level in 0..self.required_mip_levels() {
            let per_slice = self.format.level_byte_size(ext, level);
            total += per_slice * self.storage_slices(level) as u64;
        }
        total
    }

    /// The byte size of one lockable (level, slice) buffer: for volume
    /// textures this covers every depth plane of the level.
    pub fn level_slice_byte_size(&self, level: u32) -> u64 {
        let per_slice = self.format.level_byte_size(self.extent(), level);
        match self.kind {
            TextureKind::D3 => per_slice * (self.slices >> level).max(1) as u64,
            _ => per_slice,
        }
    }

    fn storage_slices(&self, level: u32) -> u32 {
        match self.kind {
            TextureKind::D2 => 1,
            TextureKind::D3 => (self.slices >> level).max(1),
            TextureKind::Cube | TextureKind::D2Array => self.slices,
        }
    }

    // --- Resize / destroy ---

    /// Recreates the backend resource at new dimensions.
    ///
    /// Content is not preserved: the native resource is destroyed and
    /// reallocated and everything is marked dirty again. Intended for
    /// render-target use.
    pub fn resize(&mut self, width: u32, height: u32, slices: u32) -> Result<(), TextureError> {
        if self.destroyed {
            return Err(TextureError::Destroyed { id: self.id });
        }
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidDimensions { width, height });
        }
        if self.kind == TextureKind::Cube && slices != 6 {
            return Err(TextureError::InvalidCubemapSlices { slices });
        }
        self.width = width;
        self.height = height;
        self.slices = match self.kind {
            TextureKind::D2 => 1,
            _ => slices.max(1),
        };
        self.mark_all_dirty();

        if let Some(mut backend) = self.backend.take() {
            backend.destroy();
            backend.initialize(self)?;
            self.backend = Some(backend);
        }

        let new_size = self.compute_gpu_size();
        self.device
            .vram()
            .reassign(self.category, self.gpu_size, new_size);
        self.gpu_size = new_size;
        self.render_version += 1;
        Ok(())
    }

    /// Releases the backend resource and CPU buffers and returns the VRAM
    /// footprint to the shared tracker. Safe to call more than once; only
    /// the first call has any effect on accounting.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(mut backend) = self.backend.take() {
            backend.destroy();
        }
        self.device.vram().reassign(self.category, self.gpu_size, 0);
        self.gpu_size = 0;
        self.levels.clear();
        self.dirty.clear();
        self.pending.clear();
        self.lock = None;
        self.device.unregister(self.id);
        self.device.invalidate_bindings();
        log::debug!("Texture {:?} '{}' destroyed", self.id, self.name);
    }

    /// Signals a context-loss event: the backend handle is released and
    /// the texture fully re-dirtied, so the next `initialize` + `upload`
    /// restores GPU content from the untouched CPU-side levels.
    pub fn lose_context(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(mut backend) = self.backend.take() {
            backend.lose_context(self);
            self.backend = Some(backend);
        } else {
            self.mark_all_dirty();
        }
    }

    // --- Property setters ---
    //
    // Uniform pattern: no-op when the value is unchanged; otherwise update
    // state, record a parameter dirty flag for the backend's lazy pickup,
    // and bump the render version.

    /// Sets the minification filter. Rejected with a diagnostic for
    /// integer formats, which only support nearest sampling.
    pub fn set_min_filter(&mut self, filter: FilterMode) {
        if filter == FilterMode::Linear && self.format.is_integer() {
            log::warn!(
                "Texture {:?} '{}': linear filtering unsupported on integer format {:?}",
                self.id,
                self.name,
                self.format
            );
            return;
        }
        if self.min_filter != filter {
            self.min_filter = filter;
            self.touch_params(ParamFlags::FILTER);
        }
    }

    /// Sets the magnification filter. Rejected with a diagnostic for
    /// integer formats.
    pub fn set_mag_filter(&mut self, filter: FilterMode) {
        if filter == FilterMode::Linear && self.format.is_integer() {
            log::warn!(
                "Texture {:?} '{}': linear filtering unsupported on integer format {:?}",
                self.id,
                self.name,
                self.format
            );
            return;
        }
        if self.mag_filter != filter {
            self.mag_filter = filter;
            self.touch_params(ParamFlags::FILTER);
        }
    }

    /// Enables or disables the mipmap chain. Rejected with a diagnostic
    /// for integer formats. Toggling changes the native chain length, so
    /// the backend reallocates and every level must be rewritten.
    pub fn set_mipmaps(&mut self, mipmaps: bool) {
        if mipmaps && self.format.is_integer() {
            log::warn!(
                "Texture {:?} '{}': mipmaps unsupported on integer format {:?}",
                self.id,
                self.name,
                self.format
            );
            return;
        }
        if self.mipmaps != mipmaps {
            self.mipmaps = mipmaps;
            if mipmaps {
                self.pending.insert(PendingOps::CLEAR_MIPS);
            }
            self.mark_all_dirty();
            self.touch_params(ParamFlags::FILTER);
        }
    }

    /// Sets the address mode along U.
    pub fn set_address_u(&mut self, mode: AddressMode) {
        if self.address_u != mode {
            self.address_u = mode;
            self.touch_params(ParamFlags::ADDRESS);
        }
    }

    /// Sets the address mode along V.
    pub fn set_address_v(&mut self, mode: AddressMode) {
        if self.address_v != mode {
            self.address_v = mode;
            self.touch_params(ParamFlags::ADDRESS);
        }
    }

    /// Sets the address mode along W. Meaningful only for volume
    /// textures; a no-op diagnostic otherwise.
    pub fn set_address_w(&mut self, mode: AddressMode) {
        if self.kind != TextureKind::D3 {
            log::warn!(
                "Texture {:?} '{}': address_w ignored on non-volume texture ({:?})",
                self.id,
                self.name,
                self.kind
            );
            return;
        }
        if self.address_w != mode {
            self.address_w = mode;
            self.touch_params(ParamFlags::ADDRESS);
        }
    }

    /// Sets the maximum anisotropy (clamped to at least 1).
    pub fn set_anisotropy(&mut self, anisotropy: u32) {
        let anisotropy = anisotropy.max(1);
        if self.anisotropy != anisotropy {
            self.anisotropy = anisotropy;
            self.touch_params(ParamFlags::ANISOTROPY);
        }
    }

    /// Sets (or clears) the compare-on-read function.
    pub fn set_compare(&mut self, compare: Option<CompareFunction>) {
        if self.compare != compare {
            self.compare = compare;
            self.touch_params(ParamFlags::COMPARE);
        }
    }

    fn touch_params(&mut self, flags: ParamFlags) {
        self.dirty_params.insert(flags);
        self.render_version += 1;
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::source::SourceImage;

    fn device() -> Arc<DeviceShared> {
        Arc::new(DeviceShared::new(4096))
    }

    fn options(width: u32, height: u32) -> TextureOptions {
        TextureOptions {
            name: "test".into(),
            width,
            height,
            ..Default::default()
        }
    }

    #[test]
    fn ids_are_unique_and_monotonic() {
        let dev = device();
        let a = Texture::new(dev.clone(), options(4, 4)).unwrap();
        let b = Texture::new(dev, options(4, 4)).unwrap();
        assert!(b.id() > a.id());
    }

    #[test]
    fn required_mip_levels_property() {
        let dev = device();
        let flat = Texture::new(dev.clone(), options(256, 16)).unwrap();
        assert_eq!(flat.required_mip_levels(), 1);

        let mut opts = options(256, 16);
        opts.mipmaps = true;
        let mipped = Texture::new(dev.clone(), opts).unwrap();
        // floor(log2(256)) + 1
        assert_eq!(mipped.required_mip_levels(), 9);

        let mut opts = options(1, 1);
        opts.mipmaps = true;
        let tiny = Texture::new(dev, opts).unwrap();
        assert_eq!(tiny.required_mip_levels(), 1);
    }

    #[test]
    fn integer_format_forces_nearest_without_mipmaps() {
        let dev = device();
        let mut opts = options(16, 16);
        opts.format = TextureFormat::Rgba8Uint;
        opts.mipmaps = true;
        opts.min_filter = FilterMode::Linear;
        opts.mag_filter = FilterMode::Linear;
        let mut tex = Texture::new(dev, opts).unwrap();
        assert!(!tex.mipmaps());
        assert_eq!(tex.min_filter(), FilterMode::Nearest);
        assert_eq!(tex.mag_filter(), FilterMode::Nearest);

        // Later attempts are rejected too, with state unchanged.
        let version = tex.render_version();
        tex.set_min_filter(FilterMode::Linear);
        tex.set_mipmaps(true);
        assert!(!tex.mipmaps());
        assert_eq!(tex.min_filter(), FilterMode::Nearest);
        assert_eq!(tex.render_version(), version);
    }

    #[test]
    fn cubemap_requires_six_slices() {
        let dev = device();
        let mut opts = options(16, 16);
        opts.kind = TextureKind::Cube;
        opts.slices = 4;
        assert!(matches!(
            Texture::new(dev.clone(), opts),
            Err(TextureError::InvalidCubemapSlices { slices: 4 })
        ));

        let mut opts = options(16, 16);
        opts.kind = TextureKind::Cube;
        opts.slices = 6;
        let cube = Texture::new(dev, opts).unwrap();
        assert_eq!(cube.slices(), 6);
    }

    #[test]
    fn address_w_is_volume_only() {
        let dev = device();
        let mut tex = Texture::new(dev.clone(), options(8, 8)).unwrap();
        let version = tex.render_version();
        tex.set_address_w(AddressMode::ClampToEdge);
        assert_eq!(tex.address_w(), AddressMode::Repeat);
        assert_eq!(tex.render_version(), version);

        let mut opts = options(8, 8);
        opts.kind = TextureKind::D3;
        opts.slices = 8;
        let mut volume = Texture::new(dev, opts).unwrap();
        volume.set_address_w(AddressMode::ClampToEdge);
        assert_eq!(volume.address_w(), AddressMode::ClampToEdge);
    }

    #[test]
    fn setters_are_no_ops_for_unchanged_values() {
        let dev = device();
        let mut tex = Texture::new(dev, options(8, 8)).unwrap();
        tex.set_anisotropy(4);
        let version = tex.render_version();
        tex.set_anisotropy(4);
        tex.set_address_u(AddressMode::Repeat);
        assert_eq!(tex.render_version(), version);
        tex.set_address_u(AddressMode::MirrorRepeat);
        assert_eq!(tex.render_version(), version + 1);
        assert!(tex.take_param_flags().contains(ParamFlags::ADDRESS));
        assert!(tex.take_param_flags().is_empty());
    }

    #[test]
    fn lock_marks_dirty_and_requests_partial_upload() {
        let dev = device();
        let mut tex = Texture::new(dev, options(8, 8)).unwrap();
        {
            let buf = tex.lock(0, 0, LockMode::Write).unwrap();
            assert_eq!(buf.len(), 8 * 8 * 4);
            buf[0] = 0xff;
        }
        assert!(tex.pending_ops().contains(PendingOps::UPLOAD_PARTIAL));
        assert_eq!(tex.dirty_levels()[&0], BTreeSet::from([0]));
        tex.unlock(false).unwrap();
        assert_eq!(tex.lock_state(), None);
        assert_eq!(tex.level_data(0, 0).unwrap()[0], 0xff);
    }

    #[test]
    fn double_lock_is_rejected() {
        let dev = device();
        let mut tex = Texture::new(dev, options(8, 8)).unwrap();
        tex.lock(0, 0, LockMode::Write).unwrap();
        assert!(matches!(
            tex.lock(0, 0, LockMode::Write),
            Err(TextureError::AlreadyLocked { .. })
        ));
        // The failed lock did not clobber the outstanding one.
        assert_eq!(tex.lock_state(), Some(LockMode::Write));
    }

    #[test]
    fn lock_slice_bounds() {
        let dev = device();
        let mut tex = Texture::new(dev.clone(), options(8, 8)).unwrap();
        assert!(matches!(
            tex.lock(0, 1, LockMode::Write),
            Err(TextureError::NotLayered { slice: 1 })
        ));
        assert!(matches!(
            tex.lock(1, 0, LockMode::Write),
            Err(TextureError::MipLevelOutOfRange { level: 1, levels: 1 })
        ));

        let mut opts = options(8, 8);
        opts.kind = TextureKind::D2Array;
        opts.slices = 4;
        let mut arr = Texture::new(dev, opts).unwrap();
        assert!(matches!(
            arr.lock(0, 4, LockMode::Write),
            Err(TextureError::SliceOutOfRange { slice: 4, slices: 4 })
        ));
    }

    #[test]
    fn unlock_without_lock_warns_only() {
        let dev = device();
        let mut tex = Texture::new(dev, options(8, 8)).unwrap();
        tex.unlock(true).unwrap();
        assert_eq!(tex.lock_state(), None);
    }

    #[test]
    fn set_source_adopts_dimensions_and_discards_mips() {
        let dev = device();
        let mut opts = options(8, 8);
        opts.mipmaps = true;
        let mut tex = Texture::new(dev, opts).unwrap();
        // Seed a fake level-1 buffer so we can observe it being dropped.
        tex.lock(1, 0, LockMode::Write).unwrap();
        tex.unlock(false).unwrap();
        assert!(tex.has_level_data(1, 0));

        let img = SourceImage::solid_rgba8(16, 16, [1, 2, 3, 4]);
        tex.set_source(&[img], false).unwrap();
        assert!(!tex.invalid());
        assert_eq!((tex.width(), tex.height()), (16, 16));
        assert!(tex.has_level_data(0, 0));
        assert!(!tex.has_level_data(1, 0));
        assert!(tex.pending_ops().contains(PendingOps::UPLOAD | PendingOps::CLEAR_MIPS));
    }

    #[test]
    fn set_source_mismatched_sizes_reverts_to_placeholder() {
        let dev = device();
        let mut opts = options(8, 8);
        opts.kind = TextureKind::D2Array;
        opts.slices = 2;
        let mut tex = Texture::new(dev, opts).unwrap();
        let a = SourceImage::solid_rgba8(8, 8, [0; 4]);
        let b = SourceImage::solid_rgba8(4, 4, [0; 4]);
        tex.set_source(&[a, b], false).unwrap();
        assert!(tex.invalid());
        assert_eq!((tex.width(), tex.height()), (PLACEHOLDER_DIM, PLACEHOLDER_DIM));
        assert!(!tex.has_level_data(0, 0));

        // A later valid assignment recovers.
        let a = SourceImage::solid_rgba8(8, 8, [9; 4]);
        let b = SourceImage::solid_rgba8(8, 8, [9; 4]);
        tex.set_source(&[a, b], false).unwrap();
        assert!(!tex.invalid());
        assert_eq!((tex.width(), tex.height()), (8, 8));
    }

    #[test]
    fn gpu_size_for_simple_2d() {
        let dev = device();
        let tex = Texture::new(dev.clone(), options(8, 8)).unwrap();
        assert_eq!(tex.compute_gpu_size(), 8 * 8 * 4);

        let mut opts = options(8, 8);
        opts.mipmaps = true;
        let mipped = Texture::new(dev, opts).unwrap();
        // 256 + 64 + 16 + 4
        assert_eq!(mipped.compute_gpu_size(), 340);
    }

    #[test]
    fn volume_gpu_size_shrinks_depth_per_level() {
        let dev = device();
        let mut opts = options(4, 4);
        opts.kind = TextureKind::D3;
        opts.slices = 4;
        opts.mipmaps = true;
        let vol = Texture::new(dev, opts).unwrap();
        // L0: 4x4x4, L1: 2x2x2, L2: 1x1x1 texels * 4 bytes
        assert_eq!(vol.compute_gpu_size(), (64 + 8 + 1) * 4);
    }

    #[test]
    fn destroy_is_idempotent_on_accounting() {
        let dev = device();
        let mut tex = Texture::new(dev.clone(), options(8, 8)).unwrap();
        tex.commit_upload(tex.compute_gpu_size());
        assert_eq!(dev.vram().total_bytes(), 256);
        tex.destroy();
        assert_eq!(dev.vram().total_bytes(), 0);
        tex.destroy();
        assert_eq!(dev.vram().total_bytes(), 0);
        assert!(dev.live_textures().is_empty());
    }

    #[test]
    fn drop_releases_accounting() {
        let dev = device();
        {
            let mut tex = Texture::new(dev.clone(), options(8, 8)).unwrap();
            tex.commit_upload(tex.compute_gpu_size());
            assert_eq!(dev.vram().total_bytes(), 256);
        }
        assert_eq!(dev.vram().total_bytes(), 0);
    }

    #[test]
    fn initial_levels_schedule_full_upload() {
        let dev = device();
        let mut opts = options(2, 2);
        opts.initial_levels = vec![LevelData::Whole(vec![0u8; 16])];
        let tex = Texture::new(dev.clone(), opts).unwrap();
        assert!(tex.pending_ops().contains(PendingOps::UPLOAD));
        assert!(tex.has_level_data(0, 0));

        let mut opts = options(2, 2);
        opts.kind = TextureKind::D2Array;
        opts.slices = 2;
        opts.initial_levels = vec![LevelData::PerSlice(vec![vec![0u8; 16]])];
        assert!(matches!(
            Texture::new(dev, opts),
            Err(TextureError::InvalidLevelData { level: 0 })
        ));
    }
}
