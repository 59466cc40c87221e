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

//! Texture state enums, flag sets, and the construction descriptor.

use crate::kiln_bitflags;
use crate::renderer::format::TextureFormat;
use crate::resource::vram::VramCategory;

/// An opaque, process-unique handle to a texture resource.
///
/// Ids are allocated from a monotonically increasing counter and are never
/// reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// The dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureKind {
    /// A plain two-dimensional texture.
    #[default]
    D2,
    /// A three-dimensional (volumetric) texture; slices are depth planes.
    D3,
    /// A cubemap; always exactly six slices, one per face.
    Cube,
    /// A two-dimensional texture array; slices are layers.
    D2Array,
}

impl TextureKind {
    /// Whether individual slices of this texture are addressable for
    /// partial upload (cubemap faces and array layers are; a volume's
    /// depth planes travel with their level).
    pub const fn is_layered(&self) -> bool {
        matches!(self, TextureKind::Cube | TextureKind::D2Array)
    }
}

/// Defines the filtering mode for texture sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Point sampling. Returns the value of the nearest texel.
    Nearest,
    /// Linear interpolation over the four nearest texels.
    #[default]
    Linear,
}

/// Defines how texture coordinates outside `[0, 1]` are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Coordinates wrap around. `1.1` becomes `0.1`.
    #[default]
    Repeat,
    /// Coordinates are clamped to the edge. `1.1` becomes `1.0`.
    ClampToEdge,
    /// Coordinates wrap around, mirroring at each integer boundary.
    MirrorRepeat,
}

/// The comparison applied when a texture is sampled with compare-on-read
/// (e.g. shadow-map depth comparison).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if the sample is less than the reference.
    Less,
    /// Passes if the sample equals the reference.
    Equal,
    /// Passes if the sample is less than or equal to the reference.
    LessEqual,
    /// Passes if the sample is greater than the reference.
    Greater,
    /// Passes if the sample differs from the reference.
    NotEqual,
    /// Passes if the sample is greater than or equal to the reference.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// The logical single-writer guard on a texture's CPU-side buffers.
///
/// This is not a thread lock: it exists to prevent a caller from
/// re-entering `lock` on a buffer it has not released, and to gate whether
/// `unlock` schedules an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// The caller only reads the buffer; unlock does not schedule an upload.
    Read,
    /// The caller writes the buffer; unlock schedules an upload.
    Write,
}

kiln_bitflags! {
    /// Pending upload requests, consumed and cleared by the backend's next
    /// upload pass. These are requests only; what was actually transferred
    /// is reported separately by the pass's completeness record.
    pub struct PendingOps: u32 {
        /// Every required (level, slice) region must be re-uploaded.
        const UPLOAD = 1 << 0;
        /// Only the regions in the dirty map must be uploaded.
        const UPLOAD_PARTIAL = 1 << 1;
        /// The mipmap chain beyond level 0 is invalidated.
        const CLEAR_MIPS = 1 << 2;
    }
}

kiln_bitflags! {
    /// Sampler-parameter fields changed since the backend last observed
    /// them. Picked up lazily at bind time, not by an immediate GPU call.
    pub struct ParamFlags: u32 {
        /// Min/mag filter or mipmap enable changed.
        const FILTER = 1 << 0;
        /// An address mode changed.
        const ADDRESS = 1 << 1;
        /// Anisotropy changed.
        const ANISOTROPY = 1 << 2;
        /// Compare-on-read state changed.
        const COMPARE = 1 << 3;
    }
}

/// Initial pixel data for one mip level, as supplied at construction.
#[derive(Debug, Clone)]
pub enum LevelData {
    /// A single buffer covering the whole level (2D and volume textures).
    Whole(Vec<u8>),
    /// One buffer per slice (cubemap faces or array layers), indexed by
    /// slice.
    PerSlice(Vec<Vec<u8>>),
}

/// The construction descriptor for a [`Texture`](crate::resource::Texture).
#[derive(Debug, Clone)]
pub struct TextureOptions {
    /// A diagnostic name; not required to be unique.
    pub name: String,
    /// The texel format.
    pub format: TextureFormat,
    /// Level-0 width in texels.
    pub width: u32,
    /// Level-0 height in texels.
    pub height: u32,
    /// Slice count: array layers, cubemap faces (must be 6), or volume
    /// depth. Ignored (forced to 1) for plain 2D textures.
    pub slices: u32,
    /// The dimensionality of the texture.
    pub kind: TextureKind,
    /// Whether a full mipmap chain is maintained.
    pub mipmaps: bool,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Maximum anisotropy; 1 disables anisotropic filtering.
    pub anisotropy: u32,
    /// Address mode along U.
    pub address_u: AddressMode,
    /// Address mode along V.
    pub address_v: AddressMode,
    /// Address mode along W; meaningful only for volume textures.
    pub address_w: AddressMode,
    /// Compare-on-read function, if sampling as a comparison sampler.
    pub compare: Option<CompareFunction>,
    /// Whether the texture is writable from compute shaders.
    pub storage: bool,
    /// Whether image-like sources are flipped vertically on upload.
    pub flip_y: bool,
    /// Whether image-like sources have alpha premultiplied on upload.
    pub premultiply_alpha: bool,
    /// The VRAM accounting category this texture's bytes are attributed to.
    pub category: VramCategory,
    /// Initial pixel data, level 0 upward. Supplying any schedules a full
    /// upload immediately.
    pub initial_levels: Vec<LevelData>,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            format: TextureFormat::Rgba8Unorm,
            width: 1,
            height: 1,
            slices: 1,
            kind: TextureKind::D2,
            mipmaps: false,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            anisotropy: 1,
            address_u: AddressMode::Repeat,
            address_v: AddressMode::Repeat,
            address_w: AddressMode::Repeat,
            compare: None,
            storage: false,
            flip_y: false,
            premultiply_alpha: false,
            category: VramCategory::Asset,
            initial_levels: Vec::new(),
        }
    }
}
