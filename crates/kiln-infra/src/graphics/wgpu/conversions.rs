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

//! Conversions between Kiln's device-independent types and wgpu's.

use kiln_core::math::{Extent3D, Origin3D};
use kiln_core::renderer::error::TextureError;
use kiln_core::renderer::format::TextureFormat;
use kiln_core::renderer::texture::{AddressMode, CompareFunction, FilterMode, TextureKind};

/// A local extension trait to convert the engine's types into
/// wgpu-compatible types. This avoids Rust's orphan rules while keeping an
/// idiomatic `.into_wgpu()` syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a wgpu-compatible type.
    fn into_wgpu(self) -> T;
}

impl IntoWgpu<wgpu::Extent3d> for Extent3D {
    fn into_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: self.depth_or_array_layers,
        }
    }
}

impl IntoWgpu<wgpu::Origin3d> for Origin3D {
    fn into_wgpu(self) -> wgpu::Origin3d {
        wgpu::Origin3d {
            x: self.x,
            y: self.y,
            z: self.z,
        }
    }
}

impl IntoWgpu<wgpu::AddressMode> for AddressMode {
    fn into_wgpu(self) -> wgpu::AddressMode {
        match self {
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

impl IntoWgpu<wgpu::FilterMode> for FilterMode {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::CompareFunction> for CompareFunction {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareFunction::Never => wgpu::CompareFunction::Never,
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

impl IntoWgpu<wgpu::TextureDimension> for TextureKind {
    fn into_wgpu(self) -> wgpu::TextureDimension {
        match self {
            TextureKind::D3 => wgpu::TextureDimension::D3,
            TextureKind::D2 | TextureKind::Cube | TextureKind::D2Array => {
                wgpu::TextureDimension::D2
            }
        }
    }
}

impl IntoWgpu<wgpu::TextureViewDimension> for TextureKind {
    fn into_wgpu(self) -> wgpu::TextureViewDimension {
        match self {
            TextureKind::D2 => wgpu::TextureViewDimension::D2,
            TextureKind::D3 => wgpu::TextureViewDimension::D3,
            TextureKind::Cube => wgpu::TextureViewDimension::Cube,
            TextureKind::D2Array => wgpu::TextureViewDimension::D2Array,
        }
    }
}

/// The result of pixel-format negotiation: the native storage format, how
/// shaders sample it, and which optional device feature it depended on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeFormat {
    /// The wgpu storage/transfer format.
    pub format: wgpu::TextureFormat,
    /// The sample type a binding layout must declare for this format.
    pub sample_type: wgpu::TextureSampleType,
    /// The optional feature this format requires, empty for core formats.
    pub required_features: wgpu::Features,
}

/// Maps a pixel format onto its native triple, failing fast when the
/// active device lacks the feature the format depends on.
///
/// The match is exhaustive over the closed format enum: adding a format
/// without a native mapping is a compile error, not a runtime fallback.
pub fn negotiate_format(
    format: TextureFormat,
    available: wgpu::Features,
) -> Result<NativeFormat, TextureError> {
    use wgpu::TextureFormat as Wf;
    use wgpu::TextureSampleType as St;

    let filterable_float = St::Float { filterable: true };
    let f32_filterable = St::Float {
        filterable: available.contains(wgpu::Features::FLOAT32_FILTERABLE),
    };
    let bc = wgpu::Features::TEXTURE_COMPRESSION_BC;

    let native = match format {
        TextureFormat::R8Unorm => native(Wf::R8Unorm, filterable_float),
        TextureFormat::Rg8Unorm => native(Wf::Rg8Unorm, filterable_float),
        TextureFormat::Rgba8Unorm => native(Wf::Rgba8Unorm, filterable_float),
        TextureFormat::Rgba8UnormSrgb => native(Wf::Rgba8UnormSrgb, filterable_float),
        TextureFormat::Bgra8Unorm => native(Wf::Bgra8Unorm, filterable_float),
        TextureFormat::R16Float => native(Wf::R16Float, filterable_float),
        TextureFormat::Rg16Float => native(Wf::Rg16Float, filterable_float),
        TextureFormat::Rgba16Float => native(Wf::Rgba16Float, filterable_float),
        TextureFormat::R32Float => native(Wf::R32Float, f32_filterable),
        TextureFormat::Rg32Float => native(Wf::Rg32Float, f32_filterable),
        TextureFormat::Rgba32Float => native(Wf::Rgba32Float, f32_filterable),
        TextureFormat::R32Uint => native(Wf::R32Uint, St::Uint),
        TextureFormat::R32Sint => native(Wf::R32Sint, St::Sint),
        TextureFormat::Rgba8Uint => native(Wf::Rgba8Uint, St::Uint),
        TextureFormat::Rgba8Sint => native(Wf::Rgba8Sint, St::Sint),
        TextureFormat::Rgba32Uint => native(Wf::Rgba32Uint, St::Uint),
        TextureFormat::Bc1RgbaUnorm => gated(Wf::Bc1RgbaUnorm, filterable_float, bc),
        TextureFormat::Bc3RgbaUnorm => gated(Wf::Bc3RgbaUnorm, filterable_float, bc),
        TextureFormat::Bc5RgUnorm => gated(Wf::Bc5RgUnorm, filterable_float, bc),
        TextureFormat::Bc7RgbaUnorm => gated(Wf::Bc7RgbaUnorm, filterable_float, bc),
        TextureFormat::Depth16Unorm => native(Wf::Depth16Unorm, St::Depth),
        TextureFormat::Depth24PlusStencil8 => native(Wf::Depth24PlusStencil8, St::Depth),
        TextureFormat::Depth32Float => native(Wf::Depth32Float, St::Depth),
    };

    if !available.contains(native.required_features) {
        return Err(TextureError::UnsupportedFormat {
            format,
            reason: format!(
                "device lacks required feature {:?}",
                native.required_features
            ),
        });
    }
    Ok(native)
}

fn native(format: wgpu::TextureFormat, sample_type: wgpu::TextureSampleType) -> NativeFormat {
    NativeFormat {
        format,
        sample_type,
        required_features: wgpu::Features::empty(),
    }
}

fn gated(
    format: wgpu::TextureFormat,
    sample_type: wgpu::TextureSampleType,
    required_features: wgpu::Features,
) -> NativeFormat {
    NativeFormat {
        format,
        sample_type,
        required_features,
    }
}
