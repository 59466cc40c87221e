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

//! The wgpu texture backend: native allocation, planned uploads, and
//! CPU-side mipmap synthesis.

use crate::graphics::wgpu::context::WgpuContext;
use crate::graphics::wgpu::conversions::{negotiate_format, IntoWgpu, NativeFormat};
use kiln_core::math::{Extent2D, Extent3D, Origin3D};
use kiln_core::renderer::error::TextureError;
use kiln_core::renderer::format::TextureFormat;
use kiln_core::renderer::texture::{FilterMode, TextureKind};
use kiln_core::renderer::TextureBackend;
use kiln_core::resource::{plan_upload, Texture, VramCategory};
use std::sync::Arc;

/// The device-side half of a texture, holding the native wgpu resource
/// and its sampler.
///
/// Created once per `Texture` by the device context and attached via
/// [`Texture::attach_backend`]. The native resource reserves storage for
/// the full mip chain at `initialize`; upload passes write sub-regions
/// into it and never reallocate.
#[derive(Debug)]
pub struct WgpuTextureBackend {
    context: Arc<WgpuContext>,
    native: Option<NativeTexture>,
}

#[derive(Debug)]
struct NativeTexture {
    texture: wgpu::Texture,
    sampler: wgpu::Sampler,
    native_format: NativeFormat,
    format: TextureFormat,
    kind: TextureKind,
    /// Level-0 extent of the native resource. Smaller than the front
    /// end's extent when an oversized source had to be downsampled.
    extent: Extent2D,
    mip_levels: u32,
    slices: u32,
    byte_size: u64,
}

impl WgpuTextureBackend {
    /// Creates a backend bound to the given context, with no native
    /// resource until `initialize` is called.
    pub fn new(context: Arc<WgpuContext>) -> Box<Self> {
        Box::new(Self {
            context,
            native: None,
        })
    }

    /// The sampler reflecting the texture's current filtering and address
    /// state, for bind-group construction. `None` until `initialize`.
    pub fn sampler(&self) -> Option<&wgpu::Sampler> {
        self.native.as_ref().map(|native| &native.sampler)
    }

    fn build_sampler(&self, texture: &Texture) -> wgpu::Sampler {
        let linear =
            texture.min_filter() == FilterMode::Linear && texture.mag_filter() == FilterMode::Linear;
        // Anisotropic filtering requires linear min/mag sampling.
        let anisotropy = if linear { texture.anisotropy().min(16) as u16 } else { 1 };
        self.context.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some(texture.name()),
            address_mode_u: texture.address_u().into_wgpu(),
            address_mode_v: texture.address_v().into_wgpu(),
            address_mode_w: texture.address_w().into_wgpu(),
            mag_filter: texture.mag_filter().into_wgpu(),
            min_filter: texture.min_filter().into_wgpu(),
            mipmap_filter: if texture.mipmaps() && linear {
                wgpu::FilterMode::Linear
            } else {
                wgpu::FilterMode::Nearest
            },
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: texture.compare().map(IntoWgpu::into_wgpu),
            anisotropy_clamp: anisotropy.max(1),
            border_color: None,
        })
    }

    fn write_region(
        &self,
        native: &NativeTexture,
        level: u32,
        slice: u32,
        data: &[u8],
    ) -> Result<(), TextureError> {
        let mip = native.extent.mip_level(level);
        let block = native.format.block_dim();
        let bytes_per_row = mip.width.div_ceil(block) * native.format.bytes_per_block();
        let rows = mip.height.div_ceil(block);
        let depth = match native.kind {
            TextureKind::D3 => (native.slices >> level).max(1),
            _ => 1,
        };

        let expected = bytes_per_row as u64 * rows as u64 * depth as u64;
        if data.len() as u64 != expected {
            // A downsampled native resource no longer matches buffers the
            // front end sized for the original extent.
            log::warn!(
                "Skipping upload of level {level} slice {slice}: {} bytes supplied, {expected} expected",
                data.len()
            );
            return Ok(());
        }

        let origin = Origin3D {
            x: 0,
            y: 0,
            z: if native.kind.is_layered() { slice } else { 0 },
        };
        self.context.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &native.texture,
                mip_level: level,
                origin: origin.into_wgpu(),
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: if depth > 1 { Some(rows) } else { None },
            },
            Extent3D::new(mip.width, mip.height, depth).into_wgpu(),
        );
        Ok(())
    }

    /// Applies the texture's image-source transforms (downsample to the
    /// native extent, vertical flip, alpha premultiplication) to a level-0
    /// payload, copying only when something changes.
    fn prepare_level0<'a>(
        &self,
        texture: &Texture,
        native: &NativeTexture,
        data: &'a [u8],
    ) -> std::borrow::Cow<'a, [u8]> {
        let format = native.format;
        if format.is_compressed() || format.is_depth() {
            return std::borrow::Cow::Borrowed(data);
        }
        let bpp = format.bytes_per_block() as usize;
        let src = texture.extent();
        let dst = native.extent;

        let mut owned: Option<Vec<u8>> = None;
        if dst != src && data.len() == (src.width * src.height) as usize * bpp {
            owned = Some(resample_nearest(
                data, src.width, src.height, dst.width, dst.height, bpp,
            ));
        }
        if texture.flip_y() {
            let row = dst.width as usize * bpp;
            let flipped = flip_rows(owned.as_deref().unwrap_or(data), row);
            owned = Some(flipped);
        }
        if texture.premultiply_alpha() && has_u8_alpha(format) {
            let mut buf = owned.unwrap_or_else(|| data.to_vec());
            premultiply_alpha_u8(&mut buf);
            owned = Some(buf);
        }
        match owned {
            Some(buf) => std::borrow::Cow::Owned(buf),
            None => std::borrow::Cow::Borrowed(data),
        }
    }
}

impl TextureBackend for WgpuTextureBackend {
    fn initialize(&mut self, texture: &Texture) -> Result<(), TextureError> {
        let native_format = negotiate_format(texture.format(), self.context.features())?;

        let max_dim = self.context.shared().max_texture_dimension();
        let requested = texture.extent();
        let extent = fit_within(requested, max_dim);
        if extent != requested {
            if texture.format().is_compressed() {
                return Err(TextureError::BackendError(format!(
                    "compressed texture '{}' exceeds the device maximum dimension \
                     ({}x{} > {max_dim}) and cannot be downsampled",
                    texture.name(),
                    requested.width,
                    requested.height
                )));
            }
            log::warn!(
                "Texture '{}' exceeds the device maximum dimension; downsampling {}x{} -> {}x{}",
                texture.name(),
                requested.width,
                requested.height,
                extent.width,
                extent.height
            );
        }

        let mip_levels = mip_count(extent, texture.mipmaps());

        let mut usage = wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING;
        if texture.storage() {
            usage |= wgpu::TextureUsages::STORAGE_BINDING;
        }
        if texture.format().is_depth() || texture.category() == VramCategory::Target {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }

        let wgpu_texture = self.context.device().create_texture(&wgpu::TextureDescriptor {
            label: Some(texture.name()),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: texture.slices(),
            },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: texture.kind().into_wgpu(),
            format: native_format.format,
            usage,
            view_formats: &[],
        });

        let byte_size = native_byte_size(
            texture.format(),
            extent,
            mip_levels,
            texture.slices(),
            texture.kind(),
        );
        log::debug!(
            "WgpuTextureBackend: allocated '{}' as {:?}, {} mip level(s), {} bytes",
            texture.name(),
            native_format.format,
            mip_levels,
            byte_size
        );

        self.native = Some(NativeTexture {
            texture: wgpu_texture,
            sampler: self.build_sampler(texture),
            native_format,
            format: texture.format(),
            kind: texture.kind(),
            extent,
            mip_levels,
            slices: texture.slices(),
            byte_size,
        });
        Ok(())
    }

    fn upload(&mut self, texture: &mut Texture) -> Result<(), TextureError> {
        // Shape changes (source adoption, placeholder fallback) require a
        // fresh native resource: wgpu textures are immutable in extent.
        let needs_realloc = match self.native.as_ref() {
            Some(native) => {
                let max_dim = self.context.shared().max_texture_dimension();
                let desired = fit_within(texture.extent(), max_dim);
                native.extent != desired
                    || native.mip_levels != mip_count(desired, texture.mipmaps())
                    || native.slices != texture.slices()
            }
            None => {
                return Err(TextureError::BackendError(
                    "upload before initialize".into(),
                ));
            }
        };
        if needs_realloc {
            if let Some(old) = self.native.take() {
                old.texture.destroy();
            }
            self.initialize(texture)?;
            // The fresh resource holds no content; every surviving CPU
            // level must be written into it regardless of what was pending.
            texture.mark_all_dirty();
        } else if !texture.take_param_flags().is_empty() {
            if let Some(native) = self.native.take() {
                let sampler = self.build_sampler(texture);
                self.native = Some(NativeTexture { sampler, ..native });
            }
        }
        let Some(native) = self.native.as_ref() else {
            return Err(TextureError::BackendError(
                "native resource missing after reallocation".into(),
            ));
        };

        let plan = plan_upload(texture);
        for region in &plan.regions {
            let Some(data) = texture.level_data(region.level, region.slice) else {
                continue;
            };
            if region.level == 0 {
                let payload = self.prepare_level0(texture, native, data);
                self.write_region(native, 0, region.slice, &payload)?;
            } else {
                self.write_region(native, region.level, region.slice, data)?;
            }
        }

        // An invalid texture keeps no CPU-side levels; fill its 4x4
        // placeholder with a visible checker instead of leaving garbage.
        if texture.invalid() && u8_channels(native.format) == Some(4) {
            let bytes: &[u8] = bytemuck::cast_slice(&PLACEHOLDER_CHECKER);
            for slice in 0..texture.dirty_slice_count() {
                self.write_region(native, 0, slice, bytes)?;
            }
        }

        for &slice in &plan.regenerate_slices {
            let Some(channels) = u8_channels(native.format) else {
                log::debug!(
                    "Mip regeneration skipped for {:?}: no 8-bit CPU filter",
                    native.format
                );
                continue;
            };
            if native.kind == TextureKind::D3 {
                log::debug!("Mip regeneration skipped for volume texture");
                continue;
            }
            let Some(level0) = texture.level_data(0, slice) else {
                continue;
            };
            let base = self.prepare_level0(texture, native, level0).into_owned();
            let mut current = base;
            let mut extent = native.extent;
            for level in 1..native.mip_levels {
                current = box_downsample(&current, extent.width, extent.height, channels);
                extent = extent.mip_level(1);
                self.write_region(native, level, slice, &current)?;
            }
        }

        texture.commit_upload(native.byte_size);
        Ok(())
    }

    fn lose_context(&mut self, texture: &mut Texture) {
        log::warn!("WgpuTextureBackend: graphics context lost, native resource dropped");
        self.native = None;
        texture.mark_all_dirty();
    }

    fn destroy(&mut self) {
        if let Some(native) = self.native.take() {
            native.texture.destroy();
        }
    }
}

/// A magenta/black 4x4 RGBA8 checker, written into the placeholder an
/// invalid texture reverts to.
const PLACEHOLDER_CHECKER: [u32; 16] = {
    const M: u32 = 0xFFFF00FF; // magenta, RGBA8 little-endian
    const B: u32 = 0xFF000000; // opaque black
    [M, B, M, B, B, M, B, M, M, B, M, B, B, M, B, M]
};

/// The number of mip levels a resource of the given extent holds.
pub fn mip_count(extent: Extent2D, mipmaps: bool) -> u32 {
    if mipmaps {
        32 - extent.max_dimension().leading_zeros()
    } else {
        1
    }
}

/// Scales an extent down, preserving aspect ratio, so neither dimension
/// exceeds `max_dim`. Returns the input unchanged when it already fits.
pub fn fit_within(extent: Extent2D, max_dim: u32) -> Extent2D {
    let largest = extent.max_dimension();
    if largest <= max_dim {
        return extent;
    }
    let scale = max_dim as f64 / largest as f64;
    Extent2D::new(
        ((extent.width as f64 * scale) as u32).max(1),
        ((extent.height as f64 * scale) as u32).max(1),
    )
}

/// The byte footprint of a native resource: every mip level times every
/// slice (volume depth shrinks per level, array layers do not).
pub fn native_byte_size(
    format: TextureFormat,
    extent: Extent2D,
    mip_levels: u32,
    slices: u32,
    kind: TextureKind,
) -> u64 {
    let mut total = 0;
    for level in 0..mip_levels {
        let per_slice = format.level_byte_size(extent, level);
        let count = match kind {
            TextureKind::D2 => 1,
            TextureKind::D3 => (slices >> level).max(1),
            TextureKind::Cube | TextureKind::D2Array => slices,
        };
        total += per_slice * count as u64;
    }
    total
}

/// Reverses the row order of a tightly packed image.
pub fn flip_rows(data: &[u8], bytes_per_row: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for row in data.chunks_exact(bytes_per_row).rev() {
        out.extend_from_slice(row);
    }
    out
}

/// Multiplies the color channels of 4-channel 8-bit pixels by their alpha.
pub fn premultiply_alpha_u8(data: &mut [u8]) {
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u32;
        px[0] = ((px[0] as u32 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u32 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u32 * a + 127) / 255) as u8;
    }
}

/// Nearest-neighbor resample of a tightly packed image to a new size.
pub fn resample_nearest(
    src: &[u8],
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let mut out = Vec::with_capacity((dst_w * dst_h) as usize * bytes_per_pixel);
    for y in 0..dst_h {
        let sy = (y as u64 * src_h as u64 / dst_h as u64) as u32;
        for x in 0..dst_w {
            let sx = (x as u64 * src_w as u64 / dst_w as u64) as u32;
            let offset = (sy * src_w + sx) as usize * bytes_per_pixel;
            out.extend_from_slice(&src[offset..offset + bytes_per_pixel]);
        }
    }
    out
}

/// Box-filters a tightly packed 8-bit-channel image down to half size
/// (each dimension `max(1, dim / 2)`), averaging 2x2 neighborhoods.
pub fn box_downsample(src: &[u8], width: u32, height: u32, channels: u32) -> Vec<u8> {
    let dst_w = (width / 2).max(1);
    let dst_h = (height / 2).max(1);
    let ch = channels as usize;
    let mut out = Vec::with_capacity((dst_w * dst_h) as usize * ch);
    for y in 0..dst_h {
        for x in 0..dst_w {
            let x0 = (x * 2).min(width - 1);
            let x1 = (x * 2 + 1).min(width - 1);
            let y0 = (y * 2).min(height - 1);
            let y1 = (y * 2 + 1).min(height - 1);
            for c in 0..ch {
                let sample = |sx: u32, sy: u32| src[(sy * width + sx) as usize * ch + c] as u32;
                let sum = sample(x0, y0) + sample(x1, y0) + sample(x0, y1) + sample(x1, y1);
                out.push(((sum + 2) / 4) as u8);
            }
        }
    }
    out
}

/// The channel count for formats the CPU box filter can process, `None`
/// for formats with wider-than-8-bit components.
fn u8_channels(format: TextureFormat) -> Option<u32> {
    match format {
        TextureFormat::R8Unorm => Some(1),
        TextureFormat::Rg8Unorm => Some(2),
        TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb | TextureFormat::Bgra8Unorm => {
            Some(4)
        }
        _ => None,
    }
}

/// Whether the format carries an 8-bit alpha in the fourth channel.
fn has_u8_alpha(format: TextureFormat) -> bool {
    matches!(
        format,
        TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb | TextureFormat::Bgra8Unorm
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_within_preserves_aspect() {
        assert_eq!(fit_within(Extent2D::new(1024, 512), 4096), Extent2D::new(1024, 512));
        assert_eq!(fit_within(Extent2D::new(8192, 4096), 4096), Extent2D::new(4096, 2048));
        assert_eq!(fit_within(Extent2D::new(4096, 8192), 2048), Extent2D::new(1024, 2048));
        // Extreme ratios never collapse to zero.
        assert_eq!(fit_within(Extent2D::new(100_000, 2), 1024).height, 1);
    }

    #[test]
    fn native_size_counts_volume_depth_per_level() {
        let size = native_byte_size(
            TextureFormat::Rgba8Unorm,
            Extent2D::new(4, 4),
            3,
            4,
            TextureKind::D3,
        );
        // L0: 4x4x4, L1: 2x2x2, L2: 1x1x1 texels * 4 bytes.
        assert_eq!(size, (64 + 8 + 1) * 4);

        let array = native_byte_size(
            TextureFormat::Rgba8Unorm,
            Extent2D::new(4, 4),
            1,
            4,
            TextureKind::D2Array,
        );
        assert_eq!(array, 4 * 4 * 4 * 4);
    }

    #[test]
    fn flip_reverses_row_order() {
        // Two rows of two single-byte pixels.
        let data = [1u8, 2, 3, 4];
        assert_eq!(flip_rows(&data, 2), vec![3, 4, 1, 2]);
    }

    #[test]
    fn premultiply_scales_color_by_alpha() {
        let mut px = [200u8, 100, 0, 128];
        premultiply_alpha_u8(&mut px);
        assert_eq!(px[3], 128);
        // 200 * 128/255 ~= 100, 100 * 128/255 ~= 50.
        assert!((px[0] as i32 - 100).abs() <= 1);
        assert!((px[1] as i32 - 50).abs() <= 1);
        assert_eq!(px[2], 0);
    }

    #[test]
    fn resample_identity_is_lossless() {
        let src = vec![1u8, 2, 3, 4];
        assert_eq!(resample_nearest(&src, 2, 2, 2, 2, 1), src);
    }

    #[test]
    fn resample_halves_by_dropping() {
        #[rustfmt::skip]
        let src = vec![
            10u8, 20, 30, 40,
            50,   60, 70, 80,
            11,   21, 31, 41,
            51,   61, 71, 81,
        ];
        let out = resample_nearest(&src, 4, 4, 2, 2, 1);
        assert_eq!(out, vec![10, 30, 11, 31]);
    }

    #[test]
    fn box_downsample_averages_quads() {
        #[rustfmt::skip]
        let src = vec![
            0u8, 100,
            50,  250,
        ];
        let out = box_downsample(&src, 2, 2, 1);
        assert_eq!(out, vec![100]);
    }

    #[test]
    fn box_downsample_clamps_odd_edges() {
        // 3x1 single-channel image halves to 1x1 sampling within bounds.
        let src = vec![10u8, 20, 30];
        let out = box_downsample(&src, 3, 1, 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], 15);
    }

    #[test]
    fn mip_chain_lengths_match_the_front_end() {
        // A full chain from 16x16 is 5 levels; byte sizes pin at 1 texel.
        let total = native_byte_size(
            TextureFormat::Rgba8Unorm,
            Extent2D::new(16, 16),
            5,
            1,
            TextureKind::D2,
        );
        assert_eq!(total, (256 + 64 + 16 + 4 + 1) * 4);
    }
}
