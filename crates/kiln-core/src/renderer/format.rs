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

//! The closed pixel-format enumeration and its derived byte-layout queries.
//!
//! Every format maps deterministically to a block size in bytes, a block
//! dimension (one texel for uncompressed formats, a 4x4 tile for BC
//! formats), and the compressed/integer/depth classification the texture
//! front end enforces its invariants with. Backends translate these values
//! into their native format triple and must fail fast on any format the
//! platform cannot express.

use crate::math::Extent2D;

/// Defines the memory format of texels in a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    // 8-bit formats
    /// One 8-bit unsigned normalized component.
    R8Unorm,
    /// Two 8-bit unsigned normalized components.
    Rg8Unorm,
    /// Four 8-bit unsigned normalized components (RGBA).
    Rgba8Unorm,
    /// Four 8-bit unsigned normalized components (RGBA) in the sRGB color space.
    Rgba8UnormSrgb,
    /// Four 8-bit unsigned normalized components (BGRA). A common swapchain format.
    Bgra8Unorm,
    // 16-bit float formats
    /// One 16-bit float component.
    R16Float,
    /// Two 16-bit float components.
    Rg16Float,
    /// Four 16-bit float components.
    Rgba16Float,
    // 32-bit float formats
    /// One 32-bit float component.
    R32Float,
    /// Two 32-bit float components.
    Rg32Float,
    /// Four 32-bit float components.
    Rgba32Float,
    // Integer formats
    /// One 32-bit unsigned integer component.
    R32Uint,
    /// One 32-bit signed integer component.
    R32Sint,
    /// Four 8-bit unsigned integer components.
    Rgba8Uint,
    /// Four 8-bit signed integer components.
    Rgba8Sint,
    /// Four 32-bit unsigned integer components.
    Rgba32Uint,
    // Block-compressed formats (4x4 texel blocks)
    /// BC1 (DXT1) compressed RGBA, 8 bytes per block.
    Bc1RgbaUnorm,
    /// BC3 (DXT5) compressed RGBA, 16 bytes per block.
    Bc3RgbaUnorm,
    /// BC5 two-channel compressed, 16 bytes per block.
    Bc5RgUnorm,
    /// BC7 high-quality compressed RGBA, 16 bytes per block.
    Bc7RgbaUnorm,
    // Depth/stencil formats
    /// A 16-bit unsigned normalized depth format.
    Depth16Unorm,
    /// A 24-bit unsigned normalized depth format with an 8-bit stencil component.
    Depth24PlusStencil8,
    /// A 32-bit float depth format.
    Depth32Float,
}

impl TextureFormat {
    /// Returns the size in bytes of one block of this format.
    ///
    /// For uncompressed formats a block is a single texel; for BC formats
    /// it is a 4x4 texel tile.
    pub const fn bytes_per_block(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rg8Unorm => 2,
            TextureFormat::Rgba8Unorm => 4,
            TextureFormat::Rgba8UnormSrgb => 4,
            TextureFormat::Bgra8Unorm => 4,
            TextureFormat::R16Float => 2,
            TextureFormat::Rg16Float => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::R32Float => 4,
            TextureFormat::Rg32Float => 8,
            TextureFormat::Rgba32Float => 16,
            TextureFormat::R32Uint => 4,
            TextureFormat::R32Sint => 4,
            TextureFormat::Rgba8Uint => 4,
            TextureFormat::Rgba8Sint => 4,
            TextureFormat::Rgba32Uint => 16,
            TextureFormat::Bc1RgbaUnorm => 8,
            TextureFormat::Bc3RgbaUnorm => 16,
            TextureFormat::Bc5RgUnorm => 16,
            TextureFormat::Bc7RgbaUnorm => 16,
            TextureFormat::Depth16Unorm => 2,
            TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Depth32Float => 4,
        }
    }

    /// The texel width/height of one block: 1 for uncompressed formats,
    /// 4 for BC formats.
    pub const fn block_dim(&self) -> u32 {
        if self.is_compressed() {
            4
        } else {
            1
        }
    }

    /// Whether this is a block-compressed format.
    pub const fn is_compressed(&self) -> bool {
        matches!(
            self,
            TextureFormat::Bc1RgbaUnorm
                | TextureFormat::Bc3RgbaUnorm
                | TextureFormat::Bc5RgUnorm
                | TextureFormat::Bc7RgbaUnorm
        )
    }

    /// Whether this is an integer (non-filterable) format.
    ///
    /// Integer formats cannot be linearly filtered or mipmapped; the
    /// texture front end forces nearest filtering for them.
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            TextureFormat::R32Uint
                | TextureFormat::R32Sint
                | TextureFormat::Rgba8Uint
                | TextureFormat::Rgba8Sint
                | TextureFormat::Rgba32Uint
        )
    }

    /// Whether this is a depth or depth/stencil format.
    pub const fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16Unorm
                | TextureFormat::Depth24PlusStencil8
                | TextureFormat::Depth32Float
        )
    }

    /// The byte size of a single slice of the given mip level.
    ///
    /// `base` is the level-0 extent; each mip dimension is
    /// `max(1, dim >> level)`, rounded up to whole blocks for compressed
    /// formats.
    pub fn level_byte_size(&self, base: Extent2D, level: u32) -> u64 {
        let mip = base.mip_level(level);
        let block = self.block_dim();
        let blocks_w = mip.width.div_ceil(block) as u64;
        let blocks_h = mip.height.div_ceil(block) as u64;
        blocks_w * blocks_h * self.bytes_per_block() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncompressed_level_sizes() {
        let fmt = TextureFormat::Rgba8Unorm;
        let base = Extent2D::new(8, 8);
        assert_eq!(fmt.level_byte_size(base, 0), 8 * 8 * 4);
        assert_eq!(fmt.level_byte_size(base, 1), 4 * 4 * 4);
        assert_eq!(fmt.level_byte_size(base, 3), 4);
        // Past the chain end the size stays pinned at one texel.
        assert_eq!(fmt.level_byte_size(base, 8), 4);
    }

    #[test]
    fn compressed_level_sizes_round_up_to_blocks() {
        let fmt = TextureFormat::Bc1RgbaUnorm;
        // 8x8 -> 2x2 blocks of 8 bytes.
        assert_eq!(fmt.level_byte_size(Extent2D::new(8, 8), 0), 32);
        // 4x4 at level 1 becomes 2x2 texels, still one whole block.
        assert_eq!(fmt.level_byte_size(Extent2D::new(4, 4), 1), 8);
        // 10x6 rounds up to 3x2 blocks.
        assert_eq!(fmt.level_byte_size(Extent2D::new(10, 6), 0), 3 * 2 * 8);
    }

    #[test]
    fn classification() {
        assert!(TextureFormat::Bc3RgbaUnorm.is_compressed());
        assert!(!TextureFormat::Rgba8Unorm.is_compressed());
        assert!(TextureFormat::R32Uint.is_integer());
        assert!(!TextureFormat::R32Float.is_integer());
        assert!(TextureFormat::Depth32Float.is_depth());
        assert_eq!(TextureFormat::Bc7RgbaUnorm.block_dim(), 4);
        assert_eq!(TextureFormat::Rgba16Float.block_dim(), 1);
    }
}
