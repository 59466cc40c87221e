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

//! Image-like sources for `Texture::set_source`.
//!
//! Anything that can report its dimensions and expose decoded pixel bytes
//! can be assigned to a texture: a decoded image asset, a software canvas,
//! or a video frame. The texture copies the level-0 pixels out of the
//! source; it never retains a reference to it.

use crate::renderer::format::TextureFormat;

/// The contract an image-like source must satisfy.
pub trait ImageSource {
    /// Width of the source in pixels.
    fn width(&self) -> u32;

    /// Height of the source in pixels.
    fn height(&self) -> u32;

    /// The decoded pixel bytes, tightly packed row-major.
    fn pixels(&self) -> &[u8];
}

/// Whether `source` is a valid image-like source for a texture of the
/// given format: non-zero dimensions, an uncompressed non-depth format,
/// and a pixel buffer of exactly the expected size.
pub fn is_valid_source<S: ImageSource>(source: &S, format: TextureFormat) -> bool {
    if format.is_compressed() || format.is_depth() {
        return false;
    }
    let (w, h) = (source.width(), source.height());
    if w == 0 || h == 0 {
        return false;
    }
    source.pixels().len() as u64 == w as u64 * h as u64 * format.bytes_per_block() as u64
}

/// A plain CPU-side image: decoded pixels plus dimensions.
#[derive(Debug, Clone)]
pub struct SourceImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl SourceImage {
    /// Creates a source from decoded pixels. The caller is responsible for
    /// the pixel layout matching the destination texture's format; a
    /// mismatch is caught by `set_source` validation.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Creates a solid-color RGBA8 source, useful for placeholders.
    pub fn solid_rgba8(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }
}

impl ImageSource for SourceImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_source_matches_format_size() {
        let img = SourceImage::solid_rgba8(4, 4, [255, 0, 0, 255]);
        assert!(is_valid_source(&img, TextureFormat::Rgba8Unorm));
        // One byte per texel expects a smaller buffer.
        assert!(!is_valid_source(&img, TextureFormat::R8Unorm));
    }

    #[test]
    fn zero_sized_or_short_sources_are_invalid() {
        let empty = SourceImage::new(0, 4, Vec::new());
        assert!(!is_valid_source(&empty, TextureFormat::Rgba8Unorm));
        let short = SourceImage::new(4, 4, vec![0u8; 3]);
        assert!(!is_valid_source(&short, TextureFormat::Rgba8Unorm));
    }

    #[test]
    fn compressed_and_depth_destinations_reject_sources() {
        let img = SourceImage::solid_rgba8(4, 4, [0, 0, 0, 255]);
        assert!(!is_valid_source(&img, TextureFormat::Bc1RgbaUnorm));
        assert!(!is_valid_source(&img, TextureFormat::Depth32Float));
    }
}
