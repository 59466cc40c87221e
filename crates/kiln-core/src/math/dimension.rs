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

//! Integer extents and origins for pixel-based sizes and offsets.
//!
//! All components are `u32`, suitable for texture dimensions and regions
//! within them.

/// A two-dimensional extent: width and height in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns this extent scaled down for the given mip level.
    ///
    /// Each dimension is `max(1, dim >> level)`, so the extent never
    /// collapses to zero on either axis.
    pub const fn mip_level(self, level: u32) -> Self {
        Self {
            width: max_one(self.width >> level),
            height: max_one(self.height >> level),
        }
    }

    /// The larger of the two dimensions.
    pub const fn max_dimension(self) -> u32 {
        if self.width > self.height {
            self.width
        } else {
            self.height
        }
    }
}

const fn max_one(v: u32) -> u32 {
    if v == 0 {
        1
    } else {
        v
    }
}

/// A three-dimensional extent: width, height, and depth or array layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
    /// The depth, or the number of array layers.
    pub depth_or_array_layers: u32,
}

impl Extent3D {
    /// Creates a new extent.
    pub const fn new(width: u32, height: u32, depth_or_array_layers: u32) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers,
        }
    }
}

/// A three-dimensional origin, the corner of a volume or an offset into an
/// array texture (`z` addresses the layer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin3D {
    /// The x-coordinate of the origin.
    pub x: u32,
    /// The y-coordinate of the origin.
    pub y: u32,
    /// The z-coordinate, or the array layer.
    pub z: u32,
}
