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

//! Defines the hierarchy of error types for the texture resource subsystem.

use crate::renderer::format::TextureFormat;
use crate::renderer::texture::TextureId;
use std::fmt;

/// An error raised by the texture front end or its backend.
///
/// Precondition violations (double lock, out-of-range slice) are programmer
/// errors: the texture's state is left unchanged when one is returned.
#[derive(Debug)]
pub enum TextureError {
    /// `lock` was called while another lock was outstanding.
    AlreadyLocked {
        /// The texture holding the outstanding lock.
        id: TextureId,
    },
    /// A slice index outside the texture's slice range was addressed.
    SliceOutOfRange {
        /// The requested slice.
        slice: u32,
        /// The number of slices the texture actually has.
        slices: u32,
    },
    /// A non-zero slice was addressed on a texture that is not layered.
    NotLayered {
        /// The requested slice.
        slice: u32,
    },
    /// A mip level outside the texture's chain was addressed.
    MipLevelOutOfRange {
        /// The requested mip level.
        level: u32,
        /// The number of mip levels the texture actually has.
        levels: u32,
    },
    /// A cubemap was constructed with a slice count other than six.
    InvalidCubemapSlices {
        /// The requested slice count.
        slices: u32,
    },
    /// Initial level data did not match the texture's shape (wrong slice
    /// count, or whole-level data supplied for a layered texture).
    InvalidLevelData {
        /// The mip level whose data was malformed.
        level: u32,
    },
    /// A texture dimension was zero.
    InvalidDimensions {
        /// The requested width.
        width: u32,
        /// The requested height.
        height: u32,
    },
    /// The pixel format is not supported by the active backend.
    ///
    /// This is fatal for the texture's construction; no partial native
    /// resource is left allocated.
    UnsupportedFormat {
        /// The format that could not be mapped.
        format: TextureFormat,
        /// Why the backend rejected it.
        reason: String,
    },
    /// An operation was attempted on a destroyed texture.
    Destroyed {
        /// The destroyed texture.
        id: TextureId,
    },
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::AlreadyLocked { id } => {
                write!(f, "Texture {id:?} is already locked")
            }
            TextureError::SliceOutOfRange { slice, slices } => {
                write!(f, "Slice {slice} out of range (texture has {slices} slices)")
            }
            TextureError::NotLayered { slice } => {
                write!(
                    f,
                    "Slice {slice} requested on a texture that is not an array or cubemap"
                )
            }
            TextureError::MipLevelOutOfRange { level, levels } => {
                write!(f, "Mip level {level} out of range (texture has {levels} levels)")
            }
            TextureError::InvalidCubemapSlices { slices } => {
                write!(f, "Cubemap textures require exactly 6 slices, got {slices}")
            }
            TextureError::InvalidLevelData { level } => {
                write!(f, "Initial data for mip level {level} does not match the texture shape")
            }
            TextureError::InvalidDimensions { width, height } => {
                write!(f, "Texture dimensions must be non-zero, got {width}x{height}")
            }
            TextureError::UnsupportedFormat { format, reason } => {
                write!(f, "Pixel format {format:?} is not supported: {reason}")
            }
            TextureError::Destroyed { id } => {
                write!(f, "Texture {id:?} has been destroyed")
            }
            TextureError::BackendError(msg) => {
                write!(f, "Backend-specific texture error: {msg}")
            }
        }
    }
}

impl std::error::Error for TextureError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A texture-specific error occurred.
    Texture(TextureError),
    /// A generic resource could not be found.
    NotFound,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Texture(err) => write!(f, "Texture resource error: {err}"),
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Texture(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TextureError> for ResourceError {
    fn from(err: TextureError) -> Self {
        ResourceError::Texture(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn texture_error_display() {
        let err = TextureError::SliceOutOfRange { slice: 7, slices: 6 };
        assert_eq!(format!("{err}"), "Slice 7 out of range (texture has 6 slices)");

        let err = TextureError::InvalidCubemapSlices { slices: 4 };
        assert_eq!(format!("{err}"), "Cubemap textures require exactly 6 slices, got 4");
    }

    #[test]
    fn resource_error_wraps_texture_error() {
        let err = TextureError::NotLayered { slice: 2 };
        let res: ResourceError = err.into();
        assert_eq!(
            format!("{res}"),
            "Texture resource error: Slice 2 requested on a texture that is not an array or cubemap"
        );
        assert!(res.source().is_some());
    }
}
