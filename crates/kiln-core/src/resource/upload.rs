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

//! Backend-agnostic upload planning.
//!
//! [`plan_upload`] turns a texture's pending-operation set and dirty map
//! into the concrete list of (level, slice) regions a backend must
//! transfer, plus the per-slice record of which mip chains need CPU-side
//! regeneration afterwards. Keeping the planning here lets every backend
//! share one tested interpretation of the dirty state.

use crate::renderer::texture::PendingOps;
use crate::resource::texture::Texture;
use std::collections::BTreeMap;

/// One region a backend must transfer: a single mip level of a single
/// slice (for volume textures, the whole level travels under slice 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UploadRegion {
    /// The mip level.
    pub level: u32,
    /// The slice (face, layer, or 0).
    pub slice: u32,
}

/// The result of planning one upload pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPlan {
    /// Whether this is a full pass (every required region considered)
    /// rather than a dirty-map pass.
    pub full: bool,
    /// The regions with CPU-side data that must be transferred, ordered by
    /// (level, slice).
    pub regions: Vec<UploadRegion>,
    /// Per slice, how many mip levels counted from 0 have CPU-side data
    /// with no gap. This records what a pass can actually deliver, kept
    /// separate from the request flags that triggered it.
    pub completeness: BTreeMap<u32, u32>,
    /// Slices whose mip chain must be regenerated (downsampled from level
    /// 0) after the transfers, because their CPU-side chain is incomplete.
    pub regenerate_slices: Vec<u32>,
}

impl UploadPlan {
    /// Whether the pass has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.regenerate_slices.is_empty()
    }
}

/// Plans the minimal upload pass for `texture`'s current pending state.
///
/// A pending full upload wins over a partial one: every required
/// (level, slice) with CPU-side data is transferred. A partial pass
/// transfers exactly the dirty map. Regions without CPU-side data are
/// skipped either way; a backend never invents pixels.
///
/// Mip regeneration is planned for uncompressed mipmapped textures when a
/// slice's level 0 is part of the pass (or the chain was explicitly
/// invalidated) and its CPU-side chain does not reach the required depth.
/// Compressed formats cannot be downsampled in place, so their chains are
/// only ever as complete as the data supplied.
pub fn plan_upload(texture: &Texture) -> UploadPlan {
    let pending = texture.pending_ops();
    let required_levels = texture.required_mip_levels();
    let slice_count = texture.dirty_slice_count();
    let full = pending.contains(PendingOps::UPLOAD);

    let mut regions = Vec::new();
    if full {
        for level in 0..required_levels {
            for slice in 0..slice_count {
                if texture.has_level_data(level, slice) {
                    regions.push(UploadRegion { level, slice });
                }
            }
        }
    } else if pending.contains(PendingOps::UPLOAD_PARTIAL) {
        for (&level, slices) in texture.dirty_levels() {
            if level >= required_levels {
                continue;
            }
            for &slice in slices {
                if texture.has_level_data(level, slice) {
                    regions.push(UploadRegion { level, slice });
                }
            }
        }
    }

    let mut completeness = BTreeMap::new();
    for slice in 0..slice_count {
        let mut complete = 0;
        while complete < required_levels && texture.has_level_data(complete, slice) {
            complete += 1;
        }
        completeness.insert(slice, complete);
    }

    let mut regenerate_slices = Vec::new();
    if texture.mipmaps() && !texture.format().is_compressed() {
        let clear_mips = pending.contains(PendingOps::CLEAR_MIPS);
        for slice in 0..slice_count {
            if !texture.has_level_data(0, slice) {
                continue;
            }
            let touched = clear_mips
                || regions
                    .iter()
                    .any(|r| r.level == 0 && r.slice == slice);
            if touched && completeness[&slice] < required_levels {
                regenerate_slices.push(slice);
            }
        }
    }

    UploadPlan {
        full,
        regions,
        completeness,
        regenerate_slices,
    }
}
