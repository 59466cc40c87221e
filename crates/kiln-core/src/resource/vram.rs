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

//! Shared VRAM accounting.
//!
//! One `VramTracker` is owned by the device context; every texture holds a
//! capability reference to it and reports its byte footprint through
//! [`VramTracker::reassign`]. Decrement and increment are a single
//! operation so a footprint can never be double-counted or leaked between
//! the two halves of an update.

use std::sync::atomic::{AtomicU64, Ordering};

/// The usage category a texture's bytes are attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VramCategory {
    /// Regular asset textures (albedo, normal maps, ...).
    #[default]
    Asset,
    /// Shadow-map textures.
    Shadow,
    /// Lightmap textures.
    Lightmap,
    /// Render targets and other transient attachments.
    Target,
}

const CATEGORY_COUNT: usize = 4;

impl VramCategory {
    const fn index(self) -> usize {
        match self {
            VramCategory::Asset => 0,
            VramCategory::Shadow => 1,
            VramCategory::Lightmap => 2,
            VramCategory::Target => 3,
        }
    }
}

/// A point-in-time snapshot of the tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VramReport {
    /// Total texture bytes currently attributed.
    pub total_bytes: u64,
    /// The largest total ever observed.
    pub peak_bytes: u64,
    /// Bytes attributed to asset textures.
    pub asset_bytes: u64,
    /// Bytes attributed to shadow maps.
    pub shadow_bytes: u64,
    /// Bytes attributed to lightmaps.
    pub lightmap_bytes: u64,
    /// Bytes attributed to render targets.
    pub target_bytes: u64,
}

/// The running total of GPU memory attributed to live texture resources,
/// broken down by usage category.
///
/// All mutation happens on the thread owning the graphics context; the
/// atomics exist so the tracker can be shared by `Arc` and polled by
/// telemetry without locking.
#[derive(Debug, Default)]
pub struct VramTracker {
    total: AtomicU64,
    peak: AtomicU64,
    categories: [AtomicU64; CATEGORY_COUNT],
}

impl VramTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a texture's previously reported footprint with a new one.
    ///
    /// This is the only mutation entry point: passing `old = 0` attributes
    /// a first footprint, `new = 0` releases the last one, and any other
    /// combination moves the delta. Keeping both halves in one call
    /// preserves the always-paired invariant.
    pub fn reassign(&self, category: VramCategory, old_bytes: u64, new_bytes: u64) {
        if old_bytes == new_bytes {
            return;
        }
        let cat = &self.categories[category.index()];
        if new_bytes >= old_bytes {
            let delta = new_bytes - old_bytes;
            cat.fetch_add(delta, Ordering::Relaxed);
            let total = self.total.fetch_add(delta, Ordering::Relaxed) + delta;
            self.peak.fetch_max(total, Ordering::Relaxed);
        } else {
            let delta = old_bytes - new_bytes;
            cat.fetch_sub(delta, Ordering::Relaxed);
            self.total.fetch_sub(delta, Ordering::Relaxed);
        }
    }

    /// Total texture bytes currently attributed.
    pub fn total_bytes(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// The largest total ever observed.
    pub fn peak_bytes(&self) -> u64 {
        self.peak.load(Ordering::Relaxed)
    }

    /// Bytes currently attributed to one category.
    pub fn category_bytes(&self, category: VramCategory) -> u64 {
        self.categories[category.index()].load(Ordering::Relaxed)
    }

    /// Snapshots the tracker.
    pub fn report(&self) -> VramReport {
        VramReport {
            total_bytes: self.total_bytes(),
            peak_bytes: self.peak_bytes(),
            asset_bytes: self.category_bytes(VramCategory::Asset),
            shadow_bytes: self.category_bytes(VramCategory::Shadow),
            lightmap_bytes: self.category_bytes(VramCategory::Lightmap),
            target_bytes: self.category_bytes(VramCategory::Target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassign_attributes_and_releases() {
        let tracker = VramTracker::new();
        tracker.reassign(VramCategory::Asset, 0, 1024);
        assert_eq!(tracker.total_bytes(), 1024);
        assert_eq!(tracker.category_bytes(VramCategory::Asset), 1024);

        tracker.reassign(VramCategory::Asset, 1024, 256);
        assert_eq!(tracker.total_bytes(), 256);

        tracker.reassign(VramCategory::Asset, 256, 0);
        assert_eq!(tracker.total_bytes(), 0);
        assert_eq!(tracker.category_bytes(VramCategory::Asset), 0);
    }

    #[test]
    fn peak_tracks_high_water_mark() {
        let tracker = VramTracker::new();
        tracker.reassign(VramCategory::Shadow, 0, 4096);
        tracker.reassign(VramCategory::Shadow, 4096, 512);
        assert_eq!(tracker.peak_bytes(), 4096);
        assert_eq!(tracker.total_bytes(), 512);
    }

    #[test]
    fn categories_are_independent() {
        let tracker = VramTracker::new();
        tracker.reassign(VramCategory::Asset, 0, 100);
        tracker.reassign(VramCategory::Lightmap, 0, 200);
        let report = tracker.report();
        assert_eq!(report.asset_bytes, 100);
        assert_eq!(report.lightmap_bytes, 200);
        assert_eq!(report.shadow_bytes, 0);
        assert_eq!(report.total_bytes, 300);
    }

    #[test]
    fn equal_reassign_is_a_no_op() {
        let tracker = VramTracker::new();
        tracker.reassign(VramCategory::Target, 0, 128);
        tracker.reassign(VramCategory::Target, 128, 128);
        assert_eq!(tracker.total_bytes(), 128);
        assert_eq!(tracker.peak_bytes(), 128);
    }
}
