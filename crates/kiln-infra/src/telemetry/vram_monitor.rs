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

//! VRAM resource monitor.
//!
//! Exposes the device's shared `VramTracker` as a periodic usage report
//! so a telemetry layer can poll texture memory without depending on the
//! graphics backend.

use kiln_core::resource::{DeviceShared, VramReport};
use std::borrow::Cow;
use std::sync::Weak;

/// A point-in-time usage snapshot produced by a resource monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceUsageReport {
    /// Bytes currently in use.
    pub current_bytes: u64,
    /// The largest usage ever observed, if tracked.
    pub peak_bytes: Option<u64>,
    /// The per-category breakdown of the current usage.
    pub breakdown: VramReport,
}

/// Polls texture VRAM usage through a weak reference to the device's
/// shared record, so a lingering monitor never keeps a destroyed device
/// alive.
#[derive(Debug)]
pub struct VramMonitor {
    device: Weak<DeviceShared>,
    monitor_id: String,
}

impl VramMonitor {
    /// Creates a monitor over the given device record.
    pub fn new(device: Weak<DeviceShared>, monitor_id: String) -> Self {
        Self { device, monitor_id }
    }

    /// The identifier this monitor reports under.
    pub fn monitor_id(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.monitor_id)
    }

    /// Snapshots current VRAM usage. Returns an empty report when the
    /// device has been dropped.
    pub fn usage_report(&self) -> ResourceUsageReport {
        let Some(device) = self.device.upgrade() else {
            return ResourceUsageReport::default();
        };
        let report = device.vram().report();
        ResourceUsageReport {
            current_bytes: report.total_bytes,
            peak_bytes: Some(report.peak_bytes),
            breakdown: report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::resource::VramCategory;
    use std::sync::Arc;

    #[test]
    fn reports_tracker_state() {
        let device = Arc::new(DeviceShared::new(4096));
        device.vram().reassign(VramCategory::Asset, 0, 1024);
        device.vram().reassign(VramCategory::Shadow, 0, 512);
        device.vram().reassign(VramCategory::Shadow, 512, 256);

        let monitor = VramMonitor::new(Arc::downgrade(&device), "vram".into());
        let report = monitor.usage_report();
        assert_eq!(report.current_bytes, 1280);
        assert_eq!(report.peak_bytes, Some(1536));
        assert_eq!(report.breakdown.asset_bytes, 1024);
        assert_eq!(report.breakdown.shadow_bytes, 256);
    }

    #[test]
    fn dropped_device_yields_empty_report() {
        let device = Arc::new(DeviceShared::new(4096));
        let monitor = VramMonitor::new(Arc::downgrade(&device), "vram".into());
        drop(device);
        assert_eq!(monitor.usage_report(), ResourceUsageReport::default());
    }
}
