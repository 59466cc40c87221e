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

//! Headless wgpu bring-up: instance, adapter, logical device, and queue.

use anyhow::{anyhow, Result};
use kiln_core::resource::DeviceShared;
use std::sync::Arc;
use wgpu::Features;

/// Holds the core wgpu state objects shared by every texture backend
/// created on this device.
#[derive(Debug)]
pub struct WgpuContext {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    shared: Arc<DeviceShared>,
}

impl WgpuContext {
    /// Initializes a headless graphics context, blocking on the async
    /// adapter and device requests.
    ///
    /// Optional capabilities (block-compressed texture support, filterable
    /// 32-bit float textures) are enabled when the adapter offers them;
    /// format negotiation later rejects formats whose feature is absent.
    pub fn new() -> Result<Self> {
        log::info!("Initializing wgpu context...");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .map_err(|e| anyhow!("No suitable graphics adapter found: {e}"))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let optional_features =
            Features::TEXTURE_COMPRESSION_BC | Features::FLOAT32_FILTERABLE;
        let features_to_enable = adapter.features() & optional_features;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Kiln Logical Device"),
            required_features: features_to_enable,
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .map_err(|e| anyhow!("Failed to create logical device: {e}"))?;

        device.on_uncaptured_error(Box::new(|e| {
            log::error!("wgpu uncaptured error: {e:?}");
        }));

        let limits = device.limits();
        log::info!("Active device features: {:?}", device.features());
        log::debug!("Device limits: {limits:?}");

        let shared = Arc::new(DeviceShared::new(limits.max_texture_dimension_2d));

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            shared,
        })
    }

    /// The logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The adapter this device was created from.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// The features the logical device was created with.
    pub fn features(&self) -> Features {
        self.device.features()
    }

    /// The shared per-device record handed to every texture.
    pub fn shared(&self) -> &Arc<DeviceShared> {
        &self.shared
    }
}
