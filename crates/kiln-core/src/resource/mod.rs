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

//! GPU resource front ends: the texture resource, its upload planner,
//! image-like sources, and shared VRAM accounting.

pub mod device;
pub mod source;
pub mod texture;
pub mod upload;
pub mod vram;

pub use device::DeviceShared;
pub use source::{ImageSource, SourceImage};
pub use texture::Texture;
pub use upload::{plan_upload, UploadPlan, UploadRegion};
pub use vram::{VramCategory, VramReport, VramTracker};
