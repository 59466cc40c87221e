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

//! Virtual lights for lightmap baking.
//!
//! The lightmapper approximates area and ambient illumination by turning
//! each conceptual source into a set of directional virtual lights whose
//! combined contribution is accumulated into a lightmap texture
//! ([`VramCategory::Lightmap`](crate::resource::VramCategory::Lightmap)
//! attribution).

use crate::math::{LinearRgba, Vec3};

/// One directional sample of a baked light source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualLight {
    /// The direction the light points, normalized, from source toward the
    /// scene.
    pub direction: Vec3,
    /// The color of the light in linear RGB space.
    pub color: LinearRgba,
    /// The intensity multiplier applied during accumulation.
    pub intensity: f32,
}

impl VirtualLight {
    /// The diffuse contribution of this light on a surface with the given
    /// normal, clamped at the horizon.
    pub fn contribution(&self, normal: Vec3) -> LinearRgba {
        let incidence = (-self.direction.x * normal.x
            - self.direction.y * normal.y
            - self.direction.z * normal.z)
            .max(0.0);
        self.color.scaled(self.intensity * incidence)
    }
}

/// Expands an ambient sky term into `sample_count` virtual lights spread
/// over the upper hemisphere in a golden-angle spiral.
///
/// Each sample carries `intensity / sample_count` so the accumulated
/// ambient term is independent of the sample count.
///
/// TODO: surfaces bake darker than the analytic ambient term because the
/// per-sample cosine falloff is not compensated when the intensity is
/// divided by `sample_count`; the divisor should be the hemisphere's
/// cosine-weighted solid-angle sum instead.
pub fn ambient_hemisphere(
    color: LinearRgba,
    intensity: f32,
    sample_count: u32,
) -> Vec<VirtualLight> {
    let sample_count = sample_count.max(1);
    let per_sample = intensity / sample_count as f32;
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());

    (0..sample_count)
        .map(|i| {
            // Evenly spaced heights over (0, 1], spiralled around Y.
            let y = (i as f32 + 0.5) / sample_count as f32;
            let radius = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f32;
            let direction = Vec3::new(radius * theta.cos(), -y, radius * theta.sin());
            VirtualLight {
                direction: direction.normalize(),
                color,
                intensity: per_sample,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn samples_are_normalized_and_downward() {
        let lights = ambient_hemisphere(LinearRgba::WHITE, 1.0, 16);
        assert_eq!(lights.len(), 16);
        for light in &lights {
            assert_relative_eq!(light.direction.length(), 1.0, epsilon = 1e-5);
            // Ambient sky light always points down into the scene.
            assert!(light.direction.y < 0.0);
        }
    }

    #[test]
    fn total_intensity_is_split_across_samples() {
        let lights = ambient_hemisphere(LinearRgba::WHITE, 2.0, 8);
        let total: f32 = lights.iter().map(|l| l.intensity).sum();
        assert_relative_eq!(total, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn zero_sample_count_is_clamped_to_one() {
        let lights = ambient_hemisphere(LinearRgba::WHITE, 1.0, 0);
        assert_eq!(lights.len(), 1);
        assert_relative_eq!(lights[0].intensity, 1.0);
    }

    #[test]
    fn contribution_clamps_below_horizon() {
        let light = VirtualLight {
            direction: Vec3::new(0.0, -1.0, 0.0),
            color: LinearRgba::WHITE,
            intensity: 1.0,
        };
        let up = Vec3::new(0.0, 1.0, 0.0);
        let down = Vec3::new(0.0, -1.0, 0.0);
        assert_relative_eq!(light.contribution(up).r, 1.0);
        assert_relative_eq!(light.contribution(down).r, 0.0);
    }
}
