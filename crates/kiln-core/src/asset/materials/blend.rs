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

//! Material blend modes and the pipeline blend state they map to.
//!
//! Materials pick a [`BlendMode`] preset; the pipeline layer resolves it
//! to a concrete [`BlendStateDescriptor`] when building render state.

/// A factor in a blend equation, determining how much a source or
/// destination color contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// The factor is `0.0`.
    Zero,
    /// The factor is `1.0`.
    One,
    /// The factor is the source color.
    Src,
    /// The factor is `1.0 - src`.
    OneMinusSrc,
    /// The factor is the source alpha component (`src.a`).
    SrcAlpha,
    /// The factor is `1.0 - src.a`.
    OneMinusSrcAlpha,
    /// The factor is the destination color.
    Dst,
    /// The factor is `1.0 - dst`.
    OneMinusDst,
}

/// The operation used to combine source and destination colors in a blend
/// equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    /// The result is `source + destination`.
    Add,
    /// The result is `source - destination`.
    Subtract,
    /// The result is `destination - source`.
    ReverseSubtract,
    /// The result is `min(source, destination)`.
    Min,
    /// The result is `max(source, destination)`.
    Max,
}

/// Describes a complete blend equation for a single color component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponentDescriptor {
    /// The blend factor for the source color (from the fragment shader).
    pub src_factor: BlendFactor,
    /// The blend factor for the destination color (already in the framebuffer).
    pub dst_factor: BlendFactor,
    /// The operation to combine the source and destination factors.
    pub operation: BlendOperation,
}

impl BlendComponentDescriptor {
    /// Source replaces destination entirely.
    pub const REPLACE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
        operation: BlendOperation::Add,
    };
}

/// Describes the blend state for a single color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendStateDescriptor {
    /// The blend equation for the RGB color components.
    pub color: BlendComponentDescriptor,
    /// The blend equation for the Alpha component.
    pub alpha: BlendComponentDescriptor,
}

/// How a material's output is combined with the framebuffer.
///
/// `Normal` covers both straight and premultiplied alpha depending on the
/// material's texture pipeline; textures uploaded with alpha
/// premultiplication should pair with `Premultiplied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// No blending; source replaces destination.
    #[default]
    Opaque,
    /// Classic straight-alpha transparency.
    Normal,
    /// Straight-alpha transparency over premultiplied source color.
    Premultiplied,
    /// Source adds to destination, scaled by source alpha.
    Additive,
    /// Source darkens destination by its own color.
    Multiply,
    /// Source lightens destination (the inverse of multiply).
    Screen,
}

impl BlendMode {
    /// Resolves the preset to a pipeline blend state. `Opaque` needs no
    /// blend state at all.
    pub fn blend_state(self) -> Option<BlendStateDescriptor> {
        let component = |src, dst| BlendComponentDescriptor {
            src_factor: src,
            dst_factor: dst,
            operation: BlendOperation::Add,
        };
        match self {
            BlendMode::Opaque => None,
            BlendMode::Normal => Some(BlendStateDescriptor {
                color: component(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha),
                alpha: component(BlendFactor::One, BlendFactor::OneMinusSrcAlpha),
            }),
            BlendMode::Premultiplied => Some(BlendStateDescriptor {
                color: component(BlendFactor::One, BlendFactor::OneMinusSrcAlpha),
                alpha: component(BlendFactor::One, BlendFactor::OneMinusSrcAlpha),
            }),
            BlendMode::Additive => Some(BlendStateDescriptor {
                color: component(BlendFactor::SrcAlpha, BlendFactor::One),
                alpha: component(BlendFactor::Zero, BlendFactor::One),
            }),
            BlendMode::Multiply => Some(BlendStateDescriptor {
                color: component(BlendFactor::Dst, BlendFactor::Zero),
                alpha: component(BlendFactor::Zero, BlendFactor::One),
            }),
            BlendMode::Screen => Some(BlendStateDescriptor {
                color: component(BlendFactor::One, BlendFactor::OneMinusSrc),
                alpha: component(BlendFactor::Zero, BlendFactor::One),
            }),
        }
    }

    /// Whether geometry using this mode must be depth-sorted back to front.
    pub fn requires_sorting(self) -> bool {
        self != BlendMode::Opaque
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_has_no_blend_state() {
        assert_eq!(BlendMode::Opaque.blend_state(), None);
        assert!(!BlendMode::Opaque.requires_sorting());
    }

    #[test]
    fn normal_is_straight_alpha_over() {
        let state = BlendMode::Normal.blend_state().unwrap();
        assert_eq!(state.color.src_factor, BlendFactor::SrcAlpha);
        assert_eq!(state.color.dst_factor, BlendFactor::OneMinusSrcAlpha);
        assert_eq!(state.color.operation, BlendOperation::Add);
    }

    #[test]
    fn premultiplied_differs_from_normal_in_source_factor() {
        let normal = BlendMode::Normal.blend_state().unwrap();
        let premul = BlendMode::Premultiplied.blend_state().unwrap();
        assert_ne!(normal.color.src_factor, premul.color.src_factor);
        assert_eq!(premul.color.src_factor, BlendFactor::One);
    }

    #[test]
    fn blended_modes_require_sorting() {
        for mode in [
            BlendMode::Normal,
            BlendMode::Premultiplied,
            BlendMode::Additive,
            BlendMode::Multiply,
            BlendMode::Screen,
        ] {
            assert!(mode.requires_sorting());
            assert!(mode.blend_state().is_some());
        }
    }
}
