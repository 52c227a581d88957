//! Renderer Settings
//!
//! Configuration consumed by [`RenderSystem::new`] to size frame resources,
//! configure visibility queries and tune the shadow and post-process passes.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use umbra::renderer::settings::{RendererSettings, ShadowSettings, CascadeSplit};
//!
//! // Defaults: 3 frames in flight, 4 linear cascades, gamma 2.2
//! let settings = RendererSettings::default();
//!
//! // Practical cascade splits with a larger shadow map
//! let settings = RendererSettings {
//!     shadow: ShadowSettings {
//!         split: CascadeSplit::Practical { lambda: 0.75 },
//!         map_size: 4096,
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! ```
//!
//! The plain-data sub-structs derive `serde` so hosts can load them from a
//! config file.
//!
//! [`RenderSystem::new`]: crate::renderer::RenderSystem::new

use serde::{Deserialize, Serialize};

use crate::renderer::graph::shadow_utils::MAX_CASCADES;

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Tuning for the spatial index and its frustum queries.
///
/// | Field               | Description                                   | Default |
/// |---------------------|-----------------------------------------------|---------|
/// | `culling_epsilon`   | Slack added to every frustum plane (units)    | `0.1`   |
/// | `max_leaf_elements` | Leaf capacity of the bounding-volume tree     | `20`    |
/// | `max_depth`         | Maximum tree depth                            | `10`    |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilitySettings {
    /// Boxes within this distance outside a plane still count as visible.
    pub culling_epsilon: f32,
    /// A node holding at most this many boxes is not split further.
    pub max_leaf_elements: usize,
    /// Nodes at this depth become leaves regardless of their size.
    pub max_depth: u32,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            culling_epsilon: 0.1,
            max_leaf_elements: 20,
            max_depth: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Shadows
// ---------------------------------------------------------------------------

/// How the camera depth range is divided between cascades.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum CascadeSplit {
    /// Equal fractions of `[near, far]`.
    #[default]
    Linear,
    /// Blend between uniform (`0.0`) and logarithmic (`1.0`) splits.
    Practical {
        /// Blend factor in `[0, 1]`.
        lambda: f32,
    },
}

/// Directional-light cascaded shadow configuration.
///
/// | Field              | Description                                | Default  |
/// |--------------------|--------------------------------------------|----------|
/// | `cascade_count`    | Cascades per directional light (max 4)     | `4`      |
/// | `map_size`         | Shadow map width/height per cascade layer  | `2048`   |
/// | `depth_multiplier` | Light-space z padding factor               | `5.0`    |
/// | `split`            | Cascade split scheme                       | `Linear` |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    pub cascade_count: u32,
    pub map_size: u32,
    pub depth_multiplier: f32,
    pub split: CascadeSplit,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            cascade_count: MAX_CASCADES,
            map_size: 2048,
            depth_multiplier: 5.0,
            split: CascadeSplit::Linear,
        }
    }
}

impl ShadowSettings {
    /// Cascade count clamped to `1..=MAX_CASCADES`.
    #[inline]
    #[must_use]
    pub fn effective_cascade_count(&self) -> u32 {
        self.cascade_count.clamp(1, MAX_CASCADES)
    }
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

/// Final full-screen pass configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessSettings {
    /// Display gamma applied when writing the presentable target.
    pub gamma: f32,
}

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self { gamma: 2.2 }
    }
}

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

/// Global configuration for the render system.
///
/// # Fields
///
/// | Field              | Description                                   | Default               |
/// |--------------------|-----------------------------------------------|-----------------------|
/// | `frames_in_flight` | Keep-alive window for transient allocations   | `3`                   |
/// | `visibility`       | Spatial index tuning                          | see above             |
/// | `shadow`           | Cascaded shadow configuration                 | see above             |
/// | `post_process`     | Gamma correction                              | `2.2`                 |
/// | `gbuffer_format`   | Format of every G-buffer color target         | `Rgba16Float`         |
/// | `depth_format`     | G-buffer depth/stencil format                 | `Depth24PlusStencil8` |
/// | `shadow_format`    | Shadow map depth format                       | `Depth32Float`        |
/// | `output_format`    | Presentable target format                     | `Bgra8Unorm`          |
#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub frames_in_flight: u32,
    pub visibility: VisibilitySettings,
    pub shadow: ShadowSettings,
    pub post_process: PostProcessSettings,
    pub gbuffer_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    pub shadow_format: wgpu::TextureFormat,
    pub output_format: wgpu::TextureFormat,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            frames_in_flight: 3,
            visibility: VisibilitySettings::default(),
            shadow: ShadowSettings::default(),
            post_process: PostProcessSettings::default(),
            gbuffer_format: wgpu::TextureFormat::Rgba16Float,
            depth_format: wgpu::TextureFormat::Depth24PlusStencil8,
            shadow_format: wgpu::TextureFormat::Depth32Float,
            output_format: wgpu::TextureFormat::Bgra8Unorm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_count_is_clamped() {
        let shadow = ShadowSettings {
            cascade_count: 9,
            ..Default::default()
        };
        assert_eq!(shadow.effective_cascade_count(), MAX_CASCADES);

        let shadow = ShadowSettings {
            cascade_count: 0,
            ..Default::default()
        };
        assert_eq!(shadow.effective_cascade_count(), 1);
    }
}
