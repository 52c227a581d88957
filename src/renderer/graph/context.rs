//! Render Context
//!
//! [`RenderContext`] is what every pass receives in `draw`:
//!
//! | Field | Access | Content |
//! |-------|--------|---------|
//! | `frame` | mutable | command recording, state tracking, transient uploads |
//! | `visibility` | shared | the spatial index, ticked for this frame |
//! | `gbuffer` | shared | G-buffer target ids |
//! | `view` | shared | active camera plus its uploaded constants |
//! | `output` | shared | presentable target of this frame |
//!
//! Passes hand data to later passes through the shadow blackboard: the
//! shadow pass publishes a [`ShadowViewData`] per directional light, keyed by
//! the light's handle, and the lighting pass looks it up.

use bytemuck::{Pod, Zeroable};
use rustc_hash::FxHashMap;

use crate::renderer::core::{Binding, FrameContext, TextureId, Viewport};
use crate::renderer::gbuffer::GBuffer;
use crate::scene::camera::Camera;
use crate::scene::visibility::{RenderableHandle, SpatialIndex};

// ─── GPU Constant Layouts ─────────────────────────────────────────────────────

/// Per-view constants (`ViewConstants` in the shaders).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewConstants {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_projection: [[f32; 4]; 4],
    pub inverse_view: [[f32; 4]; 4],
    pub inverse_projection: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// x: near, y: far.
    pub clip: [f32; 4],
}

impl ViewConstants {
    #[must_use]
    pub fn from_camera(camera: &Camera) -> Self {
        let projection = camera.projection_matrix();
        Self {
            view: camera.view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            view_projection: (projection * camera.view).to_cols_array_2d(),
            inverse_view: camera.view.inverse().to_cols_array_2d(),
            inverse_projection: projection.inverse().to_cols_array_2d(),
            camera_position: camera.position().extend(1.0).to_array(),
            clip: [camera.near, camera.far, 0.0, 0.0],
        }
    }
}

/// Screen dimensions and output parameters (`ScreenConstants`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ScreenConstants {
    pub size: [f32; 2],
    pub inv_size: [f32; 2],
    pub gamma: f32,
    pub padding: [f32; 3],
}

impl ScreenConstants {
    #[must_use]
    pub fn new(width: u32, height: u32, gamma: f32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        Self {
            size: [w, h],
            inv_size: [1.0 / w, 1.0 / h],
            gamma,
            padding: [0.0; 3],
        }
    }
}

// ─── View & Blackboard ────────────────────────────────────────────────────────

/// The camera being rendered and its per-frame bindings.
#[derive(Debug, Clone)]
pub struct RenderView {
    pub camera: Camera,
    pub view_constants: Binding,
    pub screen_constants: Binding,
    pub viewport: Viewport,
}

/// What the shadow pass produced for one directional light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowViewData {
    /// Storage buffer of `CascadeGpuData`, one entry per cascade.
    pub cascades: Binding,
    /// Depth array, left in `ShaderRead`.
    pub shadow_map: TextureId,
    pub cascade_count: u32,
}

pub struct RenderContext<'a> {
    pub frame: FrameContext<'a>,
    pub visibility: &'a SpatialIndex,
    pub gbuffer: &'a GBuffer,
    pub view: RenderView,
    pub output: TextureId,
    shadows: FxHashMap<RenderableHandle, ShadowViewData>,
}

impl<'a> RenderContext<'a> {
    #[must_use]
    pub fn new(
        frame: FrameContext<'a>,
        visibility: &'a SpatialIndex,
        gbuffer: &'a GBuffer,
        view: RenderView,
        output: TextureId,
    ) -> Self {
        Self {
            frame,
            visibility,
            gbuffer,
            view,
            output,
            shadows: FxHashMap::default(),
        }
    }

    /// Publishes shadow data for `light`, replacing earlier data.
    pub fn publish_shadow(&mut self, light: RenderableHandle, data: ShadowViewData) {
        self.shadows.insert(light, data);
    }

    #[must_use]
    pub fn shadow(&self, light: RenderableHandle) -> Option<&ShadowViewData> {
        self.shadows.get(&light)
    }

    #[inline]
    #[must_use]
    pub fn shadow_count(&self) -> usize {
        self.shadows.len()
    }

    /// Ends the graph run and returns the frame for submission.
    #[must_use]
    pub fn into_frame(self) -> FrameContext<'a> {
        self.frame
    }
}
