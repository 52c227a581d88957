//! G-Buffer
//!
//! Screen-sized targets written by the geometry pass and read by lighting:
//!
//! ```text
//!                        R          G          B          A
//! LightAccumulation      R          G          B          1
//! Diffuse                R          G          B          1
//! Material            metallic   specular   roughness   emissive
//! Normal                 X          Y          Z       view depth
//!
//! Depth/Stencil          D24 + S8
//! ```
//!
//! The G-buffer only owns texture ids. Views for writing and sampling are
//! resolved by the backend when the recorded commands are replayed.

use crate::errors::Result;
use crate::renderer::core::{
    DepthTarget, FrameContext, RenderDevice, ResourceState, ResourceStateTracker, TextureDesc,
    TextureId,
};

/// One of the four color targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GBufferTarget {
    LightAccumulation = 0,
    Diffuse = 1,
    Material = 2,
    Normal = 3,
}

impl GBufferTarget {
    pub const COUNT: usize = 4;

    pub const ALL: [Self; Self::COUNT] = [
        Self::LightAccumulation,
        Self::Diffuse,
        Self::Material,
        Self::Normal,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LightAccumulation => "GBuffer LightAccumulation",
            Self::Diffuse => "GBuffer Diffuse",
            Self::Material => "GBuffer Material",
            Self::Normal => "GBuffer Normal",
        }
    }
}

pub struct GBuffer {
    targets: [TextureId; GBufferTarget::COUNT],
    depth: TextureId,
    width: u32,
    height: u32,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
}

impl GBuffer {
    pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const CLEAR_DEPTH: f32 = 1.0;
    pub const CLEAR_STENCIL: u32 = 1;

    /// Allocates all targets. Zero dimensions are raised to 1.
    pub fn new(
        device: &mut dyn RenderDevice,
        states: &mut ResourceStateTracker,
        width: u32,
        height: u32,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let (width, height) = (width.max(1), height.max(1));
        let (targets, depth) = Self::allocate(device, states, width, height, color_format, depth_format)?;
        Ok(Self {
            targets,
            depth,
            width,
            height,
            color_format,
            depth_format,
        })
    }

    fn allocate(
        device: &mut dyn RenderDevice,
        states: &mut ResourceStateTracker,
        width: u32,
        height: u32,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Result<([TextureId; GBufferTarget::COUNT], TextureId)> {
        let mut targets = [TextureId::default(); GBufferTarget::COUNT];
        for (slot, target) in targets.iter_mut().zip(GBufferTarget::ALL) {
            *slot = device.create_texture(&TextureDesc::render_target(target.label(), width, height, color_format))?;
            states.register(*slot, ResourceState::ShaderRead);
        }
        let depth = device.create_texture(&TextureDesc::render_target("GBuffer Depth", width, height, depth_format))?;
        states.register(depth, ResourceState::DepthWrite);
        Ok((targets, depth))
    }

    /// Reallocates every target at the new size. Zero-sized and unchanged
    /// requests are ignored; returns whether anything was reallocated.
    pub fn resize(
        &mut self,
        device: &mut dyn RenderDevice,
        states: &mut ResourceStateTracker,
        width: u32,
        height: u32,
    ) -> Result<bool> {
        if width == 0 || height == 0 {
            log::debug!("GBuffer: ignoring resize to {width}x{height}");
            return Ok(false);
        }
        if (width, height) == (self.width, self.height) {
            return Ok(false);
        }

        let (targets, depth) = Self::allocate(device, states, width, height, self.color_format, self.depth_format)?;
        self.release(device, states);
        self.targets = targets;
        self.depth = depth;
        self.width = width;
        self.height = height;
        log::info!("GBuffer: resized to {width}x{height}");
        Ok(true)
    }

    /// Destroys every target. The ids must not be used afterwards.
    pub fn release(&self, device: &mut dyn RenderDevice, states: &mut ResourceStateTracker) {
        for &texture in self.targets.iter().chain(std::iter::once(&self.depth)) {
            states.forget(texture);
            device.destroy_texture(texture);
        }
    }

    // ─── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn target(&self, target: GBufferTarget) -> TextureId {
        self.targets[target.index()]
    }

    #[inline]
    #[must_use]
    pub fn targets(&self) -> &[TextureId; GBufferTarget::COUNT] {
        &self.targets
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> TextureId {
        self.depth
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    #[inline]
    #[must_use]
    pub fn depth_format(&self) -> wgpu::TextureFormat {
        self.depth_format
    }

    // ─── Frame Operations ──────────────────────────────────────────────────

    pub fn transition(&self, frame: &mut FrameContext<'_>, target: GBufferTarget, state: ResourceState) {
        frame.transition(self.target(target), state);
    }

    pub fn transition_depth(&self, frame: &mut FrameContext<'_>, state: ResourceState) {
        frame.transition(self.depth, state);
    }

    /// Moves all four color targets to `state`.
    pub fn transition_all(&self, frame: &mut FrameContext<'_>, state: ResourceState) {
        for &texture in &self.targets {
            frame.transition(texture, state);
        }
    }

    /// Binds the four color targets plus writable depth.
    pub fn bind_all_as_targets(&self, frame: &mut FrameContext<'_>) {
        frame.set_render_targets(&self.targets, Some(DepthTarget::writable(self.depth)));
    }

    pub fn clear_all(&self, frame: &mut FrameContext<'_>) {
        for &texture in &self.targets {
            frame.clear_color(texture, Self::CLEAR_COLOR);
        }
        frame.clear_depth_stencil(self.depth, Some(Self::CLEAR_DEPTH), Some(Self::CLEAR_STENCIL));
    }

    pub fn clear_stencil(&self, frame: &mut FrameContext<'_>, value: u32) {
        frame.clear_depth_stencil(self.depth, None, Some(value));
    }
}
