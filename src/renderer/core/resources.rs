//! GPU Resource Handles and Descriptors
//!
//! Backend-agnostic ids and descriptors shared by the render core and every
//! [`RenderDevice`] implementation. Ids are generation-checked slotmap keys:
//! an id that outlives its resource never resolves to a newer one.
//!
//! [`RenderDevice`]: super::device::RenderDevice

use std::borrow::Cow;

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a device texture (or an imported external view).
    pub struct TextureId;
    /// Handle to a device buffer.
    pub struct BufferId;
    /// Handle to a compiled render pipeline.
    pub struct PipelineId;
}

/// Descriptor for a 2D (array) texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub label: Cow<'static, str>,
    pub width: u32,
    pub height: u32,
    /// Array layers. Values above 1 create a 2D array texture.
    pub layers: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

impl TextureDesc {
    /// Render-target texture that is also sampled by later passes.
    #[must_use]
    pub fn render_target(
        label: impl Into<Cow<'static, str>>,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            layers: 1,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        }
    }

    #[must_use]
    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_depth(&self) -> bool {
        self.format.is_depth_stencil_format()
    }
}

/// Descriptor for a device buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferDesc {
    pub label: Cow<'static, str>,
    pub size: u64,
    pub usage: wgpu::BufferUsages,
}

/// A byte range inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferSlice {
    pub buffer: BufferId,
    pub offset: u64,
    pub size: u64,
}

/// A resource bound at one binding-table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    /// Uniform or storage buffer range.
    Buffer(BufferSlice),
    /// Sampled texture. Depth/stencil textures bind their depth aspect.
    Texture(TextureId),
}

impl Binding {
    #[inline]
    #[must_use]
    pub fn texture(&self) -> Option<TextureId> {
        match self {
            Self::Texture(id) => Some(*id),
            Self::Buffer(_) => None,
        }
    }
}

/// Usage state of a texture between passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceState {
    #[default]
    Undefined,
    RenderTarget,
    DepthWrite,
    DepthRead,
    ShaderRead,
    Present,
}

/// Pixel rectangle plus depth range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering a `width` x `height` target.
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Depth/stencil attachment for a set of render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthTarget {
    pub texture: TextureId,
    /// The bound pipelines only test depth; a `DepthRead` state is accepted.
    pub read_only: bool,
}

impl DepthTarget {
    #[must_use]
    pub fn writable(texture: TextureId) -> Self {
        Self {
            texture,
            read_only: false,
        }
    }

    #[must_use]
    pub fn read_only(texture: TextureId) -> Self {
        Self {
            texture,
            read_only: true,
        }
    }
}
