//! Shared Test Fixtures
//!
//! - [`MockDevice`]: a [`RenderDevice`] that records what it is asked to do
//! - Test renderables: meshes, point lights and directional lights
//! - Scene helpers for building a small lit scene

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use glam::{Mat4, Vec3};
use slotmap::SlotMap;

use umbra::errors::Result;
use umbra::renderer::core::{
    Binding, BufferDesc, BufferId, BufferSlice, CommandList, FrameContext, PipelineId, RenderDevice,
    TextureDesc, TextureId,
};
use umbra::renderer::pipeline::PipelineConfiguration;
use umbra::scene::{
    BlendMode, BoundingBox, Camera, FillMode, LightType, ObjectMask, Renderable, ShadingModel, ShadowSource,
    SharedResource, SortData, VertexLayout,
};

/// Initializes `env_logger` once for the test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Mock Device
// ============================================================================

/// Summary of a compiled pipeline.
#[derive(Debug, Clone)]
pub struct PipelineRecord {
    pub label: String,
    pub color_targets: usize,
    pub has_depth: bool,
    pub multiview_layers: Option<u32>,
    pub primitive: wgpu::PrimitiveState,
    pub resource_count: u32,
}

#[derive(Default)]
pub struct MockDevice {
    pub textures: SlotMap<TextureId, TextureDesc>,
    pub buffers: SlotMap<BufferId, BufferDesc>,
    pub pipelines: SlotMap<PipelineId, PipelineRecord>,
    pub writes: Vec<(BufferId, u64, usize)>,
    pub submitted: Vec<CommandList>,
    pub destroyed_textures: usize,
    pub destroyed_buffers: usize,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// The commands of the most recent submission.
    pub fn last_submission(&self) -> &CommandList {
        self.submitted.last().expect("nothing was submitted")
    }

    pub fn pipeline_by_label(&self, label: &str) -> Option<(PipelineId, &PipelineRecord)> {
        self.pipelines.iter().find(|(_, p)| p.label == label)
    }

    pub fn create_output(&mut self, width: u32, height: u32) -> TextureId {
        self.create_texture(&TextureDesc::render_target(
            "Output",
            width,
            height,
            wgpu::TextureFormat::Bgra8Unorm,
        ))
        .expect("output texture")
    }
}

impl RenderDevice for MockDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        Ok(self.textures.insert(desc.clone()))
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(texture).is_some() {
            self.destroyed_textures += 1;
        }
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId> {
        Ok(self.buffers.insert(desc.clone()))
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(buffer).is_some() {
            self.destroyed_buffers += 1;
        }
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        self.writes.push((buffer, offset, data.len()));
    }

    fn create_render_pipeline(&mut self, config: &PipelineConfiguration) -> Result<PipelineId> {
        Ok(self.pipelines.insert(PipelineRecord {
            label: config.label().to_owned(),
            color_targets: config.color_targets().len(),
            has_depth: config.depth_stencil().is_some(),
            multiview_layers: config.multiview_layers(),
            primitive: *config.primitive(),
            resource_count: config.bindings().resource_count(),
        }))
    }

    fn submit(&mut self, commands: &CommandList) -> Result<()> {
        self.submitted.push(commands.clone());
        Ok(())
    }
}

// ============================================================================
// Masks
// ============================================================================

pub fn lit_opaque_mask() -> ObjectMask {
    ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_shading_model(ShadingModel::DEFAULT_LIT)
        .with_blend_mode(BlendMode::OPAQUE)
        .with_fill_mode(FillMode::SOLID)
}

pub fn unlit_opaque_mask() -> ObjectMask {
    lit_opaque_mask().with_shading_model(ShadingModel::UNLIT)
}

pub fn translucent_mask() -> ObjectMask {
    lit_opaque_mask().with_blend_mode(BlendMode::TRANSLUCENT)
}

pub fn point_light_mask() -> ObjectMask {
    ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_light_type(LightType::POINT)
}

pub fn directional_light_mask() -> ObjectMask {
    ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_light_type(LightType::DIRECTIONAL)
}

// ============================================================================
// Renderables
// ============================================================================

/// Shared resources backed by placeholder buffer bindings.
pub struct TestShared {
    bindings: Vec<Binding>,
}

impl TestShared {
    pub fn new(count: usize) -> Rc<dyn SharedResource> {
        Rc::new(Self {
            bindings: (0..count).map(|i| placeholder_binding(i as u64 * 256)).collect(),
        })
    }

    pub fn with_bindings(bindings: Vec<Binding>) -> Rc<dyn SharedResource> {
        Rc::new(Self { bindings })
    }
}

impl SharedResource for TestShared {
    fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}

pub fn placeholder_binding(offset: u64) -> Binding {
    Binding::Buffer(BufferSlice {
        buffer: BufferId::default(),
        offset,
        size: 128,
    })
}

/// A renderable with a fixed mask that counts its draws.
pub struct TestRenderable {
    pub mask: ObjectMask,
    pub shared: Rc<dyn SharedResource>,
    pub shadow: Option<ShadowSource>,
    pub vertex_count: u32,
    pub draws: Cell<u32>,
}

impl TestRenderable {
    pub fn new(mask: ObjectMask, shared: Rc<dyn SharedResource>) -> Self {
        Self {
            mask,
            shared,
            shadow: None,
            vertex_count: 36,
            draws: Cell::new(0),
        }
    }

    pub fn with_shadow(mut self, shadow_map: TextureId) -> Self {
        self.shadow = Some(ShadowSource {
            direction: Vec3::new(-0.3, -1.0, -0.2).normalize(),
            up: Vec3::Z,
            shadow_map,
        });
        self
    }

    pub fn draw_count(&self) -> u32 {
        self.draws.get()
    }
}

impl Renderable for TestRenderable {
    fn draw(&self, frame: &mut FrameContext<'_>) {
        self.draws.set(self.draws.get() + 1);
        frame.draw(0..self.vertex_count, 0..1);
    }

    fn sort_data(&self) -> SortData {
        SortData {
            mask: self.mask,
            shared: Rc::clone(&self.shared),
        }
    }

    fn per_object_data(&self) -> Binding {
        placeholder_binding(0)
    }

    fn shadow_source(&self) -> Option<ShadowSource> {
        self.shadow
    }
}

/// Wraps a test renderable for registration and keeps a typed handle for
/// inspecting its draw counter.
pub fn renderable(inner: TestRenderable) -> (Rc<TestRenderable>, Rc<dyn Renderable>) {
    let typed = Rc::new(inner);
    let erased: Rc<dyn Renderable> = typed.clone();
    (typed, erased)
}

// ============================================================================
// Scene Helpers
// ============================================================================

/// Unit box centered at `center`.
pub fn unit_box(center: Vec3) -> BoundingBox {
    BoundingBox::from_center_extents(center, Vec3::splat(0.5))
}

/// Camera at `(0, 0, 10)` looking at the origin.
pub fn test_camera() -> Camera {
    Camera::new_perspective(60.0, 16.0 / 9.0, 0.1, 100.0).looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y)
}

pub fn translation(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, y, z))
}
