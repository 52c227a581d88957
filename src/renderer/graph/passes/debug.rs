//! Debug Pass
//!
//! Wireframe overlay for editor geometry (collision shapes, light volumes)
//! on top of the lit image. No lighting, no depth test, no shared bindings.

use crate::errors::Result;
use crate::renderer::core::{RenderDevice, ResourceState};
use crate::renderer::gbuffer::GBufferTarget;
use crate::renderer::graph::context::RenderContext;
use crate::renderer::graph::node::RenderPass;
use crate::renderer::graph::stage::RenderStage;
use crate::renderer::pipeline::{BindingLayout, PipelineCache, PipelineConfiguration, ShaderLibrary};
use crate::renderer::settings::RendererSettings;
use crate::scene::mask::{BlendMode, FillMode, LightType, ObjectMask, ShadingModel, VertexLayout};

use super::common::draw_packets;

pub struct DebugPass {
    cache: PipelineCache,
}

impl DebugPass {
    pub const DEBUG_FILTER: ObjectMask = ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_shading_model(ShadingModel::ALL)
        .with_blend_mode(BlendMode::DEBUG)
        .with_fill_mode(FillMode::ALL)
        .with_light_type(LightType::NON_DIRECTIONAL);

    pub fn new(
        device: &mut dyn RenderDevice,
        shaders: &mut ShaderLibrary,
        settings: &RendererSettings,
    ) -> Result<Self> {
        let config = PipelineConfiguration::builder("Debug Wireframe")
            .vertex(shaders.stage("debug", "vs_main")?)
            .fragment(shaders.stage("debug", "fs_main")?)
            .vertex_layout(VertexLayout::PNTBT)
            .polygon_mode(wgpu::PolygonMode::Line)
            .cull_mode(None)
            .color_target(settings.gbuffer_format, None)
            .bindings(BindingLayout::builder().constants(2).build())
            .per_object(|frame, layout, binding| frame.bind(layout.constant_slot(1), binding))
            .build()?;

        let mut cache = PipelineCache::new();
        cache.insert(device, Self::DEBUG_FILTER, config)?;
        Ok(Self { cache })
    }
}

impl RenderPass for DebugPass {
    fn name(&self) -> &str {
        "DebugPass"
    }

    fn stage(&self) -> RenderStage {
        RenderStage::Debug
    }

    fn draw(&self, ctx: &mut RenderContext<'_>) {
        let packets = ctx
            .visibility
            .extract_from_frustum(Self::DEBUG_FILTER, ctx.view.camera.view_projection());
        if packets.is_empty() {
            return;
        }

        let gbuffer = ctx.gbuffer;
        let frame = &mut ctx.frame;
        gbuffer.transition(frame, GBufferTarget::LightAccumulation, ResourceState::RenderTarget);
        frame.set_render_targets(&[gbuffer.target(GBufferTarget::LightAccumulation)], None);
        frame.set_viewport(ctx.view.viewport);

        let view_constants = ctx.view.view_constants;
        draw_packets(frame, &self.cache, &packets, "DebugPass", &|frame, layout| {
            frame.bind(layout.constant_slot(0), view_constants);
        });
    }
}
