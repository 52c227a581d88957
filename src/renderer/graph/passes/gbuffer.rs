//! G-Buffer Pass
//!
//! Fills the four G-buffer targets and depth with deferred-lit opaque
//! geometry, solid and wireframe.
//!
//! | Slot | Resource |
//! |------|----------|
//! | constant 0 | view constants |
//! | constant 1 | object constants |
//! | readable 0 | material data (solid only) |

use crate::errors::Result;
use crate::renderer::core::{RenderDevice, ResourceState};
use crate::renderer::gbuffer::GBufferTarget;
use crate::renderer::graph::context::RenderContext;
use crate::renderer::graph::node::RenderPass;
use crate::renderer::graph::stage::RenderStage;
use crate::renderer::pipeline::{
    BindingLayout, PipelineCache, PipelineConfiguration, PipelineConfigurationBuilder, ReadableKind,
    ShaderLibrary,
};
use crate::renderer::settings::RendererSettings;
use crate::scene::mask::{BlendMode, FillMode, LightType, ObjectMask, ShadingModel, VertexLayout};

use super::common::{bind_shared_readables, depth_state, draw_packets};

pub struct GBufferPass {
    cache: PipelineCache,
}

impl GBufferPass {
    pub const LIT_SOLID_FILTER: ObjectMask = ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_shading_model(ShadingModel::DEFAULT_LIT)
        .with_blend_mode(BlendMode::OPAQUE)
        .with_fill_mode(FillMode::SOLID);

    pub const WIRE_FILTER: ObjectMask = ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_shading_model(ShadingModel::DEFAULT_LIT)
        .with_blend_mode(BlendMode::OPAQUE)
        .with_fill_mode(FillMode::WIRE)
        .with_light_type(LightType::ALL);

    pub fn new(
        device: &mut dyn RenderDevice,
        shaders: &mut ShaderLibrary,
        settings: &RendererSettings,
    ) -> Result<Self> {
        let mut cache = PipelineCache::new();

        let solid = Self::base_config("GBuffer Solid", shaders, settings)?
            .fragment(shaders.stage("gbuffer", "fs_main")?)
            .cull_mode(Some(wgpu::Face::Back))
            .bindings(
                BindingLayout::builder()
                    .constants(2)
                    .readable(ReadableKind::StorageBuffer)
                    .build(),
            )
            .shared(|frame, layout, shared| bind_shared_readables(frame, layout, shared, 0));
        cache.insert(device, Self::LIT_SOLID_FILTER, solid.build()?)?;

        // Wire entries include light volumes, which carry no material data.
        let wire = Self::base_config("GBuffer Wire", shaders, settings)?
            .fragment(shaders.stage("gbuffer", "fs_wire")?)
            .cull_mode(None)
            .polygon_mode(wgpu::PolygonMode::Line)
            .bindings(BindingLayout::builder().constants(2).build());
        cache.insert(device, Self::WIRE_FILTER, wire.build()?)?;

        Ok(Self { cache })
    }

    fn base_config(
        label: &'static str,
        shaders: &mut ShaderLibrary,
        settings: &RendererSettings,
    ) -> Result<PipelineConfigurationBuilder> {
        let mut builder = PipelineConfiguration::builder(label)
            .vertex(shaders.stage("gbuffer", "vs_main")?)
            .vertex_layout(VertexLayout::PNTBT)
            .depth_stencil(depth_state(settings.depth_format, true, wgpu::CompareFunction::Less))
            .per_object(|frame, layout, binding| frame.bind(layout.constant_slot(1), binding));
        for _ in GBufferTarget::ALL {
            builder = builder.color_target(settings.gbuffer_format, None);
        }
        Ok(builder)
    }
}

impl RenderPass for GBufferPass {
    fn name(&self) -> &str {
        "GBufferPass"
    }

    fn stage(&self) -> RenderStage {
        RenderStage::Geometry
    }

    fn draw(&self, ctx: &mut RenderContext<'_>) {
        let gbuffer = ctx.gbuffer;
        let frame = &mut ctx.frame;

        gbuffer.transition_all(frame, ResourceState::RenderTarget);
        gbuffer.transition_depth(frame, ResourceState::DepthWrite);
        gbuffer.bind_all_as_targets(frame);
        gbuffer.clear_all(frame);
        frame.set_viewport(ctx.view.viewport);

        let candidates = ctx.visibility.frustum_culling(ctx.view.camera.view_projection());
        let mut packets = ctx.visibility.extract(Self::LIT_SOLID_FILTER, &candidates);
        packets.expand(&ctx.visibility.extract(Self::WIRE_FILTER, &candidates));

        let view_constants = ctx.view.view_constants;
        draw_packets(frame, &self.cache, &packets, "GBufferPass", &|frame, layout| {
            frame.bind(layout.constant_slot(0), view_constants);
        });
    }
}
