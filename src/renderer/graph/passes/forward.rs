//! Forward Pass
//!
//! Draws what the deferred path cannot light straight into the
//! accumulation target: unlit opaque geometry and translucent or masked
//! surfaces. Depth comes from the G-buffer and is tested, never written.

use crate::errors::Result;
use crate::renderer::core::{DepthTarget, RenderDevice, ResourceState};
use crate::renderer::gbuffer::GBufferTarget;
use crate::renderer::graph::context::RenderContext;
use crate::renderer::graph::node::RenderPass;
use crate::renderer::graph::stage::RenderStage;
use crate::renderer::pipeline::{
    BindingLayout, PipelineCache, PipelineConfiguration, ReadableKind, ShaderLibrary,
};
use crate::renderer::settings::RendererSettings;
use crate::scene::mask::{BlendMode, FillMode, ObjectMask, ShadingModel, VertexLayout};

use super::common::{bind_shared_readables, depth_state, draw_packets};

const TRANSLUCENT_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::OneMinusDstAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

pub struct ForwardPass {
    cache: PipelineCache,
}

impl ForwardPass {
    pub const UNLIT_SOLID_FILTER: ObjectMask = ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_shading_model(ShadingModel::UNLIT)
        .with_blend_mode(BlendMode::OPAQUE)
        .with_fill_mode(FillMode::SOLID);

    pub const TRANSLUCENT_FILTER: ObjectMask = ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_shading_model(ShadingModel::ALL)
        .with_blend_mode(BlendMode::TRANSLUCENT.union(BlendMode::MASKED))
        .with_fill_mode(FillMode::ALL);

    pub fn new(
        device: &mut dyn RenderDevice,
        shaders: &mut ShaderLibrary,
        settings: &RendererSettings,
    ) -> Result<Self> {
        let mut cache = PipelineCache::new();
        for (filter, blend, label) in [
            (Self::UNLIT_SOLID_FILTER, None, "Forward Unlit"),
            (Self::TRANSLUCENT_FILTER, Some(TRANSLUCENT_BLEND), "Forward Translucent"),
        ] {
            let config = PipelineConfiguration::builder(label)
                .vertex(shaders.stage("forward", "vs_main")?)
                .fragment(shaders.stage("forward", "fs_main")?)
                .vertex_layout(VertexLayout::PNTBT)
                .cull_mode(Some(wgpu::Face::Back))
                .depth_stencil(depth_state(settings.depth_format, false, wgpu::CompareFunction::LessEqual))
                .color_target(settings.gbuffer_format, blend)
                .bindings(
                    BindingLayout::builder()
                        .constants(2)
                        .readable(ReadableKind::StorageBuffer)
                        .build(),
                )
                .per_object(|frame, layout, binding| frame.bind(layout.constant_slot(1), binding))
                .shared(|frame, layout, shared| bind_shared_readables(frame, layout, shared, 0))
                .build()?;
            cache.insert(device, filter, config)?;
        }
        Ok(Self { cache })
    }
}

impl RenderPass for ForwardPass {
    fn name(&self) -> &str {
        "ForwardPass"
    }

    fn stage(&self) -> RenderStage {
        RenderStage::Forward
    }

    fn draw(&self, ctx: &mut RenderContext<'_>) {
        let gbuffer = ctx.gbuffer;
        let frame = &mut ctx.frame;

        gbuffer.transition(frame, GBufferTarget::LightAccumulation, ResourceState::RenderTarget);
        gbuffer.transition_depth(frame, ResourceState::DepthRead);
        frame.set_render_targets(
            &[gbuffer.target(GBufferTarget::LightAccumulation)],
            Some(DepthTarget::read_only(gbuffer.depth())),
        );
        frame.set_viewport(ctx.view.viewport);

        let candidates = ctx.visibility.frustum_culling(ctx.view.camera.view_projection());
        let mut packets = ctx.visibility.extract(Self::UNLIT_SOLID_FILTER, &candidates);
        packets.expand(&ctx.visibility.extract(Self::TRANSLUCENT_FILTER, &candidates));

        let view_constants = ctx.view.view_constants;
        draw_packets(frame, &self.cache, &packets, "ForwardPass", &|frame, layout| {
            frame.bind(layout.constant_slot(0), view_constants);
        });
    }
}
