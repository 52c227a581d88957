//! Light Accumulation Pass
//!
//! Adds the contribution of every light to the accumulation target, reading
//! the G-buffer.
//!
//! Point lights are drawn as volumes with a two-step stencil test:
//!
//! ```text
//! clear stencil to 1
//! mark:  front faces, no color writes, depth Greater, stencil Always,
//!        DecrementClamp on pass
//!        (front faces behind the scene clear the stencil to 0)
//! shade: back faces, depth GreaterEqual, stencil Equal 1, additive blend
//!        (only pixels whose surface lies inside the volume are lit)
//! ```
//!
//! Directional lights affect every pixel and are drawn as one full-screen
//! triangle, with the cascade data and shadow map published by the shadow
//! pass.
//!
//! | Slot | Resource |
//! |------|----------|
//! | constant 0..4 | view, object, screen, light |
//! | readable 0..3 | diffuse, material, normal (normal.w = view depth) |
//! | readable 3..5 | cascades, shadow map (directional only) |

use crate::errors::Result;
use crate::renderer::core::{Binding, DepthTarget, FrameContext, RenderDevice, ResourceState};
use crate::renderer::gbuffer::{GBuffer, GBufferTarget};
use crate::renderer::graph::context::{RenderContext, RenderView};
use crate::renderer::graph::node::RenderPass;
use crate::renderer::graph::stage::RenderStage;
use crate::renderer::pipeline::{
    BindingLayout, BindingLayoutBuilder, CachedPipeline, PipelineCache, PipelineConfiguration,
    ReadableKind, ShaderLibrary, StaticSampler,
};
use crate::renderer::settings::RendererSettings;
use crate::scene::mask::{BlendMode, FillMode, LightType, ObjectMask, VertexLayout};
use crate::scene::renderable::SharedResource;
use crate::scene::visibility::{DrawItem, DrawPackets};

use super::common::{depth_state, stencil_state};

const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Stencil value a pixel keeps when it lies inside a light volume.
const INSIDE_VOLUME: u32 = 1;

fn light_bindings() -> BindingLayoutBuilder {
    BindingLayout::builder()
        .constants(4)
        .readable(ReadableKind::TEXTURE_2D)
        .readable(ReadableKind::TEXTURE_2D)
        .readable(ReadableKind::TEXTURE_2D)
}

fn bind_object(frame: &mut FrameContext<'_>, layout: &BindingLayout, binding: Binding) {
    frame.bind(layout.constant_slot(1), binding);
}

fn bind_light_data(frame: &mut FrameContext<'_>, layout: &BindingLayout, shared: &dyn SharedResource) {
    if let Some(binding) = shared.bindings().first() {
        frame.bind(layout.constant_slot(3), *binding);
    }
}

pub struct LightPass {
    /// Shade pipelines for point and directional lights.
    shade: PipelineCache,
    /// Stencil mark pipelines for point lights.
    mark: PipelineCache,
}

impl LightPass {
    pub const POINT_FILTER: ObjectMask = ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_light_type(LightType::POINT)
        .with_blend_mode(BlendMode::OPAQUE)
        .with_fill_mode(FillMode::ALL);

    pub const DIRECTIONAL_FILTER: ObjectMask = ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_light_type(LightType::DIRECTIONAL)
        .with_blend_mode(BlendMode::OPAQUE)
        .with_fill_mode(FillMode::ALL);

    pub fn new(
        device: &mut dyn RenderDevice,
        shaders: &mut ShaderLibrary,
        settings: &RendererSettings,
    ) -> Result<Self> {
        let mark = PipelineConfiguration::builder("Light Volume Mark")
            .vertex(shaders.stage("light_point", "vs_main")?)
            .fragment(shaders.stage("light_point", "fs_mark")?)
            .vertex_layout(VertexLayout::PNTBT)
            .cull_mode(Some(wgpu::Face::Back))
            .depth_stencil(wgpu::DepthStencilState {
                stencil: stencil_state(wgpu::CompareFunction::Always, wgpu::StencilOperation::DecrementClamp),
                ..depth_state(settings.depth_format, false, wgpu::CompareFunction::Greater)
            })
            // Stencil only; the accumulation target stays attached but untouched.
            .color_target_with_mask(settings.gbuffer_format, None, wgpu::ColorWrites::empty())
            .bindings(light_bindings().build())
            .per_object(bind_object)
            .shared(bind_light_data)
            .build()?;

        let point = PipelineConfiguration::builder("Light Volume Shade")
            .vertex(shaders.stage("light_point", "vs_main")?)
            .fragment(shaders.stage("light_point", "fs_main")?)
            .vertex_layout(VertexLayout::PNTBT)
            .cull_mode(Some(wgpu::Face::Front))
            .depth_stencil(wgpu::DepthStencilState {
                stencil: stencil_state(wgpu::CompareFunction::Equal, wgpu::StencilOperation::Keep),
                ..depth_state(settings.depth_format, false, wgpu::CompareFunction::GreaterEqual)
            })
            .color_target(settings.gbuffer_format, Some(ADDITIVE))
            .bindings(light_bindings().build())
            .per_object(bind_object)
            .shared(bind_light_data)
            .build()?;

        let directional = PipelineConfiguration::builder("Light Directional Shade")
            .vertex(shaders.stage("light_directional", "vs_fullscreen")?)
            .fragment(shaders.stage("light_directional", "fs_main")?)
            .cull_mode(None)
            .depth_stencil(depth_state(settings.depth_format, false, wgpu::CompareFunction::Always))
            .color_target(settings.gbuffer_format, Some(ADDITIVE))
            .bindings(
                light_bindings()
                    .readable(ReadableKind::StorageBuffer)
                    .readable(ReadableKind::DEPTH_ARRAY)
                    .sampler(StaticSampler::ShadowComparison)
                    .build(),
            )
            .per_object(bind_object)
            .shared(bind_light_data)
            .build()?;

        let mut mark_cache = PipelineCache::new();
        mark_cache.insert(device, Self::POINT_FILTER, mark)?;

        let mut shade = PipelineCache::new();
        shade.insert(device, Self::POINT_FILTER, point)?;
        shade.insert(device, Self::DIRECTIONAL_FILTER, directional)?;

        Ok(Self {
            shade,
            mark: mark_cache,
        })
    }

    fn bind_inputs(frame: &mut FrameContext<'_>, layout: &BindingLayout, view: &RenderView, gbuffer: &GBuffer) {
        frame.bind(layout.constant_slot(0), view.view_constants);
        frame.bind(layout.constant_slot(2), view.screen_constants);
        for (i, target) in [GBufferTarget::Diffuse, GBufferTarget::Material, GBufferTarget::Normal]
            .into_iter()
            .enumerate()
        {
            frame.bind(layout.readable_slot(i as u32), Binding::Texture(gbuffer.target(target)));
        }
    }

    /// Binds `pipeline` with the shared and per-object data of `item`.
    fn bind_light(
        frame: &mut FrameContext<'_>,
        pipeline: &CachedPipeline,
        view: &RenderView,
        gbuffer: &GBuffer,
        shared: &dyn SharedResource,
        item: &DrawItem,
    ) {
        frame.set_pipeline(pipeline.id);
        Self::bind_inputs(frame, pipeline.config.bindings(), view, gbuffer);
        pipeline.config.bind_shared(frame, shared);
        pipeline.config.bind_per_object(frame, item.renderable.per_object_data());
    }

    fn draw_point_lights(&self, ctx: &mut RenderContext<'_>, lights: &DrawPackets) {
        let gbuffer = ctx.gbuffer;
        for packet in lights.iter() {
            let (Some(mark), Some(shade)) = (
                self.mark.get_pipeline_for_mask(&packet.mask),
                self.shade.get_pipeline_for_mask(&packet.mask),
            ) else {
                log::trace!("LightPass: no point pipeline for {:?}, skipping packet", packet.mask);
                continue;
            };

            for group in packet.groups.values() {
                for item in &group.items {
                    let frame = &mut ctx.frame;
                    gbuffer.clear_stencil(frame, GBuffer::CLEAR_STENCIL);

                    Self::bind_light(frame, mark, &ctx.view, gbuffer, group.resource.as_ref(), item);
                    item.renderable.draw(frame);

                    Self::bind_light(frame, shade, &ctx.view, gbuffer, group.resource.as_ref(), item);
                    frame.set_stencil_reference(INSIDE_VOLUME);
                    item.renderable.draw(frame);
                }
            }
        }
    }

    fn draw_directional_lights(&self, ctx: &mut RenderContext<'_>, lights: &DrawPackets) {
        let gbuffer = ctx.gbuffer;
        for packet in lights.iter() {
            let Some(shade) = self.shade.get_pipeline_for_mask(&packet.mask) else {
                log::trace!("LightPass: no directional pipeline for {:?}, skipping packet", packet.mask);
                continue;
            };
            let layout = shade.config.bindings();

            for group in packet.groups.values() {
                for item in &group.items {
                    let Some(shadow) = ctx.shadow(item.handle).copied() else {
                        log::warn!("LightPass: no shadow data for directional light {:?}, skipping", item.handle);
                        continue;
                    };
                    let frame = &mut ctx.frame;
                    Self::bind_light(frame, shade, &ctx.view, gbuffer, group.resource.as_ref(), item);
                    frame.bind(layout.readable_slot(3), shadow.cascades);
                    frame.bind(layout.readable_slot(4), Binding::Texture(shadow.shadow_map));
                    frame.draw(0..3, 0..1);
                }
            }
        }
    }
}

impl RenderPass for LightPass {
    fn name(&self) -> &str {
        "LightPass"
    }

    fn stage(&self) -> RenderStage {
        RenderStage::Lighting
    }

    fn draw(&self, ctx: &mut RenderContext<'_>) {
        let gbuffer = ctx.gbuffer;
        let frame = &mut ctx.frame;

        for target in [GBufferTarget::Diffuse, GBufferTarget::Material, GBufferTarget::Normal] {
            gbuffer.transition(frame, target, ResourceState::ShaderRead);
        }
        gbuffer.transition(frame, GBufferTarget::LightAccumulation, ResourceState::RenderTarget);
        // Depth is only tested, but the stencil is written.
        gbuffer.transition_depth(frame, ResourceState::DepthWrite);

        frame.set_render_targets(
            &[gbuffer.target(GBufferTarget::LightAccumulation)],
            Some(DepthTarget::writable(gbuffer.depth())),
        );
        frame.set_viewport(ctx.view.viewport);

        let point = ctx
            .visibility
            .extract_from_frustum(Self::POINT_FILTER, ctx.view.camera.view_projection());
        let mut directional = DrawPackets::new();
        ctx.visibility
            .expand_by_filter_from_all(Self::DIRECTIONAL_FILTER, &mut directional);

        self.draw_point_lights(ctx, &point);
        self.draw_directional_lights(ctx, &directional);
    }
}
