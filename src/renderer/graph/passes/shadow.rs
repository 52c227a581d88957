//! Cascaded Shadow Pass
//!
//! For every shadow-casting directional light:
//!
//! ```text
//! shadow map → DepthWrite, clear 1.0
//! compute cascades for the active camera, upload them
//! cull scene geometry once per cascade frustum, merge
//! draw depth-only, multiview fans each draw out to every cascade layer
//! shadow map → ShaderRead, publish { cascades, shadow map } for lighting
//! ```

use smallvec::SmallVec;

use crate::errors::Result;
use crate::renderer::core::{
    DepthTarget, RenderDevice, ResourceState, ResourceStateTracker, TextureDesc, TextureId, Viewport,
};
use crate::renderer::graph::context::{RenderContext, ShadowViewData};
use crate::renderer::graph::node::RenderPass;
use crate::renderer::graph::shadow_utils::{CascadeGpuData, compute_cascades};
use crate::renderer::graph::stage::RenderStage;
use crate::renderer::pipeline::{
    BindingLayout, PipelineCache, PipelineConfiguration, ReadableKind, ShaderLibrary,
};
use crate::renderer::settings::{RendererSettings, ShadowSettings};
use crate::scene::mask::{BlendMode, FillMode, LightType, ObjectMask, ShadingModel, VertexLayout};
use crate::scene::visibility::DrawPackets;

use super::common::{depth_state, draw_packets};

pub struct ShadowPass {
    cache: PipelineCache,
    settings: ShadowSettings,
}

impl ShadowPass {
    /// Directional lights, whatever their other classification.
    pub const LIGHTS_FILTER: ObjectMask = ObjectMask::new()
        .with_light_type(LightType::DIRECTIONAL)
        .with_shading_model(ShadingModel::ALL)
        .with_vertex_layout(VertexLayout::ALL)
        .with_fill_mode(FillMode::ALL);

    /// Shadow casters.
    pub const OBJECTS_FILTER: ObjectMask = ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_shading_model(ShadingModel::DEFAULT_LIT)
        .with_blend_mode(BlendMode::OPAQUE.union(BlendMode::MASKED))
        .with_fill_mode(FillMode::SOLID);

    pub fn new(
        device: &mut dyn RenderDevice,
        shaders: &mut ShaderLibrary,
        settings: &RendererSettings,
    ) -> Result<Self> {
        let cascade_count = settings.shadow.effective_cascade_count();
        let bindings = BindingLayout::builder()
            .constants(1)
            .readable(ReadableKind::StorageBuffer)
            .build();

        let config = PipelineConfiguration::builder("Shadow Depth")
            .vertex(shaders.stage("shadow", "vs_main")?)
            .vertex_layout(VertexLayout::PNTBT)
            .cull_mode(Some(wgpu::Face::Back))
            .depth_stencil(depth_state(settings.shadow_format, true, wgpu::CompareFunction::Less))
            .multiview(cascade_count)
            .bindings(bindings)
            .per_object(|frame, layout, binding| frame.bind(layout.constant_slot(0), binding))
            .build()?;

        let mut cache = PipelineCache::new();
        cache.insert(device, Self::OBJECTS_FILTER, config)?;

        Ok(Self {
            cache,
            settings: settings.shadow,
        })
    }

    /// Allocates a shadow map matching `settings`: a depth array with one
    /// layer per cascade, tracked in `ShaderRead`.
    pub fn create_shadow_map(
        device: &mut dyn RenderDevice,
        states: &mut ResourceStateTracker,
        settings: &RendererSettings,
    ) -> Result<TextureId> {
        let size = settings.shadow.map_size.max(1);
        let desc = TextureDesc::render_target("Shadow Map", size, size, settings.shadow_format)
            .with_layers(settings.shadow.effective_cascade_count());
        let texture = device.create_texture(&desc)?;
        states.register(texture, ResourceState::ShaderRead);
        Ok(texture)
    }
}

impl RenderPass for ShadowPass {
    fn name(&self) -> &str {
        "ShadowPass"
    }

    fn stage(&self) -> RenderStage {
        RenderStage::Shadow
    }

    fn draw(&self, ctx: &mut RenderContext<'_>) {
        let visibility = ctx.visibility;
        let mut lights = DrawPackets::new();
        visibility.expand_by_filter_from_all(Self::LIGHTS_FILTER, &mut lights);

        let map_size = self.settings.map_size.max(1);
        let main_viewport = ctx.view.viewport;

        for item in lights
            .iter()
            .flat_map(|packet| packet.groups.values())
            .flat_map(|group| group.items.iter())
        {
            let Some(source) = item.renderable.shadow_source() else {
                log::warn!("ShadowPass: directional light {:?} has no shadow source, skipping", item.handle);
                continue;
            };

            let cascades = compute_cascades(&ctx.view.camera, &source, &self.settings);
            let gpu: SmallVec<[CascadeGpuData; 4]> = cascades.iter().map(|c| c.to_gpu()).collect();
            let cascade_binding = match ctx.frame.upload_slice(&gpu) {
                Ok(binding) => binding,
                Err(e) => {
                    log::warn!("ShadowPass: cascade upload failed for {:?}: {e}, skipping", item.handle);
                    continue;
                }
            };

            let frame = &mut ctx.frame;
            frame.transition(source.shadow_map, ResourceState::DepthWrite);
            frame.set_render_targets(&[], Some(DepthTarget::writable(source.shadow_map)));
            frame.clear_depth_stencil(source.shadow_map, Some(1.0), None);
            frame.set_viewport(Viewport::full(map_size, map_size));

            let mut casters = DrawPackets::new();
            for cascade in &cascades {
                visibility.expand_by_filter_from_frustum(Self::OBJECTS_FILTER, cascade.view_projection(), &mut casters);
            }

            draw_packets(frame, &self.cache, &casters, self.name(), &|frame, layout| {
                frame.bind(layout.readable_slot(0), cascade_binding);
            });

            frame.transition(source.shadow_map, ResourceState::ShaderRead);
            frame.set_viewport(main_viewport);

            ctx.publish_shadow(
                item.handle,
                ShadowViewData {
                    cascades: cascade_binding,
                    shadow_map: source.shadow_map,
                    cascade_count: cascades.len() as u32,
                },
            );
        }
    }
}
