//! Post-Process Pass
//!
//! Resolves the linear accumulation target into the presentable output with
//! gamma correction, as one full-screen triangle. Leaves the output in
//! `Present`.

use crate::errors::Result;
use crate::renderer::core::{Binding, PipelineId, RenderDevice, ResourceState};
use crate::renderer::gbuffer::GBufferTarget;
use crate::renderer::graph::context::RenderContext;
use crate::renderer::graph::node::RenderPass;
use crate::renderer::graph::stage::RenderStage;
use crate::renderer::pipeline::{
    BindingLayout, PipelineConfiguration, ReadableKind, ShaderLibrary, StaticSampler,
};
use crate::renderer::settings::RendererSettings;

pub struct PostProcessPass {
    pipeline: PipelineId,
    bindings: BindingLayout,
}

impl PostProcessPass {
    pub fn new(
        device: &mut dyn RenderDevice,
        shaders: &mut ShaderLibrary,
        settings: &RendererSettings,
    ) -> Result<Self> {
        let bindings = BindingLayout::builder()
            .constants(1)
            .readable(ReadableKind::TEXTURE_2D)
            .sampler(StaticSampler::LinearClamp)
            .build();

        let config = PipelineConfiguration::builder("Post Process")
            .vertex(shaders.stage("post_process", "vs_fullscreen")?)
            .fragment(shaders.stage("post_process", "fs_main")?)
            .cull_mode(None)
            .color_target(settings.output_format, None)
            .bindings(bindings.clone())
            .build()?;
        let pipeline = device.create_render_pipeline(&config)?;

        Ok(Self { pipeline, bindings })
    }
}

impl RenderPass for PostProcessPass {
    fn name(&self) -> &str {
        "PostProcessPass"
    }

    fn stage(&self) -> RenderStage {
        RenderStage::PostProcess
    }

    fn draw(&self, ctx: &mut RenderContext<'_>) {
        let gbuffer = ctx.gbuffer;
        let output = ctx.output;
        let frame = &mut ctx.frame;

        gbuffer.transition(frame, GBufferTarget::LightAccumulation, ResourceState::ShaderRead);
        frame.transition(output, ResourceState::RenderTarget);
        frame.set_render_targets(&[output], None);
        frame.set_viewport(ctx.view.viewport);

        frame.set_pipeline(self.pipeline);
        frame.bind(self.bindings.constant_slot(0), ctx.view.screen_constants);
        frame.bind(
            self.bindings.readable_slot(0),
            Binding::Texture(gbuffer.target(GBufferTarget::LightAccumulation)),
        );
        frame.draw(0..3, 0..1);

        frame.transition(output, ResourceState::Present);
    }
}
