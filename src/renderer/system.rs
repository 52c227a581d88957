//! Render System
//!
//! [`RenderSystem`] owns everything that lives across frames:
//!
//! | Part | Type |
//! |------|------|
//! | Spatial index | [`SpatialIndex`] |
//! | G-buffer | [`GBuffer`] |
//! | Passes | [`RenderGraph`] with the six deferred passes |
//! | Texture states | [`ResourceStateTracker`] |
//! | Per-frame uploads | [`TransientAllocator`] |
//!
//! # Frame
//!
//! ```text
//! host:    update transforms ──► tick() ──► render(device, camera, output)
//! render:  allocator.begin_frame
//!          upload view + screen constants
//!          RenderGraph::draw (Shadow → GBuffer → Light → Forward → Debug → PostProcess)
//!          device.submit (once)
//! ```

use crate::errors::Result;
use crate::renderer::core::{
    FrameContext, RenderDevice, ResourceStateTracker, StateViolation, TextureId, TransientAllocator, Viewport,
};
use crate::renderer::gbuffer::GBuffer;
use crate::renderer::graph::passes::{DebugPass, ForwardPass, GBufferPass, LightPass, PostProcessPass, ShadowPass};
use crate::renderer::graph::{RenderContext, RenderGraph, RenderView, ScreenConstants, ViewConstants};
use crate::renderer::pipeline::{ShaderDefines, ShaderLibrary};
use crate::renderer::settings::RendererSettings;
use crate::scene::camera::Camera;
use crate::scene::visibility::SpatialIndex;

/// Frames between transient-page trims.
const TRIM_INTERVAL: u64 = 60;
/// Idle frames after which a free upload page is released.
const MAX_IDLE_FRAMES: u32 = 600;

/// Summary of one rendered frame.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub frame_index: u64,
    pub draw_calls: usize,
    pub command_count: usize,
    /// State mismatches recorded while the frame was built.
    pub violations: Vec<StateViolation>,
}

pub struct RenderSystem {
    settings: RendererSettings,
    visibility: SpatialIndex,
    gbuffer: GBuffer,
    graph: RenderGraph,
    states: ResourceStateTracker,
    transient: TransientAllocator,
    frame_index: u64,
}

impl RenderSystem {
    /// Builds the G-buffer and the six passes for a `width` x `height`
    /// output.
    pub fn new(device: &mut dyn RenderDevice, settings: RendererSettings, width: u32, height: u32) -> Result<Self> {
        let mut shaders = ShaderLibrary::new(ShaderDefines {
            cascade_count: settings.shadow.effective_cascade_count(),
        });
        let mut states = ResourceStateTracker::new();
        let gbuffer = GBuffer::new(
            device,
            &mut states,
            width,
            height,
            settings.gbuffer_format,
            settings.depth_format,
        )?;

        let graph = RenderGraph::with_capacity(6)
            .with_pass(Box::new(ShadowPass::new(device, &mut shaders, &settings)?))
            .with_pass(Box::new(GBufferPass::new(device, &mut shaders, &settings)?))
            .with_pass(Box::new(LightPass::new(device, &mut shaders, &settings)?))
            .with_pass(Box::new(ForwardPass::new(device, &mut shaders, &settings)?))
            .with_pass(Box::new(DebugPass::new(device, &mut shaders, &settings)?))
            .with_pass(Box::new(PostProcessPass::new(device, &mut shaders, &settings)?));
        log::debug!(
            "RenderSystem: {} passes, {} shaders, {}x{}",
            graph.pass_count(),
            shaders.cached_count(),
            gbuffer.size().0,
            gbuffer.size().1
        );

        Ok(Self {
            visibility: SpatialIndex::new(settings.visibility),
            transient: TransientAllocator::new(settings.frames_in_flight),
            settings,
            gbuffer,
            graph,
            states,
            frame_index: 0,
        })
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn visibility(&self) -> &SpatialIndex {
        &self.visibility
    }

    #[inline]
    pub fn visibility_mut(&mut self) -> &mut SpatialIndex {
        &mut self.visibility
    }

    #[inline]
    #[must_use]
    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    #[inline]
    #[must_use]
    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    #[inline]
    #[must_use]
    pub fn states(&self) -> &ResourceStateTracker {
        &self.states
    }

    #[inline]
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Rebuilds the spatial index. Call once per frame after transforms
    /// have been updated.
    pub fn tick(&mut self) {
        self.visibility.tick();
    }

    /// Resizes the G-buffer. Zero or unchanged sizes are ignored.
    pub fn resize(&mut self, device: &mut dyn RenderDevice, width: u32, height: u32) -> Result<()> {
        if self.gbuffer.resize(device, &mut self.states, width, height)? {
            log::debug!("RenderSystem: resized to {width}x{height}");
        }
        Ok(())
    }

    /// Allocates a shadow map for a directional light, sized and layered
    /// per the shadow settings.
    pub fn create_shadow_map(&mut self, device: &mut dyn RenderDevice) -> Result<TextureId> {
        ShadowPass::create_shadow_map(device, &mut self.states, &self.settings)
    }

    /// Destroys a texture created through this system (or an imported
    /// output) and stops tracking it.
    pub fn release_texture(&mut self, device: &mut dyn RenderDevice, texture: TextureId) {
        self.states.forget(texture);
        device.destroy_texture(texture);
    }

    /// Renders one frame into `output`. Without a camera nothing is
    /// recorded and `None` is returned.
    pub fn render(
        &mut self,
        device: &mut dyn RenderDevice,
        camera: Option<&Camera>,
        output: TextureId,
    ) -> Result<Option<FrameStats>> {
        let Some(camera) = camera else {
            log::debug!("RenderSystem: no active camera, skipping frame");
            return Ok(None);
        };

        self.frame_index += 1;
        let frame_index = self.frame_index;
        self.transient.begin_frame(frame_index);
        if frame_index % TRIM_INTERVAL == 0 {
            self.transient.trim(device, MAX_IDLE_FRAMES);
        }

        let (width, height) = self.gbuffer.size();
        let (commands, violations) = {
            let mut frame = FrameContext::new(&mut *device, &mut self.states, &mut self.transient, frame_index);
            let view = RenderView {
                camera: *camera,
                view_constants: frame.upload(&ViewConstants::from_camera(camera))?,
                screen_constants: frame.upload(&ScreenConstants::new(
                    width,
                    height,
                    self.settings.post_process.gamma,
                ))?,
                viewport: Viewport::full(width, height),
            };

            let mut ctx = RenderContext::new(frame, &self.visibility, &self.gbuffer, view, output);
            self.graph.draw(&mut ctx);
            ctx.into_frame().finish()
        };

        device.submit(&commands)?;

        if !violations.is_empty() {
            log::error!("RenderSystem: frame {frame_index} recorded {} state violations", violations.len());
        }
        Ok(Some(FrameStats {
            frame_index,
            draw_calls: commands.draw_count(),
            command_count: commands.len(),
            violations,
        }))
    }

    /// Destroys the G-buffer and every transient upload page.
    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        self.gbuffer.release(device, &mut self.states);
        self.transient.release_all(device);
    }
}
