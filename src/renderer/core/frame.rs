//! Frame Context
//!
//! [`FrameContext`] is the boundary object handed to passes and renderables
//! for exactly one frame. It bundles:
//!
//! - the [`CommandList`] being recorded,
//! - the shared [`ResourceStateTracker`],
//! - the [`TransientAllocator`] for per-frame constants,
//! - the device, for uploads only.
//!
//! Uses that need a particular resource state are validated as they are
//! recorded. A mismatch never aborts the frame; it is logged and kept as a
//! [`StateViolation`] so tests can assert on it.

use std::ops::Range;

use bytemuck::Pod;
use smallvec::SmallVec;

use crate::errors::Result;

use super::allocator::TransientAllocator;
use super::commands::{CommandList, GpuCommand};
use super::device::RenderDevice;
use super::resources::{
    Binding, BufferSlice, DepthTarget, PipelineId, ResourceState, TextureId, Viewport,
};
use super::state::{ResourceStateTracker, StateViolation};

pub struct FrameContext<'a> {
    device: &'a mut dyn RenderDevice,
    states: &'a mut ResourceStateTracker,
    transient: &'a mut TransientAllocator,
    commands: CommandList,
    frame_index: u64,
    violations: Vec<StateViolation>,
    current_pipeline: Option<PipelineId>,
    current_stencil_reference: Option<u32>,
    viewport: Option<Viewport>,
}

impl<'a> FrameContext<'a> {
    pub fn new(
        device: &'a mut dyn RenderDevice,
        states: &'a mut ResourceStateTracker,
        transient: &'a mut TransientAllocator,
        frame_index: u64,
    ) -> Self {
        Self {
            device,
            states,
            transient,
            commands: CommandList::new(),
            frame_index,
            violations: Vec::new(),
            current_pipeline: None,
            current_stencil_reference: None,
            viewport: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    #[must_use]
    pub fn commands(&self) -> &CommandList {
        &self.commands
    }

    #[inline]
    #[must_use]
    pub fn violations(&self) -> &[StateViolation] {
        &self.violations
    }

    /// Ends recording and hands back the command list and any violations.
    #[must_use]
    pub fn finish(self) -> (CommandList, Vec<StateViolation>) {
        (self.commands, self.violations)
    }

    // ─── Debug Groups ──────────────────────────────────────────────────────

    pub fn push_debug_group(&mut self, label: &str) {
        self.commands.push(GpuCommand::PushDebugGroup(label.to_owned()));
    }

    pub fn pop_debug_group(&mut self) {
        self.commands.push(GpuCommand::PopDebugGroup);
    }

    // ─── Resource States ───────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn state(&self, texture: TextureId) -> ResourceState {
        self.states.state(texture)
    }

    /// Moves `texture` to `state`, recording a transition only on change.
    pub fn transition(&mut self, texture: TextureId, state: ResourceState) {
        if let Some(before) = self.states.transition(texture, state) {
            self.commands.push(GpuCommand::Transition {
                texture,
                before,
                after: state,
            });
        }
    }

    fn expect_state(&mut self, texture: TextureId, accepted: &[ResourceState], operation: &'static str) {
        let actual = self.states.state(texture);
        if !accepted.contains(&actual) {
            let violation = StateViolation {
                texture,
                expected: accepted[0],
                actual,
                operation,
            };
            log::error!("{operation}: {texture:?} is {actual:?}, expected {:?}", accepted[0]);
            self.violations.push(violation);
        }
    }

    // ─── Targets & Clears ──────────────────────────────────────────────────

    /// Binds color targets and an optional depth target. Pass an empty
    /// `colors` slice for depth/stencil-only work.
    pub fn set_render_targets(&mut self, colors: &[TextureId], depth: Option<DepthTarget>) {
        for &texture in colors {
            self.expect_state(texture, &[ResourceState::RenderTarget], "set_render_targets");
        }
        if let Some(target) = depth {
            if target.read_only {
                self.expect_state(
                    target.texture,
                    &[ResourceState::DepthRead, ResourceState::DepthWrite],
                    "set_render_targets(depth)",
                );
            } else {
                self.expect_state(target.texture, &[ResourceState::DepthWrite], "set_render_targets(depth)");
            }
        }
        self.commands.push(GpuCommand::SetRenderTargets {
            colors: SmallVec::from_slice(colors),
            depth,
        });
        // Targets open a new pass on the backend; previously set state does not carry over.
        self.reset_pass_state();
    }

    pub fn clear_color(&mut self, texture: TextureId, color: wgpu::Color) {
        self.expect_state(texture, &[ResourceState::RenderTarget], "clear_color");
        self.commands.push(GpuCommand::ClearColor { texture, color });
        self.reset_pass_state();
    }

    pub fn clear_depth_stencil(&mut self, texture: TextureId, depth: Option<f32>, stencil: Option<u32>) {
        self.expect_state(texture, &[ResourceState::DepthWrite], "clear_depth_stencil");
        self.commands.push(GpuCommand::ClearDepthStencil { texture, depth, stencil });
        self.reset_pass_state();
    }

    // A clear may restart the backend pass. Pipeline and stencil reference
    // are re-recorded by the next draw.
    fn reset_pass_state(&mut self) {
        self.current_pipeline = None;
        self.current_stencil_reference = None;
    }

    // ─── Fixed-function State ──────────────────────────────────────────────

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.commands.push(GpuCommand::SetViewport(viewport));
    }

    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Binds `pipeline`; repeated binds of the same pipeline are skipped.
    pub fn set_pipeline(&mut self, pipeline: PipelineId) {
        if self.current_pipeline != Some(pipeline) {
            self.current_pipeline = Some(pipeline);
            self.commands.push(GpuCommand::SetPipeline(pipeline));
        }
    }

    #[inline]
    #[must_use]
    pub fn current_pipeline(&self) -> Option<PipelineId> {
        self.current_pipeline
    }

    pub fn set_stencil_reference(&mut self, reference: u32) {
        if self.current_stencil_reference != Some(reference) {
            self.current_stencil_reference = Some(reference);
            self.commands.push(GpuCommand::SetStencilReference(reference));
        }
    }

    // ─── Bindings & Draws ──────────────────────────────────────────────────

    /// Binds `binding` at `slot` of the current pipeline's binding layout.
    pub fn bind(&mut self, slot: u32, binding: Binding) {
        if let Some(texture) = binding.texture() {
            self.expect_state(texture, &[ResourceState::ShaderRead], "bind");
        }
        self.commands.push(GpuCommand::Bind { slot, binding });
    }

    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferSlice) {
        self.commands.push(GpuCommand::SetVertexBuffer { slot, buffer });
    }

    pub fn set_index_buffer(&mut self, buffer: BufferSlice, format: wgpu::IndexFormat) {
        self.commands.push(GpuCommand::SetIndexBuffer { buffer, format });
    }

    pub fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.commands.push(GpuCommand::Draw { vertices, instances });
    }

    pub fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.commands.push(GpuCommand::DrawIndexed {
            indices,
            base_vertex,
            instances,
        });
    }

    // ─── Transient Uploads ─────────────────────────────────────────────────

    /// Uploads one constant block for this frame.
    pub fn upload<T: Pod>(&mut self, value: &T) -> Result<Binding> {
        self.upload_bytes(bytemuck::bytes_of(value))
    }

    /// Uploads an array (e.g. a storage buffer of cascades) for this frame.
    pub fn upload_slice<T: Pod>(&mut self, values: &[T]) -> Result<Binding> {
        self.upload_bytes(bytemuck::cast_slice(values))
    }

    fn upload_bytes(&mut self, bytes: &[u8]) -> Result<Binding> {
        let slice = self.transient.allocate(&mut *self.device, bytes)?;
        Ok(Binding::Buffer(slice))
    }
}
