//! Render pass with state tracking
//!
//! Skips redundant state changes while replaying a frame.

use std::ops::Range;

use crate::renderer::core::{BufferSlice, PipelineId, Viewport};

const MAX_VERTEX_BUFFERS: usize = 8;

pub struct TrackedRenderPass {
    pass: wgpu::RenderPass<'static>,
    current_pipeline: Option<PipelineId>,
    current_bind_group: Option<u64>,
    current_vertex_buffers: [Option<BufferSlice>; MAX_VERTEX_BUFFERS],
    current_index_buffer: Option<BufferSlice>,
    current_viewport: Option<Viewport>,
    current_stencil_reference: Option<u32>,
}

impl TrackedRenderPass {
    #[must_use]
    pub fn new(pass: wgpu::RenderPass<'static>) -> Self {
        Self {
            pass,
            current_pipeline: None,
            current_bind_group: None,
            current_vertex_buffers: [None; MAX_VERTEX_BUFFERS],
            current_index_buffer: None,
            current_viewport: None,
            current_stencil_reference: None,
        }
    }

    pub fn set_pipeline(&mut self, id: PipelineId, pipeline: &wgpu::RenderPipeline) {
        if self.current_pipeline != Some(id) {
            self.pass.set_pipeline(pipeline);
            self.current_pipeline = Some(id);
        }
    }

    /// Binds group 0. `id` identifies the bind group within the frame.
    pub fn set_bind_group(&mut self, id: u64, bind_group: &wgpu::BindGroup) {
        if self.current_bind_group != Some(id) {
            self.pass.set_bind_group(0, bind_group, &[]);
            self.current_bind_group = Some(id);
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.current_viewport != Some(viewport) {
            self.pass.set_viewport(
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                viewport.min_depth,
                viewport.max_depth,
            );
            self.current_viewport = Some(viewport);
        }
    }

    pub fn set_stencil_reference(&mut self, reference: u32) {
        if self.current_stencil_reference != Some(reference) {
            self.pass.set_stencil_reference(reference);
            self.current_stencil_reference = Some(reference);
        }
    }

    pub fn set_vertex_buffer(&mut self, slot: u32, id: BufferSlice, buffer: &wgpu::Buffer) {
        let index = slot as usize;
        if index >= MAX_VERTEX_BUFFERS {
            log::warn!("TrackedRenderPass: vertex buffer slot {slot} out of range, ignoring");
            return;
        }
        if self.current_vertex_buffers[index] != Some(id) {
            self.pass
                .set_vertex_buffer(slot, buffer.slice(id.offset..id.offset + id.size));
            self.current_vertex_buffers[index] = Some(id);
        }
    }

    pub fn set_index_buffer(&mut self, id: BufferSlice, buffer: &wgpu::Buffer, format: wgpu::IndexFormat) {
        if self.current_index_buffer != Some(id) {
            self.pass
                .set_index_buffer(buffer.slice(id.offset..id.offset + id.size), format);
            self.current_index_buffer = Some(id);
        }
    }

    pub fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draw(vertices, instances);
    }

    pub fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.pass.draw_indexed(indices, base_vertex, instances);
    }
}
