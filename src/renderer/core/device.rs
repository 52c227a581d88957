//! Device abstraction consumed by the render core.

use crate::errors::Result;
use crate::renderer::pipeline::config::PipelineConfiguration;

use super::commands::CommandList;
use super::resources::{BufferDesc, BufferId, PipelineId, TextureDesc, TextureId};

/// The thin platform layer under the render core.
///
/// Resource creation happens outside of frame recording or through the
/// [`FrameContext`](super::frame::FrameContext) transient helpers. Recorded
/// work reaches the GPU only through [`submit`](Self::submit), once per frame.
pub trait RenderDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId>;

    fn destroy_texture(&mut self, texture: TextureId);

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId>;

    fn destroy_buffer(&mut self, buffer: BufferId);

    /// Copies `data` into `buffer` before the next submission executes.
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]);

    fn create_render_pipeline(&mut self, config: &PipelineConfiguration) -> Result<PipelineId>;

    /// Replays a frame's commands and submits them.
    fn submit(&mut self, commands: &CommandList) -> Result<()>;

    /// Required alignment of buffer binding offsets.
    fn binding_alignment(&self) -> u64 {
        256
    }
}
