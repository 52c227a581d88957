//! Recorded GPU Commands
//!
//! Passes never talk to the graphics API directly. They record a
//! [`CommandList`] through the [`FrameContext`], and the device replays the
//! whole list into a single submission at the end of the frame. Tests inspect
//! the same list without a GPU.
//!
//! [`FrameContext`]: super::frame::FrameContext

use std::ops::Range;

use smallvec::SmallVec;

use super::resources::{Binding, BufferSlice, DepthTarget, PipelineId, ResourceState, TextureId, Viewport};

/// One recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    PushDebugGroup(String),
    PopDebugGroup,
    Transition {
        texture: TextureId,
        before: ResourceState,
        after: ResourceState,
    },
    SetRenderTargets {
        colors: SmallVec<[TextureId; 4]>,
        depth: Option<DepthTarget>,
    },
    ClearColor {
        texture: TextureId,
        color: wgpu::Color,
    },
    ClearDepthStencil {
        texture: TextureId,
        depth: Option<f32>,
        stencil: Option<u32>,
    },
    SetViewport(Viewport),
    SetPipeline(PipelineId),
    SetStencilReference(u32),
    Bind {
        slot: u32,
        binding: Binding,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: BufferSlice,
    },
    SetIndexBuffer {
        buffer: BufferSlice,
        format: wgpu::IndexFormat,
    },
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
}

impl GpuCommand {
    #[inline]
    #[must_use]
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::Draw { .. } | Self::DrawIndexed { .. })
    }
}

/// Ordered command stream for one frame.
#[derive(Debug, Default, Clone)]
pub struct CommandList {
    commands: Vec<GpuCommand>,
}

impl CommandList {
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: Vec::with_capacity(256),
        }
    }

    #[inline]
    pub fn push(&mut self, command: GpuCommand) {
        self.commands.push(command);
    }

    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GpuCommand> {
        self.commands.iter()
    }

    /// Number of draw and indexed-draw commands.
    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    /// Names of the debug groups in the order they were opened.
    #[must_use]
    pub fn debug_groups(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                GpuCommand::PushDebugGroup(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Commands recorded between the opening of debug group `name` and its
    /// matching close. Empty if the group was never opened.
    #[must_use]
    pub fn group(&self, name: &str) -> &[GpuCommand] {
        let Some(start) = self
            .commands
            .iter()
            .position(|c| matches!(c, GpuCommand::PushDebugGroup(n) if n == name))
        else {
            return &[];
        };

        let mut depth = 0usize;
        for (offset, command) in self.commands[start..].iter().enumerate() {
            match command {
                GpuCommand::PushDebugGroup(_) => depth += 1,
                GpuCommand::PopDebugGroup => {
                    depth -= 1;
                    if depth == 0 {
                        return &self.commands[start + 1..start + offset];
                    }
                }
                _ => {}
            }
        }
        &self.commands[start + 1..]
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a GpuCommand;
    type IntoIter = std::slice::Iter<'a, GpuCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
