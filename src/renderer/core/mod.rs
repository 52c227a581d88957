//! Platform Layer
//!
//! Backend-agnostic plumbing between the render core and a graphics device:
//! - `resources`: typed ids, descriptors, bindings and resource states
//! - `commands`: the recorded per-frame command stream
//! - `state`: per-texture state tracking
//! - `allocator`: frame-bounded transient uploads
//! - `frame`: the per-frame context passes record through
//! - `device`: the device trait implemented by backends

pub mod allocator;
pub mod commands;
pub mod device;
pub mod frame;
pub mod resources;
pub mod state;

pub use allocator::TransientAllocator;
pub use commands::{CommandList, GpuCommand};
pub use device::RenderDevice;
pub use frame::FrameContext;
pub use resources::{
    Binding, BufferDesc, BufferId, BufferSlice, DepthTarget, PipelineId, ResourceState, TextureDesc,
    TextureId, Viewport,
};
pub use state::{ResourceStateTracker, StateViolation};
