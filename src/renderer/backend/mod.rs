//! wgpu Backend
//!
//! [`WgpuDevice`] replays recorded frames on a real GPU.

mod tracked_pass;
mod wgpu_device;

pub use tracked_pass::TrackedRenderPass;
pub use wgpu_device::WgpuDevice;
