//! Deferred Renderer
//!
//! - `core`: device trait, command recording, state tracking, transient uploads
//! - `backend`: the wgpu implementation of the device trait
//! - `pipeline`: pipeline configurations, the mask-keyed cache, shaders
//! - `gbuffer`: the four G-buffer targets plus depth/stencil
//! - `graph`: the render graph and its passes
//! - `settings`: renderer configuration
//! - `system`: the per-frame driver owning all of the above

pub mod backend;
pub mod core;
pub mod gbuffer;
pub mod graph;
pub mod pipeline;
pub mod settings;
pub mod system;

pub use backend::WgpuDevice;
pub use gbuffer::{GBuffer, GBufferTarget};
pub use graph::{RenderGraph, RenderPass, RenderStage};
pub use settings::{CascadeSplit, PostProcessSettings, RendererSettings, ShadowSettings, VisibilitySettings};
pub use system::{FrameStats, RenderSystem};
