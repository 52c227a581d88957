//! Render Graph
//!
//! - [`RenderGraph`]: ordered pass list driving one frame
//! - [`RenderPass`]: the pass trait
//! - [`RenderStage`]: coarse frame ordering of passes
//! - [`RenderContext`]: per-frame state handed to each pass
//! - `shadow_utils`: cascade split and fitting math
//! - `passes`: the concrete passes

pub mod context;
#[allow(clippy::module_inception)]
pub mod graph;
pub mod node;
pub mod passes;
pub mod shadow_utils;
pub mod stage;

pub use context::{RenderContext, RenderView, ScreenConstants, ShadowViewData, ViewConstants};
pub use graph::RenderGraph;
pub use node::RenderPass;
pub use passes::{DebugPass, ForwardPass, GBufferPass, LightPass, PostProcessPass, ShadowPass};
pub use shadow_utils::{CascadeGpuData, CascadeSlice, Cascades, MAX_CASCADES, compute_cascades};
pub use stage::RenderStage;
