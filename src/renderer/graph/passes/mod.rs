//! Render Passes
//!
//! One module per pass, in frame order:
//!
//! | Pass | Stage | Writes |
//! |------|-------|--------|
//! | [`ShadowPass`] | Shadow | cascaded shadow maps |
//! | [`GBufferPass`] | Geometry | G-buffer colors + depth |
//! | [`LightPass`] | Lighting | accumulation (additive), stencil |
//! | [`ForwardPass`] | Forward | accumulation |
//! | [`DebugPass`] | Debug | accumulation (lines) |
//! | [`PostProcessPass`] | PostProcess | presentable output |

pub(crate) mod common;
mod debug;
mod forward;
mod gbuffer;
mod light;
mod post_process;
mod shadow;

pub use debug::DebugPass;
pub use forward::ForwardPass;
pub use gbuffer::GBufferPass;
pub use light::LightPass;
pub use post_process::PostProcessPass;
pub use shadow::ShadowPass;
