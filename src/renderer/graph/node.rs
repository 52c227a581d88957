//! Render Pass Trait
//!
//! Defines the interface of one step in the [`RenderGraph`](super::graph::RenderGraph).

use super::context::RenderContext;
use super::stage::RenderStage;

/// A render pass.
///
/// # Design Principles
/// - Pipelines are created once, in the pass constructor
/// - `draw` queries visibility, transitions the textures it touches and
///   records commands through `ctx.frame`
/// - Content problems (missing pipeline, missing camera data) are logged
///   and the affected work is skipped; `draw` never fails the frame
pub trait RenderPass {
    /// Pass name, used for debug groups and logging.
    fn name(&self) -> &str;

    fn stage(&self) -> RenderStage;

    fn draw(&self, ctx: &mut RenderContext<'_>);
}
