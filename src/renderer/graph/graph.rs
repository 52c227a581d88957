//! Render Graph Executor
//!
//! `RenderGraph` owns the passes of a frame and runs them in insertion order.

use super::context::RenderContext;
use super::node::RenderPass;
use super::stage::RenderStage;

/// Render graph.
///
/// Manages and executes a list of render passes.
///
/// # Current Implementation
/// - Linear, sequential execution of all passes
/// - One command list shared by the whole graph
/// - Each pass is wrapped in a debug group named after it
pub struct RenderGraph {
    passes: Vec<Box<dyn RenderPass>>,
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderGraph {
    #[must_use]
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            passes: Vec::with_capacity(capacity),
        }
    }

    /// Appends a pass. Passes execute in the order they were added; adding a
    /// pass of an earlier stage than the last one is allowed but logged.
    pub fn add_pass(&mut self, pass: Box<dyn RenderPass>) {
        if let Some(last) = self.passes.last()
            && pass.stage() < last.stage()
        {
            log::warn!(
                "RenderGraph: '{}' ({}) added after '{}' ({})",
                pass.name(),
                pass.stage().name(),
                last.name(),
                last.stage().name()
            );
        }
        self.passes.push(pass);
    }

    /// Appends a pass (chained).
    #[must_use]
    pub fn with_pass(mut self, pass: Box<dyn RenderPass>) -> Self {
        self.add_pass(pass);
        self
    }

    /// Runs every pass once, in order.
    pub fn draw(&self, ctx: &mut RenderContext<'_>) {
        for pass in &self.passes {
            ctx.frame.push_debug_group(pass.name());
            pass.draw(ctx);
            ctx.frame.pop_debug_group();
        }
    }

    #[inline]
    #[must_use]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Pass names and stages in execution order.
    pub fn passes(&self) -> impl Iterator<Item = (&str, RenderStage)> {
        self.passes.iter().map(|p| (p.name(), p.stage()))
    }

    #[inline]
    pub fn clear(&mut self) {
        self.passes.clear();
    }
}
