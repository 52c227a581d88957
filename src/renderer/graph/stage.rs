//! Render Stage Definitions
//!
//! `RenderStage` defines the standard stage ordering of the frame. Passes are
//! executed in insertion order; the stage is used to catch passes that were
//! inserted out of order.

/// Render stage enumeration.
///
/// # Stage Overview
///
/// | Stage | Purpose | Pass |
/// |-------|---------|------|
/// | `Shadow` | Cascaded shadow maps | `ShadowPass` |
/// | `Geometry` | G-buffer fill | `GBufferPass` |
/// | `Lighting` | Light accumulation | `LightPass` |
/// | `Forward` | Unlit and translucent objects | `ForwardPass` |
/// | `Debug` | Line overlays | `DebugPass` |
/// | `PostProcess` | Gamma and output | `PostProcessPass` |
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
#[repr(u8)]
pub enum RenderStage {
    /// Shadow map rendering stage.
    Shadow = 0,

    /// G-buffer fill for deferred-lit opaque geometry.
    Geometry = 1,

    /// Stencil-masked light volumes and full-screen directional lights.
    Lighting = 2,

    /// Objects the deferred path cannot shade.
    Forward = 3,

    /// Debug lines, drawn without lighting.
    Debug = 4,

    /// Full-screen resolve into the presentable target (executed last).
    PostProcess = 5,
}

impl RenderStage {
    /// Returns the numeric index of the stage (used for sorting).
    #[inline]
    #[must_use]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Stage name (for debugging).
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Shadow => "Shadow",
            Self::Geometry => "Geometry",
            Self::Lighting => "Lighting",
            Self::Forward => "Forward",
            Self::Debug => "Debug",
            Self::PostProcess => "PostProcess",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_ordering() {
        assert!(RenderStage::Shadow < RenderStage::Geometry);
        assert!(RenderStage::Geometry < RenderStage::Lighting);
        assert!(RenderStage::Lighting < RenderStage::Forward);
        assert!(RenderStage::Forward < RenderStage::Debug);
        assert!(RenderStage::Debug < RenderStage::PostProcess);
        assert_eq!(RenderStage::PostProcess.order(), 5);
    }
}
