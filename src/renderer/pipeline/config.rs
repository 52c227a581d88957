//! Pipeline Configuration
//!
//! A [`PipelineConfiguration`] describes one fixed-function + shader
//! combination the way a pass wants it, independent of any backend:
//!
//! | Part | Type |
//! |------|------|
//! | Shaders | [`ShaderStage`] for vertex and (optional) fragment |
//! | Vertex input | [`VertexLayout`] (empty means no vertex buffer) |
//! | Rasterizer | `wgpu::PrimitiveState` |
//! | Depth/stencil | `wgpu::DepthStencilState` |
//! | Color targets | `wgpu::ColorTargetState` per attachment |
//! | Resources | [`BindingLayout`] |
//! | Layered output | optional multiview layer count |
//!
//! Two callbacks travel with the configuration. The per-object binder is
//! called once per renderable with its `per_object_data`, the shared binder
//! once per [`CommonResourceGroup`]. Both receive the layout so they address
//! slots the same way the layout assigned them.
//!
//! [`CommonResourceGroup`]: crate::scene::visibility::CommonResourceGroup

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::errors::{Result, UmbraError};
use crate::renderer::core::{Binding, FrameContext};
use crate::scene::mask::VertexLayout;
use crate::scene::renderable::SharedResource;

use super::layout::BindingLayout;

/// Binds the per-instance constants of one renderable.
pub type PerObjectBinder = Box<dyn Fn(&mut FrameContext<'_>, &BindingLayout, Binding)>;

/// Binds the shared resources of one resource group.
pub type SharedBinder = Box<dyn Fn(&mut FrameContext<'_>, &BindingLayout, &dyn SharedResource)>;

/// Resolved shader source plus entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStage {
    pub label: Cow<'static, str>,
    pub source: Rc<str>,
    pub entry_point: &'static str,
}

pub struct PipelineConfiguration {
    label: Cow<'static, str>,
    vertex: ShaderStage,
    fragment: Option<ShaderStage>,
    vertex_layout: VertexLayout,
    primitive: wgpu::PrimitiveState,
    depth_stencil: Option<wgpu::DepthStencilState>,
    color_targets: SmallVec<[wgpu::ColorTargetState; 4]>,
    bindings: BindingLayout,
    multiview_layers: Option<u32>,
    per_object: Option<PerObjectBinder>,
    shared: Option<SharedBinder>,
}

impl fmt::Debug for PipelineConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfiguration")
            .field("label", &self.label)
            .field("vertex", &self.vertex.label)
            .field("fragment", &self.fragment.as_ref().map(|s| &s.label))
            .field("vertex_layout", &self.vertex_layout)
            .field("primitive", &self.primitive)
            .field("depth_stencil", &self.depth_stencil)
            .field("color_targets", &self.color_targets)
            .field("bindings", &self.bindings)
            .field("multiview_layers", &self.multiview_layers)
            .finish_non_exhaustive()
    }
}

impl PipelineConfiguration {
    #[must_use]
    pub fn builder(label: impl Into<Cow<'static, str>>) -> PipelineConfigurationBuilder {
        PipelineConfigurationBuilder::new(label.into())
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn vertex(&self) -> &ShaderStage {
        &self.vertex
    }

    #[inline]
    #[must_use]
    pub fn fragment(&self) -> Option<&ShaderStage> {
        self.fragment.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn vertex_layout(&self) -> VertexLayout {
        self.vertex_layout
    }

    #[inline]
    #[must_use]
    pub fn primitive(&self) -> &wgpu::PrimitiveState {
        &self.primitive
    }

    #[inline]
    #[must_use]
    pub fn depth_stencil(&self) -> Option<&wgpu::DepthStencilState> {
        self.depth_stencil.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn color_targets(&self) -> &[wgpu::ColorTargetState] {
        &self.color_targets
    }

    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &BindingLayout {
        &self.bindings
    }

    #[inline]
    #[must_use]
    pub fn multiview_layers(&self) -> Option<u32> {
        self.multiview_layers
    }

    /// Runs the per-object binder, if any.
    pub fn bind_per_object(&self, frame: &mut FrameContext<'_>, binding: Binding) {
        if let Some(binder) = &self.per_object {
            binder(frame, &self.bindings, binding);
        }
    }

    /// Runs the shared-resource binder, if any.
    pub fn bind_shared(&self, frame: &mut FrameContext<'_>, shared: &dyn SharedResource) {
        if let Some(binder) = &self.shared {
            binder(frame, &self.bindings, shared);
        }
    }
}

// ─── Builder ──────────────────────────────────────────────────────────────────

pub struct PipelineConfigurationBuilder {
    label: Cow<'static, str>,
    vertex: Option<ShaderStage>,
    fragment: Option<ShaderStage>,
    vertex_layout: VertexLayout,
    primitive: wgpu::PrimitiveState,
    depth_stencil: Option<wgpu::DepthStencilState>,
    color_targets: SmallVec<[wgpu::ColorTargetState; 4]>,
    bindings: BindingLayout,
    multiview_layers: Option<u32>,
    per_object: Option<PerObjectBinder>,
    shared: Option<SharedBinder>,
}

impl PipelineConfigurationBuilder {
    fn new(label: Cow<'static, str>) -> Self {
        Self {
            label,
            vertex: None,
            fragment: None,
            vertex_layout: VertexLayout::empty(),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: None,
            color_targets: SmallVec::new(),
            bindings: BindingLayout::default(),
            multiview_layers: None,
            per_object: None,
            shared: None,
        }
    }

    #[must_use]
    pub fn vertex(mut self, stage: ShaderStage) -> Self {
        self.vertex = Some(stage);
        self
    }

    #[must_use]
    pub fn fragment(mut self, stage: ShaderStage) -> Self {
        self.fragment = Some(stage);
        self
    }

    #[must_use]
    pub fn vertex_layout(mut self, layout: VertexLayout) -> Self {
        self.vertex_layout = layout;
        self
    }

    #[must_use]
    pub fn topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.primitive.topology = topology;
        self
    }

    #[must_use]
    pub fn cull_mode(mut self, cull_mode: Option<wgpu::Face>) -> Self {
        self.primitive.cull_mode = cull_mode;
        self
    }

    #[must_use]
    pub fn polygon_mode(mut self, mode: wgpu::PolygonMode) -> Self {
        self.primitive.polygon_mode = mode;
        self
    }

    #[must_use]
    pub fn depth_stencil(mut self, state: wgpu::DepthStencilState) -> Self {
        self.depth_stencil = Some(state);
        self
    }

    #[must_use]
    pub fn color_target(mut self, format: wgpu::TextureFormat, blend: Option<wgpu::BlendState>) -> Self {
        self.color_targets.push(wgpu::ColorTargetState {
            format,
            blend,
            write_mask: wgpu::ColorWrites::ALL,
        });
        self
    }

    /// Color target with an explicit write mask.
    #[must_use]
    pub fn color_target_with_mask(
        mut self,
        format: wgpu::TextureFormat,
        blend: Option<wgpu::BlendState>,
        write_mask: wgpu::ColorWrites,
    ) -> Self {
        self.color_targets.push(wgpu::ColorTargetState {
            format,
            blend,
            write_mask,
        });
        self
    }

    #[must_use]
    pub fn bindings(mut self, layout: BindingLayout) -> Self {
        self.bindings = layout;
        self
    }

    /// Renders every draw into `layers` array layers at once.
    #[must_use]
    pub fn multiview(mut self, layers: u32) -> Self {
        self.multiview_layers = Some(layers);
        self
    }

    #[must_use]
    pub fn per_object(
        mut self,
        binder: impl Fn(&mut FrameContext<'_>, &BindingLayout, Binding) + 'static,
    ) -> Self {
        self.per_object = Some(Box::new(binder));
        self
    }

    #[must_use]
    pub fn shared(
        mut self,
        binder: impl Fn(&mut FrameContext<'_>, &BindingLayout, &dyn SharedResource) + 'static,
    ) -> Self {
        self.shared = Some(Box::new(binder));
        self
    }

    /// Validates and finishes the configuration.
    pub fn build(self) -> Result<PipelineConfiguration> {
        let invalid = |reason: &str| UmbraError::InvalidPipeline {
            label: self.label.to_string(),
            reason: reason.to_owned(),
        };

        let Some(vertex) = self.vertex.clone() else {
            return Err(invalid("missing vertex stage"));
        };
        if !self.vertex_layout.is_empty() && self.vertex_layout.bits().count_ones() != 1 {
            return Err(invalid("vertex layout must name exactly one layout"));
        }
        if self.fragment.is_none() && !self.color_targets.is_empty() {
            return Err(invalid("color targets without a fragment stage"));
        }
        if self.color_targets.len() > 8 {
            return Err(invalid("more than 8 color targets"));
        }
        if self.multiview_layers == Some(0) {
            return Err(invalid("multiview layer count must be positive"));
        }
        if self.depth_stencil.is_none() && self.color_targets.is_empty() {
            return Err(invalid("pipeline writes no attachment"));
        }

        Ok(PipelineConfiguration {
            label: self.label,
            vertex,
            fragment: self.fragment,
            vertex_layout: self.vertex_layout,
            primitive: self.primitive,
            depth_stencil: self.depth_stencil,
            color_targets: self.color_targets,
            bindings: self.bindings,
            multiview_layers: self.multiview_layers,
            per_object: self.per_object,
            shared: self.shared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> ShaderStage {
        ShaderStage {
            label: "test".into(),
            source: Rc::from("@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(); }"),
            entry_point: "vs_main",
        }
    }

    #[test]
    fn missing_vertex_stage_is_rejected() {
        let err = PipelineConfiguration::builder("broken")
            .color_target(wgpu::TextureFormat::Rgba8Unorm, None)
            .build()
            .unwrap_err();
        assert!(matches!(err, UmbraError::InvalidPipeline { .. }));
    }

    #[test]
    fn wildcard_vertex_layout_is_rejected() {
        let err = PipelineConfiguration::builder("wildcard")
            .vertex(stage())
            .fragment(stage())
            .vertex_layout(VertexLayout::ALL)
            .color_target(wgpu::TextureFormat::Rgba8Unorm, None)
            .build()
            .unwrap_err();
        assert!(matches!(err, UmbraError::InvalidPipeline { .. }));
    }

    #[test]
    fn depth_only_pipeline_builds() {
        let config = PipelineConfiguration::builder("depth only")
            .vertex(stage())
            .vertex_layout(VertexLayout::PNTBT)
            .depth_stencil(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: Some(true),
                depth_compare: Some(wgpu::CompareFunction::Less),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            })
            .multiview(4)
            .build()
            .unwrap();
        assert!(config.fragment().is_none());
        assert_eq!(config.multiview_layers(), Some(4));
        assert_eq!(config.primitive().cull_mode, Some(wgpu::Face::Back));
    }
}
