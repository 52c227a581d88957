//! Pipeline Cache Tests
//!
//! Tests for:
//! - Mask lookup picks the most specific covering filter
//! - Registration order breaks specificity ties
//! - Duplicate filters (strict and lenient caches)
//! - Shader library rendering of embedded templates
//! - Binding layout slot order

mod common;

use std::rc::Rc;

use common::{MockDevice, lit_opaque_mask, point_light_mask};
use umbra::UmbraError;
use umbra::renderer::pipeline::{
    BindingLayout, BindingLayoutBuilder, PipelineCache, PipelineConfiguration, ReadableKind, ShaderDefines,
    ShaderLibrary, ShaderStage, SlotKind, StaticSampler,
};
use umbra::scene::{BlendMode, FillMode, ObjectMask, ShadingModel, VertexLayout};

fn stage() -> ShaderStage {
    ShaderStage {
        label: "test".into(),
        source: Rc::from("@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(); }"),
        entry_point: "vs_main",
    }
}

fn config(label: &'static str) -> PipelineConfiguration {
    PipelineConfiguration::builder(label)
        .vertex(stage())
        .fragment(stage())
        .vertex_layout(VertexLayout::PNTBT)
        .color_target(wgpu::TextureFormat::Rgba16Float, None)
        .build()
        .expect("valid configuration")
}

/// PNTBT, lit, opaque or masked, any fill.
fn broad_filter() -> ObjectMask {
    ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_shading_model(ShadingModel::DEFAULT_LIT)
        .with_blend_mode(BlendMode::OPAQUE | BlendMode::MASKED)
        .with_fill_mode(FillMode::ALL)
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn most_specific_filter_wins() {
    let mut device = MockDevice::new();
    let mut cache = PipelineCache::new();

    // Register the broad filter first so lookup order cannot come from insertion.
    let broad = cache.insert(&mut device, broad_filter(), config("Broad")).unwrap();
    let narrow = cache.insert(&mut device, lit_opaque_mask(), config("Narrow")).unwrap();

    let hit = cache.get_pipeline_for_mask(&lit_opaque_mask()).expect("covered");
    assert_eq!(hit.id, narrow, "the narrower filter must be preferred");

    let masked = lit_opaque_mask().with_blend_mode(BlendMode::MASKED);
    let hit = cache.get_pipeline_for_mask(&masked).expect("covered by broad");
    assert_eq!(hit.id, broad);
    assert_eq!(hit.config.label(), "Broad");
}

#[test]
fn ties_go_to_the_first_registration() {
    let mut device = MockDevice::new();
    let mut cache = PipelineCache::new();

    let solid_or_wire = lit_opaque_mask().with_fill_mode(FillMode::SOLID | FillMode::WIRE);
    let opaque_or_masked = lit_opaque_mask().with_blend_mode(BlendMode::OPAQUE | BlendMode::MASKED);
    assert_eq!(solid_or_wire.specificity(), opaque_or_masked.specificity());

    let first = cache.insert(&mut device, solid_or_wire, config("First")).unwrap();
    cache.insert(&mut device, opaque_or_masked, config("Second")).unwrap();

    let hit = cache.get_pipeline_for_mask(&lit_opaque_mask()).unwrap();
    assert_eq!(hit.id, first);
    assert_eq!(hit.order(), 0);
}

#[test]
fn uncovered_mask_has_no_pipeline() {
    let mut device = MockDevice::new();
    let mut cache = PipelineCache::new();
    cache.insert(&mut device, broad_filter(), config("Broad")).unwrap();

    assert!(cache.get_pipeline_for_mask(&point_light_mask()).is_none());
    assert_eq!(cache.len(), 1);
}

// ============================================================================
// Duplicates
// ============================================================================

#[test]
fn strict_cache_rejects_duplicate_filter() {
    let mut device = MockDevice::new();
    let mut cache = PipelineCache::strict();
    cache.insert(&mut device, broad_filter(), config("A")).unwrap();

    let err = cache.insert(&mut device, broad_filter(), config("B")).unwrap_err();
    assert!(matches!(err, UmbraError::DuplicatePipelineFilter(mask) if mask == broad_filter()));
    assert_eq!(device.pipelines.len(), 1, "the rejected configuration must not be compiled");
}

#[test]
fn lenient_cache_keeps_first_pipeline() {
    let mut device = MockDevice::new();
    let mut cache = PipelineCache::new();
    let first = cache.insert(&mut device, broad_filter(), config("A")).unwrap();
    let second = cache.insert(&mut device, broad_filter(), config("B")).unwrap();

    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&broad_filter()).unwrap().config.label(), "A");
    assert_eq!(device.pipelines.len(), 1);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn color_targets_require_fragment_stage() {
    let err = PipelineConfiguration::builder("no fragment")
        .vertex(stage())
        .color_target(wgpu::TextureFormat::Rgba8Unorm, None)
        .build()
        .unwrap_err();
    assert!(matches!(err, UmbraError::InvalidPipeline { .. }));
}

#[test]
fn masked_color_target_keeps_write_mask() {
    let config = PipelineConfiguration::builder("stencil mark")
        .vertex(stage())
        .fragment(stage())
        .color_target_with_mask(wgpu::TextureFormat::Rgba16Float, None, wgpu::ColorWrites::empty())
        .build()
        .unwrap();
    assert_eq!(config.color_targets()[0].write_mask, wgpu::ColorWrites::empty());
}

#[test]
fn binding_layout_orders_slots() {
    let layout = BindingLayout::builder()
        .readable(ReadableKind::DEPTH_ARRAY)
        .constants(3)
        .sampler(StaticSampler::ShadowComparison)
        .build();

    assert_eq!(layout.constant_count(), 3);
    assert_eq!(layout.readable_slot(0), 3);
    assert_eq!(layout.sampler_slot(0), 4);
    assert_eq!(layout.resource_count(), 4);
    assert_eq!(layout.slots()[3], SlotKind::Readable(ReadableKind::DEPTH_ARRAY));
}

#[test]
fn shared_builder_extends_per_pipeline() {
    fn common_bindings() -> BindingLayoutBuilder {
        BindingLayout::builder().constants(2).readable(ReadableKind::TEXTURE_2D)
    }

    let plain = common_bindings().build();
    let shadowed = common_bindings()
        .readable(ReadableKind::DEPTH_ARRAY)
        .sampler(StaticSampler::ShadowComparison)
        .build();

    assert_eq!(plain.resource_count(), 3);
    assert_eq!(shadowed.resource_count(), 4);
    assert_eq!(shadowed.readable_slot(1), 3);
    assert_eq!(shadowed.sampler_slot(0), 4);
}

// ============================================================================
// Shader Library
// ============================================================================

#[test]
fn shader_library_renders_cascade_count() {
    let mut shaders = ShaderLibrary::new(ShaderDefines { cascade_count: 3 });
    let source = shaders.source("light_directional").expect("embedded shader");
    assert!(source.contains("3u"), "cascade count should be substituted into the template");
    assert!(!source.contains("{{"), "no template markers may survive rendering");

    let again = shaders.source("light_directional.wgsl").unwrap();
    assert_eq!(shaders.cached_count(), 2, "names with and without extension are cached separately");
    assert_eq!(again, source);
}

#[test]
fn unknown_shader_is_an_error() {
    let mut shaders = ShaderLibrary::new(ShaderDefines { cascade_count: 4 });
    let err = shaders.stage("does_not_exist", "vs_main").unwrap_err();
    assert!(matches!(err, UmbraError::ShaderNotFound(_)));
}
