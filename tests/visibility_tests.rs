//! Spatial Index Tests
//!
//! Tests for:
//! - Registration, update and removal with generation-checked handles
//! - Deferred tree rebuild on tick
//! - Frustum culling of registered boxes
//! - Extraction into draw packets and merging without duplicates
//! - Filter coverage of object masks

mod common;

use std::rc::Rc;

use glam::Vec3;

use common::{
    TestRenderable, TestShared, directional_light_mask, lit_opaque_mask, point_light_mask, renderable,
    test_camera, translucent_mask, unit_box,
};
use umbra::renderer::VisibilitySettings;
use umbra::renderer::graph::passes::{GBufferPass, LightPass};
use umbra::scene::{
    BlendMode, BoundingBox, Camera, DrawPackets, FillMode, LightType, ObjectMask, ShadingModel, SpatialIndex,
    VertexLayout,
};

// ============================================================================
// Registration
// ============================================================================

#[test]
fn register_update_unregister() {
    let mut index = SpatialIndex::new(VisibilitySettings::default());
    let (_, mesh) = renderable(TestRenderable::new(lit_opaque_mask(), TestShared::new(1)));

    let handle = index.register(&mesh, unit_box(Vec3::ZERO));
    assert_eq!(index.len(), 1);
    assert!(index.contains(handle));
    assert!(index.needs_rebuild(), "registration should mark the tree dirty");

    index.tick();
    assert!(!index.needs_rebuild());

    let moved = unit_box(Vec3::new(5.0, 0.0, 0.0));
    assert!(index.update(handle, moved));
    assert_eq!(index.bounds(handle), Some(moved));
    assert!(index.needs_rebuild());

    assert!(index.unregister(handle));
    assert!(!index.contains(handle));
    assert!(index.is_empty());
}

#[test]
fn stale_handle_is_rejected() {
    let mut index = SpatialIndex::default();
    let (_, mesh) = renderable(TestRenderable::new(lit_opaque_mask(), TestShared::new(1)));

    let first = index.register(&mesh, unit_box(Vec3::ZERO));
    assert!(index.unregister(first));

    // The slot is reused, but the old handle must not resolve to it.
    let second = index.register(&mesh, unit_box(Vec3::ONE));
    assert_ne!(first, second);
    assert!(!index.update(first, unit_box(Vec3::ZERO)), "stale update must fail");
    assert!(!index.unregister(first), "stale unregister must fail");
    assert!(index.contains(second));
    assert_eq!(index.bounds(second), Some(unit_box(Vec3::ONE)));
}

// ============================================================================
// Culling
// ============================================================================

#[test]
fn queries_see_boxes_as_of_last_tick() {
    let mut index = SpatialIndex::default();
    let camera = test_camera();
    let (_, mesh) = renderable(TestRenderable::new(lit_opaque_mask(), TestShared::new(1)));

    let handle = index.register(&mesh, unit_box(Vec3::ZERO));
    assert!(
        index.frustum_culling(camera.view_projection()).is_empty(),
        "nothing is visible before the first tick"
    );

    index.tick();
    assert_eq!(index.frustum_culling(camera.view_projection()), vec![handle]);

    // Move it behind the camera; the old box answers until the next tick.
    index.update(handle, unit_box(Vec3::new(0.0, 0.0, 50.0)));
    assert_eq!(index.frustum_culling(camera.view_projection()).len(), 1);
    index.tick();
    assert!(index.frustum_culling(camera.view_projection()).is_empty());
}

#[test]
fn moving_far_off_axis_leaves_the_frustum() {
    let mut index = SpatialIndex::default();
    let camera = Camera::new_perspective(60.0, 16.0 / 9.0, 0.1, 1000.0).looking_at(
        Vec3::new(0.0, 0.0, 5.0),
        Vec3::ZERO,
        Vec3::Y,
    );
    let (_, mesh) = renderable(TestRenderable::new(lit_opaque_mask(), TestShared::new(1)));

    let handle = index.register(&mesh, BoundingBox::from_center_extents(Vec3::ZERO, Vec3::ONE));
    index.tick();
    assert_eq!(index.frustum_culling(camera.view_projection()), vec![handle]);

    index.update(handle, BoundingBox::from_center_extents(Vec3::new(10000.0, 0.0, 0.0), Vec3::ONE));
    index.tick();
    assert!(index.frustum_culling(camera.view_projection()).is_empty());
}

#[test]
fn culling_selects_only_visible_boxes() {
    let mut index = SpatialIndex::default();
    let camera = test_camera();
    let shared = TestShared::new(1);

    let mut visible = Vec::new();
    let mut keep = Vec::new();
    for i in 0..50 {
        let (_, mesh) = renderable(TestRenderable::new(lit_opaque_mask(), Rc::clone(&shared)));
        let x = (i % 10) as f32 - 5.0;
        let y = (i / 10) as f32 - 2.0;
        visible.push(index.register(&mesh, unit_box(Vec3::new(x, y, 0.0))));
        keep.push(mesh);
    }
    for i in 0..20 {
        let (_, mesh) = renderable(TestRenderable::new(lit_opaque_mask(), Rc::clone(&shared)));
        index.register(&mesh, unit_box(Vec3::new(i as f32, 0.0, 40.0)));
        keep.push(mesh);
    }
    index.tick();

    let mut culled = index.frustum_culling(camera.view_projection());
    culled.sort();
    visible.sort();
    assert_eq!(culled, visible, "boxes behind the camera must be culled");
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn extraction_groups_by_mask_and_shared_resource() {
    let mut index = SpatialIndex::default();
    let camera = test_camera();
    let material_a = TestShared::new(1);
    let material_b = TestShared::new(1);

    let meshes: Vec<_> = [
        (lit_opaque_mask(), &material_a),
        (lit_opaque_mask(), &material_a),
        (lit_opaque_mask(), &material_b),
        (translucent_mask(), &material_a),
    ]
    .into_iter()
    .map(|(mask, shared)| renderable(TestRenderable::new(mask, Rc::clone(shared))).1)
    .collect();
    for mesh in &meshes {
        index.register(mesh, unit_box(Vec3::ZERO));
    }
    index.tick();

    let packets = index.extract_from_frustum(GBufferPass::LIT_SOLID_FILTER, camera.view_projection());
    assert_eq!(packets.len(), 1, "translucent mesh is not covered by the opaque filter");
    assert_eq!(packets.renderable_count(), 3);

    let packet = packets.get(&lit_opaque_mask()).expect("opaque packet");
    assert_eq!(packet.groups.len(), 2, "two distinct materials");
}

#[test]
fn expand_does_not_duplicate_renderables() {
    let mut index = SpatialIndex::default();
    let camera = test_camera();
    let (_, mesh) = renderable(TestRenderable::new(lit_opaque_mask(), TestShared::new(1)));
    let handle = index.register(&mesh, unit_box(Vec3::ZERO));
    index.tick();

    let mut packets = index.extract_from_frustum(GBufferPass::LIT_SOLID_FILTER, camera.view_projection());
    index.expand_by_filter_from_frustum(GBufferPass::LIT_SOLID_FILTER, camera.view_projection(), &mut packets);
    index.expand_by_filter_from_all(GBufferPass::LIT_SOLID_FILTER, &mut packets);

    assert_eq!(packets.renderable_count(), 1, "same renderable merged three times");
    assert!(packets.contains(handle));
}

#[test]
fn expand_from_all_ignores_the_frustum() {
    let mut index = SpatialIndex::default();
    let (_, sun) = renderable(TestRenderable::new(directional_light_mask(), TestShared::new(1)));
    index.register(&sun, unit_box(Vec3::new(0.0, 0.0, 500.0)));
    index.tick();

    let mut packets = DrawPackets::new();
    index.expand_by_filter_from_all(LightPass::DIRECTIONAL_FILTER, &mut packets);
    assert_eq!(packets.renderable_count(), 1);

    let culled = index.extract_from_frustum(LightPass::DIRECTIONAL_FILTER, test_camera().view_projection());
    assert!(culled.is_empty());
}

#[test]
fn dropped_renderables_are_skipped() {
    let mut index = SpatialIndex::default();
    let (_, mesh) = renderable(TestRenderable::new(lit_opaque_mask(), TestShared::new(1)));
    let handle = index.register(&mesh, unit_box(Vec3::ZERO));
    index.tick();
    drop(mesh);

    let packets = index.extract(GBufferPass::LIT_SOLID_FILTER, &[handle]);
    assert!(packets.is_empty(), "an expired renderable must not be extracted");
    assert!(index.contains(handle), "the entry stays until unregistered");
}

// ============================================================================
// Mask Coverage
// ============================================================================

#[test]
fn filter_covers_subsets_only() {
    let filter = ObjectMask::new()
        .with_vertex_layout(VertexLayout::PNTBT)
        .with_shading_model(ShadingModel::DEFAULT_LIT)
        .with_blend_mode(BlendMode::OPAQUE | BlendMode::MASKED)
        .with_fill_mode(FillMode::SOLID);

    assert!(filter.covers(&lit_opaque_mask()));
    assert!(filter.covers(&lit_opaque_mask().with_blend_mode(BlendMode::MASKED)));
    assert!(!filter.covers(&translucent_mask()));
    assert!(!filter.covers(&lit_opaque_mask().with_fill_mode(FillMode::WIRE)));
    assert!(!filter.covers(&point_light_mask()), "a filter without light bits rejects lights");
}

#[test]
fn light_filters_split_by_type() {
    assert!(LightPass::POINT_FILTER.covers(&point_light_mask()));
    assert!(!LightPass::POINT_FILTER.covers(&directional_light_mask()));
    assert!(LightPass::DIRECTIONAL_FILTER.covers(&directional_light_mask()));
    assert!(!LightPass::DIRECTIONAL_FILTER.covers(&lit_opaque_mask().with_light_type(LightType::POINT)));
}

#[test]
fn mask_bits_follow_field_layout() {
    let mask = lit_opaque_mask().with_light_type(LightType::DIRECTIONAL);
    assert_eq!(ObjectMask::from_bits(mask.to_bits()), mask);
    assert_eq!(mask.to_bits() & 0xF, u32::from(VertexLayout::PNTBT.bits()));
    assert_eq!((mask.to_bits() >> 20) & 0xF, u32::from(LightType::DIRECTIONAL.bits()));
    assert!(mask.is_concrete());
    assert!(!ObjectMask::all().is_concrete());
}
