//! Shadow Algorithm Tests
//!
//! Tests for:
//! - Cascade split distances (linear and practical)
//! - Frustum corner extraction
//! - Light-space projections enclosing their cascade slice
//! - GPU cascade data layout

mod common;

use glam::{Mat4, Vec3};

use common::test_camera;
use umbra::renderer::core::TextureId;
use umbra::renderer::graph::shadow_utils::{
    CascadeGpuData, MAX_CASCADES, build_cascade_projection, build_light_view, compute_cascade_splits,
    compute_cascades, frustum_center, frustum_corners_world,
};
use umbra::renderer::{CascadeSplit, ShadowSettings};
use umbra::scene::ShadowSource;

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn sun() -> ShadowSource {
    ShadowSource {
        direction: Vec3::new(-0.3, -1.0, -0.2).normalize(),
        up: Vec3::Z,
        shadow_map: TextureId::default(),
    }
}

// ============================================================================
// Cascade Splits
// ============================================================================

#[test]
fn four_cascades_cover_the_full_range() {
    let camera = test_camera();
    let cascades = compute_cascades(&camera, &sun(), &ShadowSettings::default());

    assert_eq!(cascades.len(), 4);
    assert!(
        cascades.windows(2).all(|w| w[0].far_distance < w[1].far_distance),
        "far distances must be strictly increasing"
    );
    assert!(
        approx(cascades[3].far_distance, camera.far),
        "last cascade should end at the camera far plane, got {}",
        cascades[3].far_distance
    );
}

#[test]
fn linear_split_distances() {
    let camera = test_camera();
    let cascades = compute_cascades(&camera, &sun(), &ShadowSettings::default());
    let range = camera.far - camera.near;
    for (i, cascade) in cascades.iter().enumerate() {
        let expected = camera.near + range * (i + 1) as f32 / 4.0;
        assert!(
            approx(cascade.far_distance, expected),
            "cascade {i}: expected {expected}, got {}",
            cascade.far_distance
        );
    }
}

#[test]
fn practical_split_moves_detail_forward() {
    let linear = compute_cascade_splits(4, 0.1, 100.0, CascadeSplit::Linear);
    let practical = compute_cascade_splits(4, 0.1, 100.0, CascadeSplit::Practical { lambda: 0.9 });
    for i in 0..3 {
        assert!(
            practical[i] < linear[i],
            "practical split {i} ({}) should be closer than linear ({})",
            practical[i],
            linear[i]
        );
    }
    assert_eq!(practical[3], 1.0);
}

#[test]
fn single_cascade_spans_everything() {
    let settings = ShadowSettings {
        cascade_count: 1,
        ..Default::default()
    };
    let camera = test_camera();
    let cascades = compute_cascades(&camera, &sun(), &settings);
    assert_eq!(cascades.len(), 1);
    assert!(approx(cascades[0].far_distance, camera.far));
}

#[test]
fn oversized_cascade_count_is_clamped() {
    let settings = ShadowSettings {
        cascade_count: 12,
        ..Default::default()
    };
    let cascades = compute_cascades(&test_camera(), &sun(), &settings);
    assert_eq!(cascades.len(), MAX_CASCADES as usize);
}

// ============================================================================
// Frustum Corners
// ============================================================================

#[test]
fn corners_of_identity_view() {
    let projection = Mat4::perspective_rh(90.0_f32.to_radians(), 1.0, 1.0, 10.0);
    let corners = frustum_corners_world(Mat4::IDENTITY, projection);

    // Near face at z = -1 with half size 1, far face at z = -10 with half size 10.
    for corner in &corners[..4] {
        assert!(approx(corner.z, -1.0), "near corner z = {}", corner.z);
        assert!(approx(corner.x.abs(), 1.0) && approx(corner.y.abs(), 1.0));
    }
    for corner in &corners[4..] {
        assert!((corner.z + 10.0).abs() < 1e-2, "far corner z = {}", corner.z);
        assert!((corner.x.abs() - 10.0).abs() < 1e-2);
    }

    let center = frustum_center(&corners);
    assert!(approx(center.x, 0.0) && approx(center.y, 0.0));
    assert!((center.z + 5.5).abs() < 1e-2);
}

// ============================================================================
// Light Space
// ============================================================================

#[test]
fn cascade_projection_encloses_slice_corners() {
    let camera = test_camera();
    let (slice_projection, _) = camera.sub_projection(0.0, 0.25);
    let corners = frustum_corners_world(camera.view, slice_projection);

    let light_view = build_light_view(frustum_center(&corners), sun().direction, sun().up);
    let projection = build_cascade_projection(light_view, &corners, 5.0);
    let view_proj = projection * light_view;

    for corner in corners {
        let ndc = view_proj.project_point3(corner);
        assert!(
            ndc.x.abs() <= 1.001 && ndc.y.abs() <= 1.001,
            "corner {corner} projects outside the cascade: {ndc}"
        );
        assert!(
            (-0.001..=1.001).contains(&ndc.z),
            "corner {corner} is clipped in depth: {}",
            ndc.z
        );
    }
}

#[test]
fn light_view_handles_straight_down_light() {
    let view = build_light_view(Vec3::ZERO, Vec3::NEG_Y, Vec3::Z);
    assert!(!view.is_nan(), "a light parallel to world up must use its own up vector");
}

// ============================================================================
// GPU Layout
// ============================================================================

#[test]
fn cascade_gpu_data_is_std430_aligned() {
    assert_eq!(std::mem::size_of::<CascadeGpuData>(), 80);
    assert_eq!(std::mem::size_of::<CascadeGpuData>() % 16, 0);

    let cascades = compute_cascades(&test_camera(), &sun(), &ShadowSettings::default());
    let gpu = cascades[1].to_gpu();
    assert!(approx(gpu.far_distance, cascades[1].far_distance));
    assert_eq!(gpu.padding, [0.0; 3]);
    assert_eq!(Mat4::from_cols_array_2d(&gpu.view_proj), cascades[1].view_projection());
}
