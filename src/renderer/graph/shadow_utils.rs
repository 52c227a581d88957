//! Shadow Utilities
//!
//! Pure math for cascaded shadow maps, kept out of the shadow pass for reuse
//! and testability.
//!
//! # Provided Functions
//!
//! - Cascade split computation (linear or practical split scheme)
//! - Frustum corner extraction in world space
//! - Light-space view and padded orthographic projection per cascade
//! - [`compute_cascades`], the whole pipeline for one directional light

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use smallvec::SmallVec;

use crate::renderer::settings::{CascadeSplit, ShadowSettings};
use crate::scene::camera::Camera;
use crate::scene::renderable::ShadowSource;

/// Maximum cascade count per directional light.
pub const MAX_CASCADES: u32 = 4;

/// Cascade data as laid out in the shadow and lighting shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CascadeGpuData {
    pub view_proj: [[f32; 4]; 4],
    pub far_distance: f32,
    pub padding: [f32; 3],
}

/// One cascade of a directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeSlice {
    pub view: Mat4,
    pub projection: Mat4,
    /// View-space distance of the slice's far plane.
    pub far_distance: f32,
}

impl CascadeSlice {
    #[inline]
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    #[must_use]
    pub fn to_gpu(&self) -> CascadeGpuData {
        CascadeGpuData {
            view_proj: self.view_projection().to_cols_array_2d(),
            far_distance: self.far_distance,
            padding: [0.0; 3],
        }
    }
}

pub type Cascades = SmallVec<[CascadeSlice; MAX_CASCADES as usize]>;

// ============================================================================
// Cascade Split Computation
// ============================================================================

/// Far fraction of `[near, far]` for every cascade.
///
/// Linear splits give `(i + 1) / n`. The practical scheme blends uniform and
/// logarithmic distances by `lambda`. The last fraction is always exactly 1.
#[must_use]
pub fn compute_cascade_splits(
    cascade_count: u32,
    near: f32,
    far: f32,
    split: CascadeSplit,
) -> SmallVec<[f32; MAX_CASCADES as usize]> {
    let n = cascade_count.clamp(1, MAX_CASCADES) as usize;
    let range = far - near;

    let mut fractions: SmallVec<[f32; MAX_CASCADES as usize]> = (0..n)
        .map(|i| {
            let p = (i + 1) as f32 / n as f32;
            match split {
                CascadeSplit::Linear => p,
                CascadeSplit::Practical { lambda } => {
                    let log_split = near * (far / near).powf(p);
                    let uni_split = near + range * p;
                    let distance = lambda * log_split + (1.0 - lambda) * uni_split;
                    (distance - near) / range
                }
            }
        })
        .collect();

    if let Some(last) = fractions.last_mut() {
        *last = 1.0;
    }
    fractions
}

// ============================================================================
// Frustum Corners in World Space
// ============================================================================

/// The 8 world-space corners of the frustum of `projection * view`.
///
/// NDC corners with x, y in {-1, 1} and z in {0, 1} are transformed by the
/// inverse and perspective-divided. Near face first.
#[must_use]
pub fn frustum_corners_world(view: Mat4, projection: Mat4) -> [Vec3; 8] {
    let inverse = (projection * view).inverse();
    let mut corners = [Vec3::ZERO; 8];
    let mut i = 0;
    for z in [0.0, 1.0] {
        for y in [-1.0, 1.0] {
            for x in [-1.0, 1.0] {
                let p = inverse * Vec4::new(x, y, z, 1.0);
                corners[i] = p.truncate() / p.w;
                i += 1;
            }
        }
    }
    corners
}

#[must_use]
pub fn frustum_center(corners: &[Vec3; 8]) -> Vec3 {
    corners.iter().copied().sum::<Vec3>() / 8.0
}

// ============================================================================
// Light Space
// ============================================================================

/// View matrix looking from `center` along `forward`.
///
/// World up (+Y) is used unless `forward` is parallel to it, in which case
/// the light's own `up` is used.
#[must_use]
pub fn build_light_view(center: Vec3, forward: Vec3, up: Vec3) -> Mat4 {
    let forward = forward.normalize_or(Vec3::NEG_Z);
    let up = if forward.cross(Vec3::Y).length_squared() < 1e-8 {
        up
    } else {
        Vec3::Y
    };
    Mat4::look_at_rh(center, center + forward, up)
}

/// Orthographic projection around light-space `corners`, with the z extent
/// pushed away from zero by `depth_multiplier`.
#[must_use]
pub fn build_cascade_projection(light_view: Mat4, corners: &[Vec3; 8], depth_multiplier: f32) -> Mat4 {
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for corner in corners {
        let p = light_view.transform_point3(*corner);
        min = min.min(p);
        max = max.max(p);
    }

    let m = depth_multiplier;
    min.z = if min.z < 0.0 { min.z * m } else { min.z / m };
    max.z = if max.z < 0.0 { max.z / m } else { max.z * m };

    // Right-handed view looks down -Z; near/far are positive distances.
    Mat4::orthographic_rh(min.x, max.x, min.y, max.y, -max.z, -min.z)
}

// ============================================================================
// High-level
// ============================================================================

/// Cascades of one directional light for the active camera.
#[must_use]
pub fn compute_cascades(camera: &Camera, light: &ShadowSource, settings: &ShadowSettings) -> Cascades {
    let fractions =
        compute_cascade_splits(settings.effective_cascade_count(), camera.near, camera.far, settings.split);

    let mut cascades = Cascades::new();
    let mut previous = 0.0;
    for far_fraction in fractions {
        let (projection, far_distance) = camera.sub_projection(previous, far_fraction);
        previous = far_fraction;

        let corners = frustum_corners_world(camera.view, projection);
        let view = build_light_view(frustum_center(&corners), light.direction, light.up);
        let projection = build_cascade_projection(view, &corners, settings.depth_multiplier);

        cascades.push(CascadeSlice {
            view,
            projection,
            far_distance,
        });
    }
    cascades
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn linear_fractions_are_uniform() {
        let fractions = compute_cascade_splits(4, 0.1, 100.0, CascadeSplit::Linear);
        assert_eq!(fractions.as_slice(), &[0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn practical_split_is_front_loaded() {
        let fractions = compute_cascade_splits(4, 0.1, 100.0, CascadeSplit::Practical { lambda: 0.75 });
        assert!(fractions[0] < 0.25, "first fraction {} should be below linear", fractions[0]);
        assert!(fractions.windows(2).all(|w| w[0] < w[1]));
        assert!(approx(fractions[3], 1.0));
    }

    #[test]
    fn cascade_count_is_clamped() {
        assert_eq!(compute_cascade_splits(9, 0.1, 10.0, CascadeSplit::Linear).len(), 4);
        assert_eq!(compute_cascade_splits(0, 0.1, 10.0, CascadeSplit::Linear).len(), 1);
    }

    #[test]
    fn light_view_falls_back_to_light_up() {
        let view = build_light_view(Vec3::ZERO, Vec3::NEG_Y, Vec3::Z);
        assert!(!view.is_nan());
        let forward = view.inverse().transform_vector3(Vec3::NEG_Z);
        assert!(approx(forward.y, -1.0));
    }
}
