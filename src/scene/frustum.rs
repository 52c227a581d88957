//! View Frustum
//!
//! Six world-space half-spaces extracted from a view-projection matrix with
//! the Gribb-Hartmann method. Normals point inward and are normalized, so a
//! plane evaluated at a point yields a signed distance (positive inside).
//! Depth follows the wgpu convention, NDC z in `[0, 1]`.

use glam::{Mat4, Vec3, Vec4};

use super::bounds::BoundingBox;

/// Result of classifying a box against a frustum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    Outside,
    Intersects,
    Inside,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    planes: [Vec4; 6], // Left, Right, Bottom, Top, Near, Far
}

impl Frustum {
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [
            rows[3] + rows[0], // Left
            rows[3] - rows[0], // Right
            rows[3] + rows[1], // Bottom
            rows[3] - rows[1], // Top
            rows[2],           // Near (z >= 0)
            rows[3] - rows[2], // Far  (z <= w)
        ];

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > f32::EPSILON {
                *plane /= length;
            }
        }

        Self { planes }
    }

    #[inline]
    #[must_use]
    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    /// Signed distance from `point` to plane `index`.
    #[inline]
    #[must_use]
    pub fn distance(&self, index: usize, point: Vec3) -> f32 {
        self.planes[index].truncate().dot(point) + self.planes[index].w
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
    }

    /// Classifies `aabb` against all six planes.
    ///
    /// Every plane is pushed outward by `epsilon`, so boxes that sit just
    /// outside an edge still report as intersecting.
    #[must_use]
    pub fn classify_aabb(&self, aabb: &BoundingBox, epsilon: f32) -> Containment {
        let mut result = Containment::Inside;
        for plane in &self.planes {
            let normal = plane.truncate();
            let positive_side = normal.cmpge(Vec3::ZERO);
            let p_vertex = Vec3::select(positive_side, aabb.max, aabb.min);
            if normal.dot(p_vertex) + plane.w < -epsilon {
                return Containment::Outside;
            }
            let n_vertex = Vec3::select(positive_side, aabb.min, aabb.max);
            if normal.dot(n_vertex) + plane.w < -epsilon {
                result = Containment::Intersects;
            }
        }
        result
    }

    #[inline]
    #[must_use]
    pub fn intersects_aabb(&self, aabb: &BoundingBox, epsilon: f32) -> bool {
        self.classify_aabb(aabb, epsilon) != Containment::Outside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_frustum() -> Frustum {
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::ZERO, -Vec3::Z, Vec3::Y);
        Frustum::from_matrix(proj * view)
    }

    #[test]
    fn planes_are_normalized() {
        for plane in camera_frustum().planes() {
            assert!((plane.truncate().length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn box_in_front_is_inside() {
        let b = BoundingBox::from_center_extents(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE);
        assert_eq!(camera_frustum().classify_aabb(&b, 0.0), Containment::Inside);
    }

    #[test]
    fn box_behind_is_outside() {
        let b = BoundingBox::from_center_extents(Vec3::new(0.0, 0.0, 10.0), Vec3::ONE);
        assert_eq!(camera_frustum().classify_aabb(&b, 0.1), Containment::Outside);
    }

    #[test]
    fn epsilon_keeps_box_just_past_far_plane() {
        let b = BoundingBox::new(Vec3::new(-1.0, -1.0, -100.08), Vec3::new(1.0, 1.0, -100.05));
        let frustum = camera_frustum();
        assert!(!frustum.intersects_aabb(&b, 0.0));
        assert!(frustum.intersects_aabb(&b, 0.1));
    }
}
