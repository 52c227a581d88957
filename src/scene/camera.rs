//! Camera
//!
//! The camera contract the render core consumes: a view matrix, projection
//! parameters and a helper that produces the projection of a fractional
//! depth slice for cascade fitting.

use glam::{Mat4, Vec3};

use super::frustum::Frustum;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Vertical field of view in radians.
    Perspective { fov_y: f32, aspect: f32 },
    /// View volume width and height in world units.
    Orthographic { width: f32, height: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub projection: Projection,
    pub near: f32,
    pub far: f32,
    pub view: Mat4,
}

impl Camera {
    /// Perspective camera. `fov_y_degrees` is converted to radians.
    #[must_use]
    pub fn new_perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective {
                fov_y: fov_y_degrees.to_radians(),
                aspect,
            },
            near,
            far,
            view: Mat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn new_orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic { width, height },
            near,
            far,
            view: Mat4::IDENTITY,
        }
    }

    /// Places the camera at `eye` looking at `target`.
    #[must_use]
    pub fn looking_at(mut self, eye: Vec3, target: Vec3, up: Vec3) -> Self {
        self.view = Mat4::look_at_rh(eye, target, up);
        self
    }

    #[must_use]
    pub fn with_view(mut self, view: Mat4) -> Self {
        self.view = view;
        self
    }

    /// Updates the aspect ratio of a perspective camera, or rescales the
    /// width of an orthographic one.
    pub fn set_aspect(&mut self, aspect: f32) {
        match &mut self.projection {
            Projection::Perspective { aspect: a, .. } => *a = aspect,
            Projection::Orthographic { width, height } => *width = *height * aspect,
        }
    }

    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_for_range(self.near, self.far)
    }

    #[inline]
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view
    }

    #[must_use]
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(self.view_projection())
    }

    /// World-space eye position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.view.inverse().transform_point3(Vec3::ZERO)
    }

    /// World-space viewing direction (the view's -Z axis).
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.view
            .inverse()
            .transform_vector3(Vec3::NEG_Z)
            .normalize_or_zero()
    }

    /// Projection covering the depth slice between two fractions of
    /// `[near, far]`, and the slice's far distance.
    ///
    /// A fraction outside `[0, 1]` falls back to the camera's own near or far
    /// plane.
    #[must_use]
    pub fn sub_projection(&self, near_fraction: f32, far_fraction: f32) -> (Mat4, f32) {
        let range = self.far - self.near;
        let slice_near = if (0.0..=1.0).contains(&near_fraction) {
            self.near + range * near_fraction
        } else {
            self.near
        };
        let slice_far = if (0.0..=1.0).contains(&far_fraction) {
            self.near + range * far_fraction
        } else {
            self.far
        };
        (self.projection_for_range(slice_near, slice_far), slice_far)
    }

    fn projection_for_range(&self, near: f32, far: f32) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y, aspect } => Mat4::perspective_rh(fov_y, aspect, near, far),
            Projection::Orthographic { width, height } => {
                let w = width * 0.5;
                let h = height * 0.5;
                Mat4::orthographic_rh(-w, w, -h, h, near, far)
            }
        }
    }
}
