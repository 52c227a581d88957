//! Renderable Capability
//!
//! The render core never constructs or owns drawables. Hosts implement
//! [`Renderable`] on their mesh, light and debug components, register an
//! `Rc` of it with the spatial index, and the core keeps only a `Weak`.

use std::fmt;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::renderer::core::{Binding, FrameContext, TextureId};

use super::mask::ObjectMask;

/// Shader resources shared by many renderables (a material, a light's
/// parameters). Bound once per [`CommonResourceGroup`].
///
/// [`CommonResourceGroup`]: super::visibility::CommonResourceGroup
pub trait SharedResource {
    /// Bindings in the order the consuming pipeline's shared callback expects.
    fn bindings(&self) -> &[Binding];
}

/// Identity of a shared resource bundle (pointer identity of its `Rc`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SharedResourceId(usize);

impl SharedResourceId {
    #[must_use]
    pub fn of(resource: &Rc<dyn SharedResource>) -> Self {
        Self(Rc::as_ptr(resource).cast::<()>() as usize)
    }
}

/// Classification plus shared resources of one renderable.
#[derive(Clone)]
pub struct SortData {
    pub mask: ObjectMask,
    pub shared: Rc<dyn SharedResource>,
}

impl fmt::Debug for SortData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortData")
            .field("mask", &self.mask)
            .field("shared", &SharedResourceId::of(&self.shared))
            .finish()
    }
}

/// What the shadow pass needs from a directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSource {
    /// Direction the light travels (world space).
    pub direction: Vec3,
    /// Light up vector, used when `direction` is parallel to world up.
    pub up: Vec3,
    /// Depth array texture with one layer per cascade.
    pub shadow_map: TextureId,
}

pub trait Renderable {
    /// Issues the draw for this instance. The pipeline, shared and
    /// per-instance bindings are already set.
    fn draw(&self, frame: &mut FrameContext<'_>);

    fn sort_data(&self) -> SortData;

    /// Per-instance constants (world and inverse-world matrices).
    fn per_object_data(&self) -> Binding;

    /// Directional lights that cast shadows return their shadow target.
    fn shadow_source(&self) -> Option<ShadowSource> {
        None
    }
}

// ─── GPU Data Layouts ─────────────────────────────────────────────────────────
//
// Layouts the built-in shaders read. Hosts upload these and hand out the
// resulting bindings through `per_object_data` and `SharedResource`.

/// Per-instance constants (`ObjectConstants`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    pub world: [[f32; 4]; 4],
    pub inverse_world: [[f32; 4]; 4],
}

impl ObjectConstants {
    #[must_use]
    pub fn new(world: Mat4) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            inverse_world: world.inverse().to_cols_array_2d(),
        }
    }
}

/// Material parameters (`MaterialData`), bound as a read-only storage buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialData {
    pub base_color: [f32; 4],
    /// Metallic, specular, roughness, emissive strength.
    pub properties: [f32; 4],
}

/// Light parameters (`LightConstants`), bound as a constant buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightConstants {
    /// World position and range.
    pub position_range: [f32; 4],
    /// Color and intensity.
    pub color_intensity: [f32; 4],
    /// Direction the light travels.
    pub direction: [f32; 4],
}

impl LightConstants {
    #[must_use]
    pub fn point(position: Vec3, range: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            position_range: position.extend(range).to_array(),
            color_intensity: color.extend(intensity).to_array(),
            direction: Vec4::ZERO.to_array(),
        }
    }

    #[must_use]
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            position_range: Vec4::ZERO.to_array(),
            color_intensity: color.extend(intensity).to_array(),
            direction: direction.normalize_or_zero().extend(0.0).to_array(),
        }
    }
}
