//! Object Classification Masks
//!
//! An [`ObjectMask`] classifies a renderable along five independent axes.
//! Concrete renderables report at most one flag per field; render passes and
//! pipeline caches use masks as *filters*, where a field may hold several
//! flags or its `ALL` wildcard.
//!
//! # Covering
//!
//! `filter.covers(object)` holds when, for every field, each flag the object
//! sets is also set in the filter. An empty object field is therefore covered
//! by any filter, and an `ALL` filter field admits anything.
//!
//! # Packed Layout
//!
//! [`ObjectMask::to_bits`] packs the fields into a `u32`. Every wildcard is an
//! all-ones pattern confined to its field, so the packed test
//! `(object & filter) == object` agrees with the field-wise one.
//!
//! | Field          | Bits     |
//! |----------------|----------|
//! | `VertexLayout` | `0..4`   |
//! | `ShadingModel` | `4..8`   |
//! | `BlendMode`    | `8..16`  |
//! | `FillMode`     | `16..20` |
//! | `LightType`    | `20..24` |

use std::ops::BitOr;

use bitflags::bitflags;

bitflags! {
    /// Vertex stream layout a renderable is drawn with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct VertexLayout: u8 {
        /// Position only.
        const POSITION = 1 << 0;
        /// Position, normal, texcoord, tangent, bitangent.
        const PNTBT = 1 << 1;
        const ALL = 0x0F;
    }
}

bitflags! {
    /// Lighting model of a material.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct ShadingModel: u8 {
        const DEFAULT_LIT = 1 << 0;
        const UNLIT = 1 << 1;
        const ALL = 0x0F;
    }
}

bitflags! {
    /// How a material combines with what is already in the target.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct BlendMode: u8 {
        const OPAQUE = 1 << 0;
        const MASKED = 1 << 1;
        const TRANSLUCENT = 1 << 2;
        /// Editor/debug geometry such as collision shapes.
        const DEBUG = 1 << 3;
        const ALL = 0xFF;
    }
}

bitflags! {
    /// Rasterization fill.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct FillMode: u8 {
        const SOLID = 1 << 0;
        const WIRE = 1 << 1;
        const ALL = 0x0F;
    }
}

bitflags! {
    /// Light volume kind. Empty for anything that is not a light.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct LightType: u8 {
        const POINT = 1 << 0;
        const DIRECTIONAL = 1 << 1;
        const ALL = 0x0F;
        const NON_DIRECTIONAL = Self::ALL.bits() & !Self::DIRECTIONAL.bits();
    }
}

const VERTEX_SHIFT: u32 = 0;
const SHADING_SHIFT: u32 = 4;
const BLEND_SHIFT: u32 = 8;
const FILL_SHIFT: u32 = 16;
const LIGHT_SHIFT: u32 = 20;

/// Classification of a renderable, or a filter over classifications.
///
/// Built with chainable setters:
///
/// ```rust
/// use umbra::scene::mask::{BlendMode, FillMode, ObjectMask, ShadingModel, VertexLayout};
///
/// let filter = ObjectMask::new()
///     .with_vertex_layout(VertexLayout::PNTBT)
///     .with_shading_model(ShadingModel::DEFAULT_LIT)
///     .with_blend_mode(BlendMode::OPAQUE | BlendMode::MASKED)
///     .with_fill_mode(FillMode::SOLID);
///
/// let object = ObjectMask::new()
///     .with_vertex_layout(VertexLayout::PNTBT)
///     .with_shading_model(ShadingModel::DEFAULT_LIT)
///     .with_blend_mode(BlendMode::MASKED)
///     .with_fill_mode(FillMode::SOLID);
///
/// assert!(filter.covers(&object));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectMask {
    vertex_layout: VertexLayout,
    shading_model: ShadingModel,
    blend_mode: BlendMode,
    fill_mode: FillMode,
    light_type: LightType,
}

impl ObjectMask {
    /// An empty mask: every field unset.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertex_layout: VertexLayout::empty(),
            shading_model: ShadingModel::empty(),
            blend_mode: BlendMode::empty(),
            fill_mode: FillMode::empty(),
            light_type: LightType::empty(),
        }
    }

    /// A filter admitting every object.
    #[inline]
    #[must_use]
    pub const fn all() -> Self {
        Self {
            vertex_layout: VertexLayout::ALL,
            shading_model: ShadingModel::ALL,
            blend_mode: BlendMode::ALL,
            fill_mode: FillMode::ALL,
            light_type: LightType::ALL,
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_vertex_layout(mut self, value: VertexLayout) -> Self {
        self.vertex_layout = value;
        self
    }

    #[inline]
    #[must_use]
    pub const fn with_shading_model(mut self, value: ShadingModel) -> Self {
        self.shading_model = value;
        self
    }

    #[inline]
    #[must_use]
    pub const fn with_blend_mode(mut self, value: BlendMode) -> Self {
        self.blend_mode = value;
        self
    }

    #[inline]
    #[must_use]
    pub const fn with_fill_mode(mut self, value: FillMode) -> Self {
        self.fill_mode = value;
        self
    }

    #[inline]
    #[must_use]
    pub const fn with_light_type(mut self, value: LightType) -> Self {
        self.light_type = value;
        self
    }

    #[inline]
    #[must_use]
    pub const fn vertex_layout(&self) -> VertexLayout {
        self.vertex_layout
    }

    #[inline]
    #[must_use]
    pub const fn shading_model(&self) -> ShadingModel {
        self.shading_model
    }

    #[inline]
    #[must_use]
    pub const fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    #[inline]
    #[must_use]
    pub const fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }

    #[inline]
    #[must_use]
    pub const fn light_type(&self) -> LightType {
        self.light_type
    }

    /// Returns `true` if `self`, used as a filter, admits `object`.
    #[must_use]
    pub fn covers(&self, object: &ObjectMask) -> bool {
        self.vertex_layout.contains(object.vertex_layout)
            && self.shading_model.contains(object.shading_model)
            && self.blend_mode.contains(object.blend_mode)
            && self.fill_mode.contains(object.fill_mode)
            && self.light_type.contains(object.light_type)
    }

    /// Packs the fields into a `u32` (see the module table for boundaries).
    #[must_use]
    pub fn to_bits(&self) -> u32 {
        (u32::from(self.vertex_layout.bits()) << VERTEX_SHIFT)
            | (u32::from(self.shading_model.bits()) << SHADING_SHIFT)
            | (u32::from(self.blend_mode.bits()) << BLEND_SHIFT)
            | (u32::from(self.fill_mode.bits()) << FILL_SHIFT)
            | (u32::from(self.light_type.bits()) << LIGHT_SHIFT)
    }

    /// Unpacks a `u32` produced by [`to_bits`](Self::to_bits). Bits outside
    /// the known field ranges are dropped.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        let field = |shift: u32, width: u32| ((bits >> shift) & ((1 << width) - 1)) as u8;
        Self {
            vertex_layout: VertexLayout::from_bits_truncate(field(VERTEX_SHIFT, 4)),
            shading_model: ShadingModel::from_bits_truncate(field(SHADING_SHIFT, 4)),
            blend_mode: BlendMode::from_bits_truncate(field(BLEND_SHIFT, 8)),
            fill_mode: FillMode::from_bits_truncate(field(FILL_SHIFT, 4)),
            light_type: LightType::from_bits_truncate(field(LIGHT_SHIFT, 4)),
        }
    }

    /// Number of set bits. A filter nested inside another has a strictly
    /// smaller specificity.
    #[inline]
    #[must_use]
    pub fn specificity(&self) -> u32 {
        self.to_bits().count_ones()
    }

    /// Returns `true` if every field holds at most one flag.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.vertex_layout.bits().count_ones() <= 1
            && self.shading_model.bits().count_ones() <= 1
            && self.blend_mode.bits().count_ones() <= 1
            && self.fill_mode.bits().count_ones() <= 1
            && self.light_type.bits().count_ones() <= 1
    }
}

impl BitOr for ObjectMask {
    type Output = Self;

    /// Field-wise union.
    fn bitor(self, rhs: Self) -> Self {
        Self {
            vertex_layout: self.vertex_layout | rhs.vertex_layout,
            shading_model: self.shading_model | rhs.shading_model,
            blend_mode: self.blend_mode | rhs.blend_mode,
            fill_mode: self.fill_mode | rhs.fill_mode,
            light_type: self.light_type | rhs.light_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_masks() -> Vec<ObjectMask> {
        let mut masks = Vec::new();
        for vertex in [VertexLayout::empty(), VertexLayout::POSITION, VertexLayout::PNTBT, VertexLayout::ALL] {
            for blend in [
                BlendMode::empty(),
                BlendMode::OPAQUE,
                BlendMode::MASKED | BlendMode::TRANSLUCENT,
                BlendMode::ALL,
            ] {
                for light in [LightType::empty(), LightType::DIRECTIONAL, LightType::NON_DIRECTIONAL] {
                    masks.push(
                        ObjectMask::new()
                            .with_vertex_layout(vertex)
                            .with_shading_model(ShadingModel::DEFAULT_LIT)
                            .with_blend_mode(blend)
                            .with_fill_mode(FillMode::SOLID)
                            .with_light_type(light),
                    );
                }
            }
        }
        masks
    }

    #[test]
    fn covers_is_reflexive() {
        for mask in sample_masks() {
            assert!(mask.covers(&mask), "{mask:?} should cover itself");
        }
    }

    #[test]
    fn packed_covers_matches_field_wise() {
        let masks = sample_masks();
        for filter in &masks {
            for object in &masks {
                let packed = (object.to_bits() & filter.to_bits()) == object.to_bits();
                assert_eq!(
                    packed,
                    filter.covers(object),
                    "packed and field-wise covers disagree for {filter:?} / {object:?}"
                );
            }
        }
    }

    #[test]
    fn bits_round_trip_through_fields() {
        for mask in sample_masks() {
            assert_eq!(ObjectMask::from_bits(mask.to_bits()), mask);
        }
    }

    #[test]
    fn wildcard_field_admits_any_value() {
        let filter = ObjectMask::new().with_blend_mode(BlendMode::ALL);
        for blend in [BlendMode::OPAQUE, BlendMode::MASKED, BlendMode::TRANSLUCENT, BlendMode::DEBUG] {
            assert!(filter.covers(&ObjectMask::new().with_blend_mode(blend)));
        }
        assert!(!filter.covers(&ObjectMask::new().with_fill_mode(FillMode::WIRE)));
    }

    #[test]
    fn empty_object_field_is_always_covered() {
        let filter = ObjectMask::new().with_light_type(LightType::POINT);
        assert!(filter.covers(&ObjectMask::new()));
        assert!(!ObjectMask::new().covers(&filter));
    }

    #[test]
    fn non_directional_excludes_directional() {
        let filter = ObjectMask::new().with_light_type(LightType::NON_DIRECTIONAL);
        assert!(filter.covers(&ObjectMask::new().with_light_type(LightType::POINT)));
        assert!(!filter.covers(&ObjectMask::new().with_light_type(LightType::DIRECTIONAL)));
    }

    #[test]
    fn nested_filter_is_more_specific() {
        let narrow = ObjectMask::new().with_blend_mode(BlendMode::OPAQUE);
        let wide = ObjectMask::new().with_blend_mode(BlendMode::OPAQUE | BlendMode::MASKED);
        assert!(wide.covers(&narrow));
        assert!(narrow.specificity() < wide.specificity());
        assert!(narrow.is_concrete());
        assert!(!wide.is_concrete());
    }
}
