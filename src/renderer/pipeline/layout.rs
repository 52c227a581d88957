//! Binding Layouts
//!
//! A pipeline's resources live in one binding table. Slots are assigned in a
//! fixed order no matter how they were declared:
//!
//! ```text
//! slot 0 .. C          constants      (uniform buffers)
//! slot C .. C+R        readable       (sampled textures, read-only storage)
//! slot C+R .. C+R+W    writable       (storage buffers / textures)
//! slot C+R+W ..        static samplers
//! ```
//!
//! Passes and the binding callbacks they register address slots through
//! [`BindingLayout::constant_slot`] and friends, so the draw-time order
//! always agrees with the layout.

use smallvec::SmallVec;

/// A readable (shader-resource) slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadableKind {
    Texture {
        sample_type: wgpu::TextureSampleType,
        dimension: wgpu::TextureViewDimension,
    },
    StorageBuffer,
}

impl ReadableKind {
    /// Filterable 2D color texture.
    pub const TEXTURE_2D: Self = Self::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable: true },
        dimension: wgpu::TextureViewDimension::D2,
    };

    /// Depth texture array, sampled with a comparison sampler.
    pub const DEPTH_ARRAY: Self = Self::Texture {
        sample_type: wgpu::TextureSampleType::Depth,
        dimension: wgpu::TextureViewDimension::D2Array,
    };
}

/// A writable (unordered-access) slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritableKind {
    StorageBuffer,
    StorageTexture {
        format: wgpu::TextureFormat,
        dimension: wgpu::TextureViewDimension,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Constants,
    Readable(ReadableKind),
    Writable(WritableKind),
}

/// Samplers baked into the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticSampler {
    LinearClamp,
    PointClamp,
    /// `LessEqual` comparison, clamp to edge.
    ShadowComparison,
}

/// Slot assignment for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BindingLayout {
    slots: SmallVec<[SlotKind; 8]>,
    samplers: SmallVec<[StaticSampler; 2]>,
    constants: u32,
    readable: u32,
    writable: u32,
}

impl BindingLayout {
    #[must_use]
    pub fn builder() -> BindingLayoutBuilder {
        BindingLayoutBuilder::default()
    }

    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[SlotKind] {
        &self.slots
    }

    #[inline]
    #[must_use]
    pub fn samplers(&self) -> &[StaticSampler] {
        &self.samplers
    }

    #[inline]
    #[must_use]
    pub fn constant_slot(&self, index: u32) -> u32 {
        debug_assert!(index < self.constants, "constant index {index} out of range");
        index
    }

    #[inline]
    #[must_use]
    pub fn readable_slot(&self, index: u32) -> u32 {
        debug_assert!(index < self.readable, "readable index {index} out of range");
        self.constants + index
    }

    #[inline]
    #[must_use]
    pub fn writable_slot(&self, index: u32) -> u32 {
        debug_assert!(index < self.writable, "writable index {index} out of range");
        self.constants + self.readable + index
    }

    /// Binding index of static sampler `index` in the backend layout.
    #[inline]
    #[must_use]
    pub fn sampler_slot(&self, index: u32) -> u32 {
        self.resource_count() + index
    }

    /// Number of resource slots, excluding samplers.
    #[inline]
    #[must_use]
    pub fn resource_count(&self) -> u32 {
        self.constants + self.readable + self.writable
    }

    #[inline]
    #[must_use]
    pub fn constant_count(&self) -> u32 {
        self.constants
    }

    #[inline]
    #[must_use]
    pub fn readable_count(&self) -> u32 {
        self.readable
    }

    #[inline]
    #[must_use]
    pub fn writable_count(&self) -> u32 {
        self.writable
    }
}

/// Collects requested resources; [`build`](Self::build) orders them.
#[derive(Debug, Clone, Default)]
pub struct BindingLayoutBuilder {
    constants: u32,
    readable: SmallVec<[ReadableKind; 8]>,
    writable: SmallVec<[WritableKind; 2]>,
    samplers: SmallVec<[StaticSampler; 2]>,
}

impl BindingLayoutBuilder {
    /// Requests `count` additional constant buffers.
    #[must_use]
    pub fn constants(mut self, count: u32) -> Self {
        self.constants += count;
        self
    }

    #[must_use]
    pub fn readable(mut self, kind: ReadableKind) -> Self {
        self.readable.push(kind);
        self
    }

    #[must_use]
    pub fn writable(mut self, kind: WritableKind) -> Self {
        self.writable.push(kind);
        self
    }

    #[must_use]
    pub fn sampler(mut self, sampler: StaticSampler) -> Self {
        self.samplers.push(sampler);
        self
    }

    #[must_use]
    pub fn build(self) -> BindingLayout {
        let mut slots = SmallVec::with_capacity(self.constants as usize + self.readable.len() + self.writable.len());
        slots.extend((0..self.constants).map(|_| SlotKind::Constants));
        slots.extend(self.readable.iter().copied().map(SlotKind::Readable));
        slots.extend(self.writable.iter().copied().map(SlotKind::Writable));

        BindingLayout {
            slots,
            samplers: self.samplers,
            constants: self.constants,
            readable: self.readable.len() as u32,
            writable: self.writable.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_ordered_constants_readable_writable() {
        let layout = BindingLayout::builder()
            .writable(WritableKind::StorageBuffer)
            .readable(ReadableKind::TEXTURE_2D)
            .constants(2)
            .readable(ReadableKind::StorageBuffer)
            .sampler(StaticSampler::LinearClamp)
            .build();

        assert_eq!(
            layout.slots(),
            &[
                SlotKind::Constants,
                SlotKind::Constants,
                SlotKind::Readable(ReadableKind::TEXTURE_2D),
                SlotKind::Readable(ReadableKind::StorageBuffer),
                SlotKind::Writable(WritableKind::StorageBuffer),
            ]
        );
        assert_eq!(layout.constant_slot(1), 1);
        assert_eq!(layout.readable_slot(0), 2);
        assert_eq!(layout.writable_slot(0), 4);
        assert_eq!(layout.sampler_slot(0), 5);
    }
}
