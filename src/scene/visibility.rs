//! Spatial Index & Draw Packets
//!
//! [`SpatialIndex`] is the registry of everything that can be drawn. It keeps
//! a `Weak` reference and the last known world box per renderable, and
//! answers frustum queries through a [`Bvh`] rebuilt once per frame.
//!
//! # Frame Flow
//!
//! ```text
//! register / update / unregister   (entity callbacks, any time)
//!            │
//!          tick()                  (once, after transforms settle)
//!            │
//!   frustum_culling(view_proj) ──► candidate handles
//!            │
//!   extract(filter, candidates) ──► DrawPackets
//!            │                     mask ─► shared resource ─► renderables
//!   DrawPackets::expand(other)      merge, de-duplicating by handle
//! ```
//!
//! Queries see the boxes as of the last [`SpatialIndex::tick`]. Renderables
//! dropped by their owner are skipped during extraction.

use std::rc::{Rc, Weak};

use glam::Mat4;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::renderer::settings::VisibilitySettings;

use super::bounds::BoundingBox;
use super::bvh::Bvh;
use super::frustum::Frustum;
use super::mask::ObjectMask;
use super::renderable::{Renderable, SharedResource, SharedResourceId};

new_key_type! {
    /// Generation-checked handle of a registered renderable.
    pub struct RenderableHandle;
}

struct Entry {
    renderable: Weak<dyn Renderable>,
    bounds: BoundingBox,
}

// ─── Draw Packets ─────────────────────────────────────────────────────────────

/// A renderable selected for drawing.
#[derive(Clone)]
pub struct DrawItem {
    pub handle: RenderableHandle,
    pub renderable: Rc<dyn Renderable>,
}

/// Renderables sharing one shared-resource bundle.
#[derive(Clone)]
pub struct CommonResourceGroup {
    pub resource: Rc<dyn SharedResource>,
    pub items: Vec<DrawItem>,
}

impl CommonResourceGroup {
    fn push_unique(&mut self, item: &DrawItem) {
        // Groups stay small; a linear scan beats hashing here.
        if !self.items.iter().any(|existing| existing.handle == item.handle) {
            self.items.push(item.clone());
        }
    }
}

/// All renderables of one concrete mask, grouped by shared resource.
#[derive(Clone)]
pub struct DrawPacket {
    pub mask: ObjectMask,
    pub groups: FxHashMap<SharedResourceId, CommonResourceGroup>,
}

impl DrawPacket {
    #[must_use]
    pub fn renderable_count(&self) -> usize {
        self.groups.values().map(|g| g.items.len()).sum()
    }
}

/// Per-pass batching result, keyed by concrete object mask.
#[derive(Clone, Default)]
pub struct DrawPackets {
    packets: FxHashMap<ObjectMask, DrawPacket>,
}

impl DrawPackets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, mask: ObjectMask, shared: Rc<dyn SharedResource>, item: DrawItem) {
        let packet = self.packets.entry(mask).or_insert_with(|| DrawPacket {
            mask,
            groups: FxHashMap::default(),
        });
        let group = packet
            .groups
            .entry(SharedResourceId::of(&shared))
            .or_insert_with(|| CommonResourceGroup {
                resource: shared,
                items: Vec::new(),
            });
        group.push_unique(&item);
    }

    /// Merges `source` into `self`. A renderable already present in its
    /// group is not added twice.
    pub fn expand(&mut self, source: &DrawPackets) {
        for (mask, packet) in &source.packets {
            let target = self.packets.entry(*mask).or_insert_with(|| DrawPacket {
                mask: *mask,
                groups: FxHashMap::default(),
            });
            for (id, group) in &packet.groups {
                let target_group = target.groups.entry(*id).or_insert_with(|| CommonResourceGroup {
                    resource: Rc::clone(&group.resource),
                    items: Vec::with_capacity(group.items.len()),
                });
                for item in &group.items {
                    target_group.push_unique(item);
                }
            }
        }
    }

    #[must_use]
    pub fn get(&self, mask: &ObjectMask) -> Option<&DrawPacket> {
        self.packets.get(mask)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawPacket> {
        self.packets.values()
    }

    /// Number of distinct masks.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Total renderables across all packets.
    #[must_use]
    pub fn renderable_count(&self) -> usize {
        self.packets.values().map(DrawPacket::renderable_count).sum()
    }

    /// Returns `true` if any group contains `handle`.
    #[must_use]
    pub fn contains(&self, handle: RenderableHandle) -> bool {
        self.packets
            .values()
            .flat_map(|p| p.groups.values())
            .any(|g| g.items.iter().any(|i| i.handle == handle))
    }
}

// ─── Spatial Index ────────────────────────────────────────────────────────────

/// Registry of renderables with frustum-culled visibility queries.
pub struct SpatialIndex {
    entries: SlotMap<RenderableHandle, Entry>,
    tree: Bvh<RenderableHandle>,
    dirty: bool,
    settings: VisibilitySettings,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(VisibilitySettings::default())
    }
}

impl SpatialIndex {
    #[must_use]
    pub fn new(settings: VisibilitySettings) -> Self {
        Self {
            entries: SlotMap::with_key(),
            tree: Bvh::default(),
            dirty: false,
            settings,
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &VisibilitySettings {
        &self.settings
    }

    // ─── Registration ──────────────────────────────────────────────────────

    /// Registers `renderable` with its world box. The tree picks it up at the
    /// next [`tick`](Self::tick).
    pub fn register(&mut self, renderable: &Rc<dyn Renderable>, bounds: BoundingBox) -> RenderableHandle {
        let handle = self.entries.insert(Entry {
            renderable: Rc::downgrade(renderable),
            bounds,
        });
        self.dirty = true;
        log::debug!("SpatialIndex: registered {handle:?}");
        handle
    }

    /// Replaces the stored box. Returns `false` for a stale handle.
    pub fn update(&mut self, handle: RenderableHandle, bounds: BoundingBox) -> bool {
        if let Some(entry) = self.entries.get_mut(handle) {
            entry.bounds = bounds;
            self.dirty = true;
            true
        } else {
            log::warn!("SpatialIndex: update on stale handle {handle:?}");
            false
        }
    }

    /// Removes a renderable. Returns `false` if the handle was already gone.
    pub fn unregister(&mut self, handle: RenderableHandle) -> bool {
        if self.entries.remove(handle).is_some() {
            self.dirty = true;
            log::debug!("SpatialIndex: unregistered {handle:?}");
            true
        } else {
            log::warn!("SpatialIndex: unregister on stale handle {handle:?}");
            false
        }
    }

    /// Rebuilds the tree if anything changed since the last tick.
    pub fn tick(&mut self) {
        if !self.dirty {
            return;
        }
        let items = self
            .entries
            .iter()
            .map(|(handle, entry)| (handle, entry.bounds))
            .collect();
        self.tree = Bvh::build(items, self.settings.max_leaf_elements, self.settings.max_depth);
        self.dirty = false;
        log::trace!(
            "SpatialIndex: rebuilt tree ({} items, {} nodes, depth {})",
            self.tree.len(),
            self.tree.node_count(),
            self.tree.depth()
        );
    }

    // ─── Queries ───────────────────────────────────────────────────────────

    /// Handles whose boxes (as of the last tick) intersect the frustum of
    /// `view_proj`, with the configured slack.
    #[must_use]
    pub fn frustum_culling(&self, view_proj: Mat4) -> Vec<RenderableHandle> {
        let frustum = Frustum::from_matrix(view_proj);
        let mut candidates = Vec::new();
        self.tree
            .query_frustum(&frustum, self.settings.culling_epsilon, &mut candidates);
        candidates
    }

    /// Buckets the candidates `filter` covers by mask and shared resource.
    #[must_use]
    pub fn extract(&self, filter: ObjectMask, candidates: &[RenderableHandle]) -> DrawPackets {
        let mut packets = DrawPackets::new();
        for &handle in candidates {
            self.extract_one(filter, handle, &mut packets);
        }
        packets
    }

    fn extract_one(&self, filter: ObjectMask, handle: RenderableHandle, packets: &mut DrawPackets) {
        let Some(renderable) = self.entries.get(handle).and_then(|e| e.renderable.upgrade()) else {
            return;
        };
        let sort_data = renderable.sort_data();
        if filter.covers(&sort_data.mask) {
            packets.insert(sort_data.mask, sort_data.shared, DrawItem { handle, renderable });
        }
    }

    #[must_use]
    pub fn extract_from_frustum(&self, filter: ObjectMask, view_proj: Mat4) -> DrawPackets {
        self.extract(filter, &self.frustum_culling(view_proj))
    }

    /// Adds every registered renderable `filter` covers, without culling.
    pub fn expand_by_filter_from_all(&self, filter: ObjectMask, destination: &mut DrawPackets) {
        for handle in self.entries.keys() {
            self.extract_one(filter, handle, destination);
        }
    }

    /// Culls against `view_proj`, extracts with `filter` and merges.
    pub fn expand_by_filter_from_frustum(&self, filter: ObjectMask, view_proj: Mat4, destination: &mut DrawPackets) {
        destination.expand(&self.extract_from_frustum(filter, view_proj));
    }

    // ─── Introspection ─────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, handle: RenderableHandle) -> bool {
        self.entries.contains_key(handle)
    }

    #[must_use]
    pub fn bounds(&self, handle: RenderableHandle) -> Option<BoundingBox> {
        self.entries.get(handle).map(|e| e.bounds)
    }

    /// Returns `true` if changes are waiting for the next tick.
    #[inline]
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        self.dirty
    }
}
