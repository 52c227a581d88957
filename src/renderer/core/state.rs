//! Resource State Tracking
//!
//! Every persistent texture has exactly one tracked state. Passes ask the
//! tracker for the transition they need; a transition is recorded only when
//! the state actually changes, so passes can request states unconditionally.

use rustc_hash::FxHashMap;

use super::resources::{ResourceState, TextureId};

/// A pass used a texture in a state other than the one its use requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateViolation {
    pub texture: TextureId,
    pub expected: ResourceState,
    pub actual: ResourceState,
    pub operation: &'static str,
}

/// Per-texture state map shared across frames.
#[derive(Debug, Default)]
pub struct ResourceStateTracker {
    states: FxHashMap<TextureId, ResourceState>,
}

impl ResourceStateTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `texture` in `initial`.
    pub fn register(&mut self, texture: TextureId, initial: ResourceState) {
        self.states.insert(texture, initial);
    }

    /// Stops tracking a destroyed texture.
    pub fn forget(&mut self, texture: TextureId) {
        self.states.remove(&texture);
    }

    /// Current state; [`ResourceState::Undefined`] for untracked textures.
    #[inline]
    #[must_use]
    pub fn state(&self, texture: TextureId) -> ResourceState {
        self.states.get(&texture).copied().unwrap_or_default()
    }

    /// Moves `texture` to `after`. Returns the previous state, or `None` if
    /// the texture was already in `after`.
    pub fn transition(&mut self, texture: TextureId, after: ResourceState) -> Option<ResourceState> {
        let entry = self.states.entry(texture).or_default();
        if *entry == after {
            return None;
        }
        let before = *entry;
        *entry = after;
        Some(before)
    }

    #[inline]
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn redundant_transitions_are_elided() {
        let mut ids: SlotMap<TextureId, ()> = SlotMap::with_key();
        let texture = ids.insert(());
        let mut tracker = ResourceStateTracker::new();
        tracker.register(texture, ResourceState::ShaderRead);

        assert_eq!(
            tracker.transition(texture, ResourceState::RenderTarget),
            Some(ResourceState::ShaderRead)
        );
        assert_eq!(tracker.transition(texture, ResourceState::RenderTarget), None);
        assert_eq!(tracker.state(texture), ResourceState::RenderTarget);
    }

    #[test]
    fn untracked_texture_is_undefined() {
        let mut ids: SlotMap<TextureId, ()> = SlotMap::with_key();
        let texture = ids.insert(());
        let mut tracker = ResourceStateTracker::new();
        assert_eq!(tracker.state(texture), ResourceState::Undefined);
        assert_eq!(
            tracker.transition(texture, ResourceState::DepthWrite),
            Some(ResourceState::Undefined)
        );
        tracker.forget(texture);
        assert_eq!(tracker.tracked_count(), 0);
    }
}
