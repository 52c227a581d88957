//! Filter-keyed Pipeline Cache
//!
//! Every pass registers its pipelines under a filter [`ObjectMask`] at
//! construction time. At draw time each [`DrawPacket`] asks for the pipeline
//! of its concrete mask through [`PipelineCache::get_pipeline_for_mask`].
//!
//! # Lookup Order
//!
//! Filters of one pass may overlap (`OPAQUE` and `OPAQUE | MASKED` both cover
//! an opaque object). Entries are therefore kept sorted by:
//!
//! 1. [`ObjectMask::specificity`] ascending (the narrowest filter wins),
//! 2. registration order.
//!
//! The first covering entry is returned, so the answer does not depend on
//! the order in which a pass happened to register overlapping filters.
//!
//! # Duplicates
//!
//! Registering the identical filter twice keeps the first entry and logs a
//! warning. [`PipelineCache::strict`] turns this into
//! [`UmbraError::DuplicatePipelineFilter`].
//!
//! [`DrawPacket`]: crate::scene::visibility::DrawPacket

use crate::errors::{Result, UmbraError};
use crate::renderer::core::{PipelineId, RenderDevice};
use crate::scene::mask::ObjectMask;

use super::config::PipelineConfiguration;

/// A compiled pipeline together with the configuration it was built from.
#[derive(Debug)]
pub struct CachedPipeline {
    pub filter: ObjectMask,
    pub id: PipelineId,
    pub config: PipelineConfiguration,
    order: u32,
}

impl CachedPipeline {
    /// Registration index within the owning cache.
    #[inline]
    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }
}

#[derive(Debug, Default)]
pub struct PipelineCache {
    entries: Vec<CachedPipeline>,
    next_order: u32,
    strict: bool,
}

impl PipelineCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that rejects identical filters.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Compiles `config` on `device` and registers it under `filter`.
    ///
    /// Returns the id of the pipeline now serving `filter`. For a duplicate
    /// filter in a non-strict cache that is the previously registered one,
    /// and `config` is dropped without compiling.
    pub fn insert(
        &mut self,
        device: &mut dyn RenderDevice,
        filter: ObjectMask,
        config: PipelineConfiguration,
    ) -> Result<PipelineId> {
        if let Some(existing) = self.entries.iter().find(|e| e.filter == filter) {
            if self.strict {
                return Err(UmbraError::DuplicatePipelineFilter(filter));
            }
            log::warn!(
                "PipelineCache: filter {filter:?} already registered by '{}', ignoring '{}'",
                existing.config.label(),
                config.label()
            );
            return Ok(existing.id);
        }

        let id = device.create_render_pipeline(&config)?;
        log::debug!("PipelineCache: '{}' registered for {filter:?}", config.label());

        let entry = CachedPipeline {
            filter,
            id,
            config,
            order: self.next_order,
        };
        self.next_order += 1;

        let key = (entry.filter.specificity(), entry.order);
        let position = self
            .entries
            .partition_point(|e| (e.filter.specificity(), e.order) <= key);
        self.entries.insert(position, entry);
        Ok(id)
    }

    /// First entry (in lookup order) whose filter covers `mask`.
    #[must_use]
    pub fn get_pipeline_for_mask(&self, mask: &ObjectMask) -> Option<&CachedPipeline> {
        self.entries.iter().find(|e| e.filter.covers(mask))
    }

    /// Entry registered for exactly `filter`.
    #[must_use]
    pub fn get(&self, filter: &ObjectMask) -> Option<&CachedPipeline> {
        self.entries.iter().find(|e| e.filter == *filter)
    }

    /// Entries in lookup order.
    pub fn iter(&self) -> impl Iterator<Item = &CachedPipeline> {
        self.entries.iter()
    }

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
}
