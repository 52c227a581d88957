//! Umbra: a deferred rendering core on wgpu.
//!
//! The host registers renderables into the spatial index, ticks it once per
//! frame and calls [`RenderSystem::render`]. Everything between (culling,
//! batching by [`ObjectMask`], pipeline selection, the six passes and the
//! single submission) happens inside the crate.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod scene;

pub use errors::{Result, UmbraError};
pub use renderer::{FrameStats, RenderSystem, RendererSettings, WgpuDevice};
pub use scene::{Camera, ObjectMask, Renderable, RenderableHandle, SharedResource, SpatialIndex};
