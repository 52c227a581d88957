//! Error Types
//!
//! This module defines the error types used throughout the renderer.
//!
//! # Overview
//!
//! The main error type [`UmbraError`] covers the fallible setup paths:
//! - GPU resource creation failures
//! - Shader lookup and template rendering errors
//! - Pipeline registration errors
//!
//! Per-frame work never returns errors for content problems. A packet without
//! a matching pipeline is skipped, an expired renderable is ignored and a
//! resource-state mismatch is recorded as a [`StateViolation`] on the frame.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, UmbraError>`.
//!
//! ```rust,ignore
//! use umbra::errors::Result;
//!
//! fn build_passes() -> Result<()> {
//!     Ok(())
//! }
//! ```
//!
//! [`StateViolation`]: crate::renderer::core::StateViolation

use thiserror::Error;

use crate::scene::mask::ObjectMask;

/// The main error type for the renderer.
#[derive(Error, Debug)]
pub enum UmbraError {
    // ========================================================================
    // GPU & Resource Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// A required device feature is not available.
    #[error("Missing device feature: {0:?}")]
    MissingFeature(wgpu::Features),

    /// A resource id did not resolve to a live resource.
    #[error("Unknown {kind} resource: {id}")]
    UnknownResource {
        /// Resource family ("texture", "buffer", "pipeline").
        kind: &'static str,
        /// Debug rendering of the id.
        id: String,
    },

    /// A texture or buffer descriptor was rejected before reaching the device.
    #[error("Invalid resource descriptor '{label}': {reason}")]
    InvalidDescriptor {
        /// Resource label
        label: String,
        /// What was wrong
        reason: String,
    },

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// The requested shader source is not embedded in the library.
    #[error("Shader not found: {0}")]
    ShaderNotFound(String),

    /// Embedded shader source is not valid UTF-8.
    #[error("Shader '{0}' is not valid UTF-8")]
    ShaderEncoding(String),

    /// Shader template rendering failed.
    #[error("Shader template error: {0}")]
    ShaderTemplate(#[from] minijinja::Error),

    // ========================================================================
    // Pipeline Errors
    // ========================================================================
    /// A pipeline was registered twice for the same filter in a strict cache.
    #[error("Pipeline filter already registered: {0:?}")]
    DuplicatePipelineFilter(ObjectMask),

    /// A pipeline configuration is incomplete or inconsistent.
    #[error("Invalid pipeline configuration '{label}': {reason}")]
    InvalidPipeline {
        /// Pipeline label
        label: String,
        /// What was wrong
        reason: String,
    },

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// The recorded command list could not be replayed.
    #[error("Command replay failed: {0}")]
    ReplayFailed(String),
}

/// Alias for `Result<T, UmbraError>`.
pub type Result<T> = std::result::Result<T, UmbraError>;
