//! Pipeline Module
//!
//! Shader and pipeline state description:
//! - `layout`: binding-table slot assignment
//! - `config`: backend-independent pipeline configuration and its builder
//! - `cache`: filter-keyed pipeline lookup
//! - `shaders`: embedded WGSL templates
//! - `vertex`: vertex structs and attribute layouts

pub mod cache;
pub mod config;
pub mod layout;
pub mod shaders;
pub mod vertex;

pub use cache::{CachedPipeline, PipelineCache};
pub use config::{PipelineConfiguration, PipelineConfigurationBuilder, ShaderStage};
pub use layout::{BindingLayout, BindingLayoutBuilder, ReadableKind, SlotKind, StaticSampler, WritableKind};
pub use shaders::{ShaderDefines, ShaderLibrary};
pub use vertex::{VertexPntbt, VertexPosition, vertex_buffer_layout};
