//! Scene-facing Types
//!
//! What the render core knows about the scene:
//! - `mask`: object classification and filters
//! - `bounds` / `frustum`: culling primitives
//! - `camera`: the camera contract
//! - `renderable`: the capability hosts implement
//! - `bvh` / `visibility`: the spatial index and draw-packet batching

pub mod bounds;
pub mod bvh;
pub mod camera;
pub mod frustum;
pub mod mask;
pub mod renderable;
pub mod visibility;

pub use bounds::BoundingBox;
pub use camera::{Camera, Projection};
pub use frustum::{Containment, Frustum};
pub use mask::{BlendMode, FillMode, LightType, ObjectMask, ShadingModel, VertexLayout};
pub use renderable::{
    LightConstants, MaterialData, ObjectConstants, Renderable, ShadowSource, SharedResource, SharedResourceId,
    SortData,
};
pub use visibility::{CommonResourceGroup, DrawItem, DrawPacket, DrawPackets, RenderableHandle, SpatialIndex};
