//! Vertex Layouts
//!
//! Maps the [`VertexLayout`] mask field to concrete vertex structs and wgpu
//! attribute lists. Shader input locations follow the attribute order.

use bytemuck::{Pod, Zeroable};

use crate::scene::mask::VertexLayout;

/// Position-only vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPosition {
    pub position: [f32; 3],
}

/// Position, normal, texcoord, tangent, bitangent.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPntbt {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

const PNTBT_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2,
    3 => Float32x3,
    4 => Float32x3,
];

/// Buffer layout for one concrete vertex layout flag.
///
/// Returns `None` for the empty value and for wildcard combinations, which
/// have no single memory layout.
#[must_use]
pub fn vertex_buffer_layout(layout: VertexLayout) -> Option<wgpu::VertexBufferLayout<'static>> {
    if layout == VertexLayout::POSITION {
        Some(wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<VertexPosition>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &POSITION_ATTRIBUTES,
        })
    } else if layout == VertexLayout::PNTBT {
        Some(wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<VertexPntbt>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &PNTBT_ATTRIBUTES,
        })
    } else {
        None
    }
}
