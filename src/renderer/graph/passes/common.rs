//! Helpers shared by the concrete passes.

use crate::renderer::core::FrameContext;
use crate::renderer::pipeline::{BindingLayout, CachedPipeline, PipelineCache};
use crate::scene::renderable::SharedResource;
use crate::scene::visibility::{DrawPacket, DrawPackets};

/// Depth/stencil state without stencil work.
pub(crate) fn depth_state(
    format: wgpu::TextureFormat,
    write: bool,
    compare: wgpu::CompareFunction,
) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: Some(write),
        depth_compare: Some(compare),
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Stencil face state applied to both faces.
pub(crate) fn stencil_state(compare: wgpu::CompareFunction, pass_op: wgpu::StencilOperation) -> wgpu::StencilState {
    let face = wgpu::StencilFaceState {
        compare,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op,
    };
    wgpu::StencilState {
        front: face,
        back: face,
        read_mask: 0xFF,
        write_mask: 0xFF,
    }
}

/// Binds every binding of `shared` to consecutive readable slots starting
/// at readable index `first`.
pub(crate) fn bind_shared_readables(
    frame: &mut FrameContext<'_>,
    layout: &BindingLayout,
    shared: &dyn SharedResource,
    first: u32,
) {
    let available = layout.readable_count().saturating_sub(first) as usize;
    for (i, binding) in shared.bindings().iter().take(available).enumerate() {
        frame.bind(layout.readable_slot(first + i as u32), *binding);
    }
}

/// Draws one packet with `pipeline`: pipeline bind, then pass-level
/// bindings, then per group the shared bindings, then per renderable the
/// per-object binding and its draw.
pub(crate) fn draw_packet(
    frame: &mut FrameContext<'_>,
    pipeline: &CachedPipeline,
    packet: &DrawPacket,
    bind_pass: &dyn Fn(&mut FrameContext<'_>, &BindingLayout),
) {
    frame.set_pipeline(pipeline.id);
    bind_pass(frame, pipeline.config.bindings());

    for group in packet.groups.values() {
        pipeline.config.bind_shared(frame, group.resource.as_ref());
        for item in &group.items {
            pipeline.config.bind_per_object(frame, item.renderable.per_object_data());
            item.renderable.draw(frame);
        }
    }
}

/// Draws every packet that has a pipeline in `cache`. Returns the number of
/// renderables drawn.
pub(crate) fn draw_packets(
    frame: &mut FrameContext<'_>,
    cache: &PipelineCache,
    packets: &DrawPackets,
    pass_name: &str,
    bind_pass: &dyn Fn(&mut FrameContext<'_>, &BindingLayout),
) -> usize {
    let mut drawn = 0;
    for packet in packets.iter() {
        let Some(pipeline) = cache.get_pipeline_for_mask(&packet.mask) else {
            log::trace!("{pass_name}: no pipeline for {:?}, skipping packet", packet.mask);
            continue;
        };
        draw_packet(frame, pipeline, packet, bind_pass);
        drawn += packet.renderable_count();
    }
    drawn
}
