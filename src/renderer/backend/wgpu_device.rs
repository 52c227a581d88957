//! wgpu Device
//!
//! [`WgpuDevice`] implements [`RenderDevice`] on a `wgpu::Device`/`Queue`
//! pair. Resources live in generation-checked slotmaps; pipelines, shader
//! modules, bind-group layouts and samplers are created once and cached.
//!
//! # Replay
//!
//! A recorded [`CommandList`] is replayed into one command encoder:
//!
//! ```text
//! SetRenderTargets     end the open pass, remember the targets
//! Clear*               end the open pass, the next pass loads with Clear
//! Bind / Set*          update the desired state
//! Draw*                open a pass if needed, apply state (deduplicated), draw
//! Push/PopDebugGroup   end the open pass, group on the encoder
//! Transition           no-op, wgpu tracks usages itself
//! ```
//!
//! Clears that no draw consumes are flushed by an empty pass, so every
//! recorded clear reaches the GPU.
//!
//! # Required features
//!
//! | Feature | Used by |
//! |---------|---------|
//! | `MULTIVIEW` | cascade fan-out of the shadow pass |
//! | `POLYGON_MODE_LINE` | wireframe G-buffer pipeline |

use std::borrow::Cow;
use std::num::NonZeroU32;
use std::num::NonZeroU64;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;
use xxhash_rust::xxh3::xxh3_128;

use crate::errors::{Result, UmbraError};
use crate::renderer::core::{
    Binding, BufferDesc, BufferId, BufferSlice, CommandList, DepthTarget, GpuCommand, PipelineId,
    RenderDevice, TextureDesc, TextureId, Viewport,
};
use crate::renderer::pipeline::{
    BindingLayout, PipelineConfiguration, ReadableKind, ShaderStage, SlotKind, StaticSampler, WritableKind,
    vertex_buffer_layout,
};

use super::tracked_pass::TrackedRenderPass;

struct GpuTexture {
    /// `None` for imported views (swapchain images).
    texture: Option<wgpu::Texture>,
    /// Attachment view covering every layer.
    target_view: wgpu::TextureView,
    /// Sampled view; depth aspect only for depth/stencil formats.
    sample_view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    layers: u32,
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

struct GpuPipeline {
    label: String,
    pipeline: wgpu::RenderPipeline,
    bindings: BindingLayout,
    layout_id: u32,
    bind_group_layout: wgpu::BindGroupLayout,
}

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: SlotMap<TextureId, GpuTexture>,
    buffers: SlotMap<BufferId, GpuBuffer>,
    pipelines: SlotMap<PipelineId, GpuPipeline>,
    shader_modules: FxHashMap<u128, wgpu::ShaderModule>,
    bind_group_layouts: FxHashMap<BindingLayout, (u32, wgpu::BindGroupLayout)>,
    samplers: FxHashMap<StaticSampler, wgpu::Sampler>,
}

impl WgpuDevice {
    /// Features the render core relies on.
    #[must_use]
    pub fn required_features() -> wgpu::Features {
        wgpu::Features::MULTIVIEW | wgpu::Features::POLYGON_MODE_LINE
    }

    /// Wraps an existing device. Fails if a required feature is not enabled.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Result<Self> {
        let missing = Self::required_features().difference(device.features());
        if !missing.is_empty() {
            return Err(UmbraError::MissingFeature(missing));
        }
        Ok(Self {
            device,
            queue,
            textures: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            shader_modules: FxHashMap::default(),
            bind_group_layouts: FxHashMap::default(),
            samplers: FxHashMap::default(),
        })
    }

    /// Requests a device with the required features from `adapter`.
    ///
    /// ```no_run
    /// # fn main() -> umbra::Result<()> {
    /// let instance = wgpu::Instance::default();
    /// let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
    ///     .map_err(|e| umbra::UmbraError::AdapterRequestFailed(e.to_string()))?;
    /// let device = pollster::block_on(umbra::WgpuDevice::request(&adapter))?;
    /// assert!(device.device().features().contains(umbra::WgpuDevice::required_features()));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request(adapter: &wgpu::Adapter) -> Result<Self> {
        let missing = Self::required_features().difference(adapter.features());
        if !missing.is_empty() {
            return Err(UmbraError::MissingFeature(missing));
        }
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Umbra Device"),
                required_features: Self::required_features(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;
        Self::new(device, queue)
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Registers an externally owned view, typically the current swapchain
    /// image. Release it with [`RenderDevice::destroy_texture`] once presented.
    pub fn import_view(&mut self, view: wgpu::TextureView, format: wgpu::TextureFormat) -> TextureId {
        self.textures.insert(GpuTexture {
            texture: None,
            target_view: view.clone(),
            sample_view: view,
            format,
            layers: 1,
        })
    }

    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    #[must_use]
    pub fn shader_module_count(&self) -> usize {
        self.shader_modules.len()
    }

    // ─── Cached Objects ───────────────────────────────────────────────────

    fn shader_module(&mut self, stage: &ShaderStage) -> wgpu::ShaderModule {
        let hash = xxh3_128(stage.source.as_bytes());
        self.shader_modules
            .entry(hash)
            .or_insert_with(|| {
                log::debug!("WgpuDevice: compiling shader module '{}'", stage.label);
                self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&stage.label),
                    source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&stage.source)),
                })
            })
            .clone()
    }

    fn sampler(&mut self, sampler: StaticSampler) -> wgpu::Sampler {
        self.samplers
            .entry(sampler)
            .or_insert_with(|| {
                let (label, filter, compare) = match sampler {
                    StaticSampler::LinearClamp => ("Linear Clamp Sampler", wgpu::FilterMode::Linear, None),
                    StaticSampler::PointClamp => ("Point Clamp Sampler", wgpu::FilterMode::Nearest, None),
                    StaticSampler::ShadowComparison => (
                        "Shadow Comparison Sampler",
                        wgpu::FilterMode::Linear,
                        Some(wgpu::CompareFunction::LessEqual),
                    ),
                };
                self.device.create_sampler(&wgpu::SamplerDescriptor {
                    label: Some(label),
                    address_mode_u: wgpu::AddressMode::ClampToEdge,
                    address_mode_v: wgpu::AddressMode::ClampToEdge,
                    address_mode_w: wgpu::AddressMode::ClampToEdge,
                    mag_filter: filter,
                    min_filter: filter,
                    compare,
                    ..Default::default()
                })
            })
            .clone()
    }

    fn bind_group_layout(&mut self, bindings: &BindingLayout) -> (u32, wgpu::BindGroupLayout) {
        if let Some(found) = self.bind_group_layouts.get(bindings) {
            return found.clone();
        }

        let visibility = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let mut entries: Vec<wgpu::BindGroupLayoutEntry> = bindings
            .slots()
            .iter()
            .enumerate()
            .map(|(slot, kind)| {
                let (ty, visibility) = match kind {
                    SlotKind::Constants => (
                        wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        visibility,
                    ),
                    SlotKind::Readable(ReadableKind::Texture { sample_type, dimension }) => (
                        wgpu::BindingType::Texture {
                            sample_type: *sample_type,
                            view_dimension: *dimension,
                            multisampled: false,
                        },
                        visibility,
                    ),
                    SlotKind::Readable(ReadableKind::StorageBuffer) => (
                        wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        visibility,
                    ),
                    SlotKind::Writable(WritableKind::StorageBuffer) => (
                        wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        wgpu::ShaderStages::FRAGMENT,
                    ),
                    SlotKind::Writable(WritableKind::StorageTexture { format, dimension }) => (
                        wgpu::BindingType::StorageTexture {
                            access: wgpu::StorageTextureAccess::WriteOnly,
                            format: *format,
                            view_dimension: *dimension,
                        },
                        wgpu::ShaderStages::FRAGMENT,
                    ),
                };
                wgpu::BindGroupLayoutEntry {
                    binding: slot as u32,
                    visibility,
                    ty,
                    count: None,
                }
            })
            .collect();

        for (i, sampler) in bindings.samplers().iter().enumerate() {
            let ty = match sampler {
                StaticSampler::LinearClamp => wgpu::SamplerBindingType::Filtering,
                StaticSampler::PointClamp => wgpu::SamplerBindingType::NonFiltering,
                StaticSampler::ShadowComparison => wgpu::SamplerBindingType::Comparison,
            };
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: bindings.sampler_slot(i as u32),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(ty),
                count: None,
            });
        }

        let layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Umbra Bind Group Layout"),
            entries: &entries,
        });
        let id = self.bind_group_layouts.len() as u32;
        self.bind_group_layouts.insert(bindings.clone(), (id, layout.clone()));
        (id, layout)
    }
}

fn multiview_mask(layers: u32) -> Option<NonZeroU32> {
    if layers <= 1 {
        return None;
    }
    let mask = if layers >= 32 { u32::MAX } else { (1u32 << layers) - 1 };
    NonZeroU32::new(mask)
}

impl RenderDevice for WgpuDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        if desc.width == 0 || desc.height == 0 || desc.layers == 0 {
            return Err(UmbraError::InvalidDescriptor {
                label: desc.label.to_string(),
                reason: format!("zero extent {}x{}x{}", desc.width, desc.height, desc.layers),
            });
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: desc.layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        });

        let dimension = if desc.layers > 1 {
            wgpu::TextureViewDimension::D2Array
        } else {
            wgpu::TextureViewDimension::D2
        };
        let target_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&desc.label),
            dimension: Some(dimension),
            ..Default::default()
        });
        let sample_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&desc.label),
            dimension: Some(dimension),
            aspect: if desc.is_depth() {
                wgpu::TextureAspect::DepthOnly
            } else {
                wgpu::TextureAspect::All
            },
            ..Default::default()
        });

        log::debug!(
            "WgpuDevice: texture '{}' {}x{}x{} {:?}",
            desc.label,
            desc.width,
            desc.height,
            desc.layers,
            desc.format
        );
        Ok(self.textures.insert(GpuTexture {
            texture: Some(texture),
            target_view,
            sample_view,
            format: desc.format,
            layers: desc.layers,
        }))
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if let Some(gpu) = self.textures.remove(texture)
            && let Some(texture) = gpu.texture
        {
            texture.destroy();
        }
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId> {
        if desc.size == 0 {
            return Err(UmbraError::InvalidDescriptor {
                label: desc.label.to_string(),
                reason: "zero-sized buffer".to_owned(),
            });
        }
        let size = desc.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&desc.label),
            size,
            usage: desc.usage,
            mapped_at_creation: false,
        });
        Ok(self.buffers.insert(GpuBuffer { buffer, size }))
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if let Some(gpu) = self.buffers.remove(buffer) {
            gpu.buffer.destroy();
        }
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        let Some(gpu) = self.buffers.get(buffer) else {
            log::warn!("WgpuDevice: write to unknown buffer {buffer:?}, ignoring");
            return;
        };
        let padded_len = (data.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        if offset + padded_len > gpu.size {
            log::warn!("WgpuDevice: write of {} bytes at {offset} overflows {buffer:?}, ignoring", data.len());
            return;
        }
        if padded_len == data.len() as u64 {
            self.queue.write_buffer(&gpu.buffer, offset, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(padded_len as usize, 0);
            self.queue.write_buffer(&gpu.buffer, offset, &padded);
        }
    }

    fn create_render_pipeline(&mut self, config: &PipelineConfiguration) -> Result<PipelineId> {
        let vertex_module = self.shader_module(config.vertex());
        let fragment_module = config.fragment().map(|stage| self.shader_module(stage));
        for sampler in config.bindings().samplers() {
            self.sampler(*sampler);
        }
        let (layout_id, bind_group_layout) = self.bind_group_layout(config.bindings());

        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(config.label()),
            bind_group_layouts: &[Some(&bind_group_layout)],
            immediate_size: 0,
        });

        let vertex_buffers: SmallVec<[wgpu::VertexBufferLayout<'static>; 1]> =
            vertex_buffer_layout(config.vertex_layout()).into_iter().collect();
        let color_targets: SmallVec<[Option<wgpu::ColorTargetState>; 4]> =
            config.color_targets().iter().cloned().map(Some).collect();

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(config.label()),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some(config.vertex().entry_point),
                buffers: &vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: match (&fragment_module, config.fragment()) {
                (Some(module), Some(stage)) => Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(stage.entry_point),
                    targets: &color_targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                _ => None,
            },
            primitive: *config.primitive(),
            depth_stencil: config.depth_stencil().cloned(),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: config.multiview_layers().and_then(multiview_mask),
            cache: None,
        });

        log::debug!("WgpuDevice: pipeline '{}' created", config.label());
        Ok(self.pipelines.insert(GpuPipeline {
            label: config.label().to_owned(),
            pipeline,
            bindings: config.bindings().clone(),
            layout_id,
            bind_group_layout,
        }))
    }

    fn submit(&mut self, commands: &CommandList) -> Result<()> {
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Umbra Frame Encoder"),
        });
        let mut replay = Replay::new(&*self, encoder);
        for command in commands {
            replay.execute(command)?;
        }
        let (encoder, skipped) = replay.finish();
        if skipped > 0 {
            log::warn!("WgpuDevice: {skipped} draws skipped during replay");
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn binding_alignment(&self) -> u64 {
        u64::from(self.device.limits().min_uniform_buffer_offset_alignment)
            .max(u64::from(self.device.limits().min_storage_buffer_offset_alignment))
    }
}

// ─── Replay ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindGroupKey {
    layout_id: u32,
    bindings: SmallVec<[Binding; 12]>,
}

struct Replay<'d> {
    device: &'d WgpuDevice,
    encoder: wgpu::CommandEncoder,
    pass: Option<TrackedRenderPass>,

    colors: SmallVec<[TextureId; 4]>,
    depth: Option<DepthTarget>,
    color_clears: SmallVec<[(TextureId, wgpu::Color); 4]>,
    depth_clear: Option<f32>,
    stencil_clear: Option<u32>,

    viewport: Option<Viewport>,
    pipeline: Option<PipelineId>,
    stencil_reference: u32,
    slots: SmallVec<[Option<Binding>; 16]>,
    vertex_buffers: SmallVec<[Option<BufferSlice>; 4]>,
    index_buffer: Option<(BufferSlice, wgpu::IndexFormat)>,

    bind_groups: FxHashMap<BindGroupKey, (u64, wgpu::BindGroup)>,
    skipped_draws: usize,
}

impl<'d> Replay<'d> {
    fn new(device: &'d WgpuDevice, encoder: wgpu::CommandEncoder) -> Self {
        Self {
            device,
            encoder,
            pass: None,
            colors: SmallVec::new(),
            depth: None,
            color_clears: SmallVec::new(),
            depth_clear: None,
            stencil_clear: None,
            viewport: None,
            pipeline: None,
            stencil_reference: 0,
            slots: SmallVec::new(),
            vertex_buffers: SmallVec::new(),
            index_buffer: None,
            bind_groups: FxHashMap::default(),
            skipped_draws: 0,
        }
    }

    fn finish(mut self) -> (wgpu::CommandEncoder, usize) {
        self.end_pass();
        (self.encoder, self.skipped_draws)
    }

    fn texture(&self, id: TextureId) -> Result<&'d GpuTexture> {
        self.device.textures.get(id).ok_or_else(|| UmbraError::UnknownResource {
            kind: "texture",
            id: format!("{id:?}"),
        })
    }

    fn buffer(&self, id: BufferId) -> Result<&'d GpuBuffer> {
        self.device.buffers.get(id).ok_or_else(|| UmbraError::UnknownResource {
            kind: "buffer",
            id: format!("{id:?}"),
        })
    }

    fn has_pending_clears(&self) -> bool {
        !self.color_clears.is_empty() || self.depth_clear.is_some() || self.stencil_clear.is_some()
    }

    fn execute(&mut self, command: &GpuCommand) -> Result<()> {
        match command {
            GpuCommand::PushDebugGroup(label) => {
                self.end_pass();
                self.encoder.push_debug_group(label);
            }
            GpuCommand::PopDebugGroup => {
                self.end_pass();
                self.encoder.pop_debug_group();
            }
            GpuCommand::Transition { .. } => {}
            GpuCommand::SetRenderTargets { colors, depth } => {
                self.end_pass();
                self.colors.clone_from(colors);
                self.depth = *depth;
                self.pipeline = None;
                self.slots.clear();
                self.vertex_buffers.clear();
                self.index_buffer = None;
            }
            GpuCommand::ClearColor { texture, color } => {
                self.end_pass();
                if self.colors.contains(texture) {
                    self.color_clears.retain(|(t, _)| t != texture);
                    self.color_clears.push((*texture, *color));
                } else {
                    self.clear_detached(&[(*texture, *color)], None)?;
                }
            }
            GpuCommand::ClearDepthStencil { texture, depth, stencil } => {
                self.end_pass();
                if self.depth.is_some_and(|d| d.texture == *texture) {
                    self.depth_clear = (*depth).or(self.depth_clear);
                    self.stencil_clear = (*stencil).or(self.stencil_clear);
                } else {
                    self.clear_detached(&[], Some((*texture, *depth, *stencil)))?;
                }
            }
            GpuCommand::SetViewport(viewport) => self.viewport = Some(*viewport),
            GpuCommand::SetPipeline(pipeline) => self.pipeline = Some(*pipeline),
            GpuCommand::SetStencilReference(reference) => self.stencil_reference = *reference,
            GpuCommand::Bind { slot, binding } => {
                let index = *slot as usize;
                if self.slots.len() <= index {
                    self.slots.resize(index + 1, None);
                }
                self.slots[index] = Some(*binding);
            }
            GpuCommand::SetVertexBuffer { slot, buffer } => {
                let index = *slot as usize;
                if self.vertex_buffers.len() <= index {
                    self.vertex_buffers.resize(index + 1, None);
                }
                self.vertex_buffers[index] = Some(*buffer);
            }
            GpuCommand::SetIndexBuffer { buffer, format } => self.index_buffer = Some((*buffer, *format)),
            GpuCommand::Draw { vertices, instances } => {
                if self.prepare_draw()?
                    && let Some(pass) = &mut self.pass
                {
                    pass.draw(vertices.clone(), instances.clone());
                }
            }
            GpuCommand::DrawIndexed {
                indices,
                base_vertex,
                instances,
            } => {
                if self.prepare_draw()?
                    && let Some(pass) = &mut self.pass
                {
                    pass.draw_indexed(indices.clone(), *base_vertex, instances.clone());
                }
            }
        }
        Ok(())
    }

    /// Ends the open pass. Pending clears with no pass to consume them are
    /// flushed through an empty one.
    fn end_pass(&mut self) {
        if self.pass.take().is_some() {
            return;
        }
        if self.has_pending_clears()
            && let Err(e) = self.open_pass()
        {
            log::warn!("WgpuDevice: pending clear dropped: {e}");
        }
        self.pass = None;
    }

    fn open_pass(&mut self) -> Result<()> {
        let mut color_attachments: SmallVec<[Option<wgpu::RenderPassColorAttachment<'_>>; 4]> = SmallVec::new();
        let mut layers = 1;
        for id in &self.colors {
            let texture = self.texture(*id)?;
            layers = layers.max(texture.layers);
            let load = self
                .color_clears
                .iter()
                .find(|(t, _)| t == id)
                .map_or(wgpu::LoadOp::Load, |(_, color)| wgpu::LoadOp::Clear(*color));
            color_attachments.push(Some(wgpu::RenderPassColorAttachment {
                view: &texture.target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            }));
        }

        let depth_stencil_attachment = match self.depth {
            Some(target) => {
                let texture = self.texture(target.texture)?;
                layers = layers.max(texture.layers);
                Some(depth_attachment(texture, target.read_only, self.depth_clear, self.stencil_clear))
            }
            None => None,
        };

        if color_attachments.is_empty() && depth_stencil_attachment.is_none() {
            return Err(UmbraError::ReplayFailed("no render targets bound".to_owned()));
        }

        let pass = self
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: None,
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: multiview_mask(layers),
            })
            .forget_lifetime();

        self.color_clears.clear();
        self.depth_clear = None;
        self.stencil_clear = None;
        self.pass = Some(TrackedRenderPass::new(pass));
        Ok(())
    }

    /// Clears textures outside the bound targets with a pass of their own.
    fn clear_detached(
        &mut self,
        colors: &[(TextureId, wgpu::Color)],
        depth: Option<(TextureId, Option<f32>, Option<u32>)>,
    ) -> Result<()> {
        let color_attachments: SmallVec<[Option<wgpu::RenderPassColorAttachment<'_>>; 4]> = colors
            .iter()
            .map(|(id, color)| {
                self.texture(*id).map(|texture| {
                    Some(wgpu::RenderPassColorAttachment {
                        view: &texture.target_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(*color),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })
                })
            })
            .collect::<Result<_>>()?;
        let depth_stencil_attachment = match depth {
            Some((id, depth, stencil)) => Some(depth_attachment(self.texture(id)?, false, depth, stencil)),
            None => None,
        };

        log::trace!("WgpuDevice: clearing detached targets");
        drop(self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Detached Clear"),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        }));
        Ok(())
    }

    /// Opens a pass if needed and applies the desired state. Returns `false`
    /// when the draw has to be skipped.
    fn prepare_draw(&mut self) -> Result<bool> {
        let device = self.device;
        let Some(pipeline_id) = self.pipeline else {
            log::warn!("WgpuDevice: draw without a pipeline, skipping");
            self.skipped_draws += 1;
            return Ok(false);
        };
        let Some(pipeline) = device.pipelines.get(pipeline_id) else {
            log::warn!("WgpuDevice: draw with unknown pipeline {pipeline_id:?}, skipping");
            self.skipped_draws += 1;
            return Ok(false);
        };

        let mut bindings = SmallVec::new();
        for slot in 0..pipeline.bindings.resource_count() {
            match self.slots.get(slot as usize).copied().flatten() {
                Some(binding) => bindings.push(binding),
                None => {
                    log::warn!("WgpuDevice: slot {slot} of '{}' is unbound, skipping draw", pipeline.label);
                    self.skipped_draws += 1;
                    return Ok(false);
                }
            }
        }
        let key = BindGroupKey {
            layout_id: pipeline.layout_id,
            bindings,
        };
        let (bind_group_id, bind_group) = match self.bind_groups.get(&key) {
            Some(found) => found.clone(),
            None => {
                let bind_group = self.create_bind_group(pipeline, &key.bindings)?;
                let id = self.bind_groups.len() as u64;
                self.bind_groups.insert(key, (id, bind_group.clone()));
                (id, bind_group)
            }
        };

        if self.pass.is_none() {
            self.open_pass()?;
        }
        let viewport = self.viewport;
        let stencil_reference = self.stencil_reference;
        let vertex_buffers = self.vertex_buffers.clone();
        let index_buffer = self.index_buffer;
        let Some(pass) = &mut self.pass else {
            return Ok(false);
        };

        pass.set_pipeline(pipeline_id, &pipeline.pipeline);
        if let Some(viewport) = viewport {
            pass.set_viewport(viewport);
        }
        pass.set_stencil_reference(stencil_reference);
        pass.set_bind_group(bind_group_id, &bind_group);
        for (slot, buffer) in vertex_buffers.iter().enumerate() {
            if let Some(slice) = buffer
                && let Some(gpu) = device.buffers.get(slice.buffer)
            {
                pass.set_vertex_buffer(slot as u32, *slice, &gpu.buffer);
            }
        }
        if let Some((slice, format)) = index_buffer
            && let Some(gpu) = device.buffers.get(slice.buffer)
        {
            pass.set_index_buffer(slice, &gpu.buffer, format);
        }
        Ok(true)
    }

    fn create_bind_group(&self, pipeline: &GpuPipeline, bindings: &[Binding]) -> Result<wgpu::BindGroup> {
        let mut entries: SmallVec<[wgpu::BindGroupEntry<'_>; 16]> = SmallVec::new();
        for (slot, binding) in bindings.iter().enumerate() {
            let resource = match binding {
                Binding::Buffer(slice) => wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &self.buffer(slice.buffer)?.buffer,
                    offset: slice.offset,
                    size: NonZeroU64::new(slice.size),
                }),
                Binding::Texture(id) => {
                    let texture = self.texture(*id)?;
                    let view = match pipeline.bindings.slots().get(slot) {
                        Some(SlotKind::Writable(_)) => &texture.target_view,
                        _ => &texture.sample_view,
                    };
                    wgpu::BindingResource::TextureView(view)
                }
            };
            entries.push(wgpu::BindGroupEntry {
                binding: slot as u32,
                resource,
            });
        }
        for (i, sampler) in pipeline.bindings.samplers().iter().enumerate() {
            let Some(sampler) = self.device.samplers.get(sampler) else {
                return Err(UmbraError::ReplayFailed(format!("sampler {sampler:?} was never created")));
            };
            entries.push(wgpu::BindGroupEntry {
                binding: pipeline.bindings.sampler_slot(i as u32),
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        Ok(self.device.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&pipeline.label),
            layout: &pipeline.bind_group_layout,
            entries: &entries,
        }))
    }
}

fn depth_attachment(
    texture: &GpuTexture,
    read_only: bool,
    depth_clear: Option<f32>,
    stencil_clear: Option<u32>,
) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    let depth_ops = match (depth_clear, read_only) {
        (Some(value), _) => Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(value),
            store: wgpu::StoreOp::Store,
        }),
        (None, true) => None,
        (None, false) => Some(wgpu::Operations {
            load: wgpu::LoadOp::Load,
            store: wgpu::StoreOp::Store,
        }),
    };
    let stencil_ops = if texture.format.has_stencil_aspect() {
        match (stencil_clear, read_only) {
            (Some(value), _) => Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(value),
                store: wgpu::StoreOp::Store,
            }),
            (None, true) => None,
            (None, false) => Some(wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            }),
        }
    } else {
        None
    };
    wgpu::RenderPassDepthStencilAttachment {
        view: &texture.target_view,
        depth_ops,
        stencil_ops,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiview_mask_covers_every_layer() {
        assert_eq!(multiview_mask(1), None);
        assert_eq!(multiview_mask(3).map(NonZeroU32::get), Some(0b111));
        assert_eq!(multiview_mask(4).map(NonZeroU32::get), Some(0b1111));
    }
}
