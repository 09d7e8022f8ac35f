//! wgpu backend for the [`Device`] contract.
//!
//! The GL-style state machine is mirrored on the host and translated at draw
//! time:
//! - linked programs become a pair of shader modules plus a pipeline cache
//!   keyed by topology and vertex layout (auto-derived bind group layouts)
//! - uniforms are stored in per-resource host blocks and flushed to GPU
//!   buffers when dirty
//! - every clear and every draw is its own submission on the queue
//!
//! wgpu has no triangle fan topology; fans are expanded into an indexed
//! triangle list.

use std::collections::{HashMap, HashSet};

use wgpu::util::DeviceExt;

use super::api::Device;
use super::block::HostBlock;
use super::frontend::{ResourceKind, ShaderFrontend};
use super::handle::{AttribLocation, BufferId, IdAllocator, ProgramId, ShaderId, TextureId};
use super::pixels::unpack_rows;
use super::types::{
    BufferUsage, ClearMask, ComponentType, PixelFormat, ShaderStage, Topology, UniformLocation,
    UniformShape, VertexLayout,
};

/// Color view the device renders into, usually the acquired surface texture.
struct Target {
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct GpuTexture {
    // Kept alive for the view.
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct UniformBlock {
    host: HostBlock,
    storage: bool,
    buffer: Option<wgpu::Buffer>,
    dirty: bool,
}

impl UniformBlock {
    fn new(size: u32, storage: bool) -> Self {
        Self {
            host: HostBlock::new(size, storage),
            storage,
            buffer: None,
            dirty: true,
        }
    }

    fn write(&mut self, offset: u32, data: &[u8]) {
        self.dirty |= self.host.write(offset, data);
    }

    fn write_floats(&mut self, location: &UniformLocation, values: &[f32]) {
        self.dirty |= self.host.write_floats(location, values);
    }

    fn flush(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let size = self.host.bytes().len() as u64;
        if self.buffer.as_ref().is_none_or(|b| b.size() < size) {
            let usage = if self.storage {
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST
            } else {
                wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST
            };
            self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("nabu uniform block"),
                size,
                usage,
                mapped_at_creation: false,
            }));
            self.dirty = true;
        }

        if self.dirty {
            if let Some(buffer) = self.buffer.as_ref() {
                queue.write_buffer(buffer, 0, self.host.bytes());
            }
            self.dirty = false;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    topology: wgpu::PrimitiveTopology,
    /// `(shader location, format, array stride)` per vertex buffer slot.
    inputs: Vec<(u32, wgpu::VertexFormat, u64)>,
}

struct GpuProgram {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    vertex_entry: String,
    fragment_entry: String,
    /// Host copies of buffer-backed uniforms, keyed by resource index.
    blocks: HashMap<u32, UniformBlock>,
    /// Texture unit per sampled-image resource index.
    texture_units: HashMap<u32, u32>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

/// [`Device`] implementation on a wgpu device/queue pair.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,
    target: Option<Target>,
    sampler: wgpu::Sampler,

    ids: IdAllocator,
    frontend: ShaderFrontend,
    programs: HashMap<ProgramId, GpuProgram>,
    buffers: HashMap<BufferId, Option<wgpu::Buffer>>,
    textures: HashMap<TextureId, Option<GpuTexture>>,

    current_program: Option<ProgramId>,
    array_buffer: Option<BufferId>,
    active_unit: u32,
    units: HashMap<u32, TextureId>,
    unpack_alignment: u32,
    enabled: HashSet<AttribLocation>,
    pointers: HashMap<AttribLocation, (BufferId, VertexLayout)>,
    viewport: Option<(i32, i32, u32, u32)>,
    clear_color: wgpu::Color,
    warned_depth: bool,
}

impl WgpuDevice {
    /// Creates a device that renders into color targets of `target_format`.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, target_format: wgpu::TextureFormat) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("nabu nearest sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            device: device.clone(),
            queue: queue.clone(),
            target_format,
            target: None,
            sampler,
            ids: IdAllocator::default(),
            frontend: ShaderFrontend::default(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            current_program: None,
            array_buffer: None,
            active_unit: 0,
            units: HashMap::new(),
            unpack_alignment: 4,
            enabled: HashSet::new(),
            pointers: HashMap::new(),
            viewport: None,
            clear_color: wgpu::Color::TRANSPARENT,
            warned_depth: false,
        }
    }

    /// Directs subsequent clears and draws at `view`.
    pub fn set_target(&mut self, view: wgpu::TextureView, width: u32, height: u32) {
        self.target = Some(Target { view, width, height });
    }

    /// Detaches the current color target, returning its view.
    pub fn take_target(&mut self) -> Option<wgpu::TextureView> {
        self.target.take().map(|t| t.view)
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    fn block_mut(&mut self, location: &UniformLocation) -> Option<&mut UniformBlock> {
        if self.current_program != Some(location.program) {
            log::warn!(
                "uniform write for {} while {:?} is in use; ignored",
                location.program,
                self.current_program
            );
            return None;
        }
        self.programs
            .get_mut(&location.program)?
            .blocks
            .get_mut(&location.resource)
    }

    fn write_floats(&mut self, location: &UniformLocation, values: &[f32]) {
        if let Some(block) = self.block_mut(location) {
            block.write_floats(location, values);
        }
    }
}

impl Device for WgpuDevice {
    fn create_shader(&mut self, stage: ShaderStage) -> ShaderId {
        let shader = ShaderId(self.ids.next());
        self.frontend.create_shader(shader, stage);
        shader
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) {
        self.frontend.shader_source(shader, source);
    }

    fn compile_shader(&mut self, shader: ShaderId) {
        self.frontend.compile_shader(shader);
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.frontend.compile_status(shader)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.frontend.shader_log(shader)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.frontend.delete_shader(shader);
    }

    fn create_program(&mut self) -> ProgramId {
        let program = ProgramId(self.ids.next());
        self.frontend.create_program(program);
        program
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.frontend.attach_shader(program, shader);
    }

    fn link_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.frontend.link_program(program) != Some(true) {
            return;
        }
        let Some(linked) = self.frontend.linked(program) else { return };

        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("nabu vertex shader"),
            source: wgpu::ShaderSource::Wgsl(linked.vertex.source.as_str().into()),
        });
        let fragment = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("nabu fragment shader"),
            source: wgpu::ShaderSource::Wgsl(linked.fragment.source.as_str().into()),
        });

        let blocks = linked
            .resources
            .iter()
            .enumerate()
            .filter_map(|(index, res)| match res.kind {
                ResourceKind::Uniform { size } => Some((index as u32, UniformBlock::new(size, false))),
                ResourceKind::Storage { size } => Some((index as u32, UniformBlock::new(size, true))),
                ResourceKind::Texture | ResourceKind::Sampler => None,
            })
            .collect();

        log::debug!("{program} linked ({} resources)", linked.resources.len());

        self.programs.insert(
            program,
            GpuProgram {
                vertex,
                fragment,
                vertex_entry: linked.vertex.entry_point.clone(),
                fragment_entry: linked.fragment.entry_point.clone(),
                blocks,
                texture_units: HashMap::new(),
                pipelines: HashMap::new(),
            },
        );
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.frontend.link_status(program)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.frontend.program_log(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.frontend.delete_program(program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        if let Some(p) = program {
            if !self.programs.contains_key(&p) {
                log::warn!("use_program: {p} is not linked; ignored");
                return;
            }
        }
        self.current_program = program;
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribLocation> {
        self.frontend.attrib_location(program, name)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.frontend.uniform_location(program, name)
    }

    fn create_buffer(&mut self) -> BufferId {
        let buffer = BufferId(self.ids.next());
        self.buffers.insert(buffer, None);
        buffer
    }

    fn bind_array_buffer(&mut self, buffer: Option<BufferId>) {
        self.array_buffer = buffer;
    }

    fn buffer_data(&mut self, data: &[u8], _usage: BufferUsage) {
        let Some(id) = self.array_buffer else {
            log::warn!("buffer_data with no array buffer bound; ignored");
            return;
        };
        let Some(slot) = self.buffers.get_mut(&id) else {
            log::warn!("buffer_data on deleted {id}; ignored");
            return;
        };
        *slot = (!data.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("nabu vertex buffer"),
                contents: data,
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        self.pointers.retain(|_, (b, _)| *b != buffer);
    }

    fn enable_vertex_attrib_array(&mut self, location: AttribLocation) {
        self.enabled.insert(location);
    }

    fn vertex_attrib_pointer(&mut self, location: AttribLocation, layout: VertexLayout) {
        let Some(buffer) = self.array_buffer else {
            log::warn!("vertex_attrib_pointer with no array buffer bound; ignored");
            return;
        };
        self.pointers.insert(location, (buffer, layout));
    }

    fn uniform_1f(&mut self, location: &UniformLocation, value: f32) {
        self.write_floats(location, &[value]);
    }

    fn uniform_2f(&mut self, location: &UniformLocation, value: [f32; 2]) {
        self.write_floats(location, &value);
    }

    fn uniform_1fv(&mut self, location: &UniformLocation, values: &[f32]) {
        self.write_floats(location, values);
    }

    fn uniform_1i(&mut self, location: &UniformLocation, value: i32) {
        if location.shape == UniformShape::Texture {
            if self.current_program != Some(location.program) {
                log::warn!("texture unit set for {} while it is not in use; ignored", location.program);
                return;
            }
            let Ok(unit) = u32::try_from(value) else {
                log::warn!("negative texture unit {value}; ignored");
                return;
            };
            if let Some(program) = self.programs.get_mut(&location.program) {
                program.texture_units.insert(location.resource, unit);
            }
            return;
        }
        if let Some(block) = self.block_mut(location) {
            block.write(location.offset, bytemuck::bytes_of(&value));
        }
    }

    fn create_texture(&mut self) -> TextureId {
        let texture = TextureId(self.ids.next());
        self.textures.insert(texture, None);
        texture
    }

    fn active_texture(&mut self, unit: u32) {
        self.active_unit = unit;
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        match texture {
            Some(t) => self.units.insert(self.active_unit, t),
            None => self.units.remove(&self.active_unit),
        };
    }

    fn pixel_store_unpack_alignment(&mut self, alignment: u32) {
        if !matches!(alignment, 1 | 2 | 4 | 8) {
            log::warn!("unpack alignment {alignment} is not 1, 2, 4 or 8; ignored");
            return;
        }
        self.unpack_alignment = alignment;
    }

    fn tex_image_2d(&mut self, width: u32, height: u32, format: PixelFormat, pixels: &[u8]) {
        let Some(id) = self.units.get(&self.active_unit).copied() else {
            log::warn!("tex_image_2d with no texture bound to unit {}; ignored", self.active_unit);
            return;
        };
        if width == 0 || height == 0 {
            log::warn!("tex_image_2d with an empty {width}x{height} image; ignored");
            return;
        }
        let bpp = format.bytes_per_pixel();
        let Some(rows) = unpack_rows(pixels, width, height, bpp, self.unpack_alignment) else {
            log::warn!(
                "tex_image_2d: {} bytes is too short for {width}x{height} {format:?}; ignored",
                pixels.len()
            );
            return;
        };

        // No 3-channel formats on the GPU side; expand everything to RGBA8.
        let rgba: Vec<u8> = rows
            .chunks_exact(bpp as usize)
            .flat_map(|px| format.to_rgba(px))
            .collect();

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("nabu texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.textures.insert(id, Some(GpuTexture { _texture: texture, view }));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.units.retain(|_, t| *t != texture);
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = Some((x, y, width, height));
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        let [r, g, b, a] = rgba.map(f64::from);
        self.clear_color = wgpu::Color { r, g, b, a };
    }

    fn clear(&mut self, mask: ClearMask) {
        if mask.depth && !self.warned_depth {
            log::debug!("no depth attachment; depth clear skipped");
            self.warned_depth = true;
        }
        if !mask.color {
            return;
        }
        let Some(target) = self.target.as_ref() else {
            log::warn!("clear with no render target; ignored");
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nabu clear encoder"),
            });
        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("nabu clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) {
        if count == 0 {
            return;
        }
        let Some(end) = first.checked_add(count) else {
            log::warn!("draw_arrays range {first}+{count} overflows; ignored");
            return;
        };
        let Some(program_id) = self.current_program else {
            log::warn!("draw_arrays with no program in use; ignored");
            return;
        };
        let Some(target) = self.target.as_ref() else {
            log::warn!("draw_arrays with no render target; ignored");
            return;
        };
        let (Some(linked), Some(program)) =
            (self.frontend.linked(program_id), self.programs.get_mut(&program_id))
        else {
            return;
        };

        // Vertex inputs, one buffer slot per active attribute.
        let mut inputs = Vec::with_capacity(linked.attributes.len());
        for attr in &linked.attributes {
            let pointer = self
                .enabled
                .contains(&attr.location)
                .then(|| self.pointers.get(&attr.location))
                .flatten();
            let Some(&(buffer_id, layout)) = pointer else {
                log::warn!("vertex input `{}` has no enabled buffer; draw skipped", attr.name);
                return;
            };
            let Some(Some(buffer)) = self.buffers.get(&buffer_id) else {
                log::warn!("vertex input `{}` reads an empty or deleted buffer; draw skipped", attr.name);
                return;
            };
            let Some(format) = vertex_format(&layout) else {
                log::warn!("vertex input `{}` has unsupported layout {layout:?}; draw skipped", attr.name);
                return;
            };
            let stride = u64::from(layout.effective_stride());
            let offset = u64::from(layout.offset);
            if stride % wgpu::VERTEX_ALIGNMENT != 0 || offset >= buffer.size() {
                log::warn!("vertex input `{}` has misaligned stride or offset; draw skipped", attr.name);
                return;
            }
            let available = layout.vertex_count(buffer.size());
            if u64::from(end) > available {
                log::warn!(
                    "draw reads vertices {first}..{end} but `{}` holds {available}; draw skipped",
                    attr.name
                );
                return;
            }
            inputs.push((attr.location, format, stride, buffer, offset));
        }

        let (primitive, indices) = match topology {
            Topology::Points => (wgpu::PrimitiveTopology::PointList, None),
            Topology::Lines => (wgpu::PrimitiveTopology::LineList, None),
            Topology::LineStrip => (wgpu::PrimitiveTopology::LineStrip, None),
            Topology::Triangles => (wgpu::PrimitiveTopology::TriangleList, None),
            Topology::TriangleStrip => (wgpu::PrimitiveTopology::TriangleStrip, None),
            Topology::TriangleFan => {
                let Some(indices) = fan_indices(first, count).filter(|i| !i.is_empty()) else {
                    return;
                };
                (wgpu::PrimitiveTopology::TriangleList, Some(indices))
            }
        };

        let key = PipelineKey {
            topology: primitive,
            inputs: inputs.iter().map(|&(loc, format, stride, _, _)| (loc, format, stride)).collect(),
        };
        if !program.pipelines.contains_key(&key) {
            log::debug!("creating pipeline for {program_id} ({:?})", key.topology);
            let pipeline = create_pipeline(&self.device, program, self.target_format, &key);
            program.pipelines.insert(key.clone(), pipeline);
        }

        for block in program.blocks.values_mut() {
            block.flush(&self.device, &self.queue);
        }

        let Some(pipeline) = program.pipelines.get(&key) else { return };

        let groups = linked.resources.iter().map(|r| r.group).max().map_or(0, |g| g + 1);
        let mut bind_groups = Vec::with_capacity(groups as usize);
        for group in 0..groups {
            let mut entries = Vec::new();
            for (index, res) in linked.resources.iter().enumerate() {
                if res.group != group {
                    continue;
                }
                let index = index as u32;
                let resource = match res.kind {
                    ResourceKind::Uniform { .. } | ResourceKind::Storage { .. } => {
                        let Some(buffer) = program.blocks.get(&index).and_then(|b| b.buffer.as_ref())
                        else {
                            return;
                        };
                        buffer.as_entire_binding()
                    }
                    ResourceKind::Texture => {
                        let unit = program.texture_units.get(&index).copied().unwrap_or(0);
                        let texture = self
                            .units
                            .get(&unit)
                            .and_then(|t| self.textures.get(t))
                            .and_then(Option::as_ref);
                        let Some(texture) = texture else {
                            log::warn!(
                                "`{}` samples unit {unit}, which has no uploaded texture; draw skipped",
                                res.name
                            );
                            return;
                        };
                        wgpu::BindingResource::TextureView(&texture.view)
                    }
                    ResourceKind::Sampler => wgpu::BindingResource::Sampler(&self.sampler),
                };
                entries.push(wgpu::BindGroupEntry {
                    binding: res.binding,
                    resource,
                });
            }

            let layout = pipeline.get_bind_group_layout(group);
            bind_groups.push(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("nabu bind group"),
                layout: &layout,
                entries: &entries,
            }));
        }

        let viewport = match self.viewport {
            Some(vp) => match viewport_in_target(vp, target.width, target.height) {
                Some(rect) => Some(rect),
                None => {
                    log::debug!("viewport {vp:?} is outside the target; draw skipped");
                    return;
                }
            },
            None => None,
        };

        let index_buffer = indices.as_ref().map(|indices| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("nabu fan indices"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nabu draw encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("nabu draw"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Some([x, y, w, h]) = viewport {
                rpass.set_viewport(x, y, w, h, 0.0, 1.0);
            }
            rpass.set_pipeline(pipeline);
            for (group, bind_group) in bind_groups.iter().enumerate() {
                rpass.set_bind_group(group as u32, bind_group, &[]);
            }
            for (slot, &(_, _, _, buffer, offset)) in inputs.iter().enumerate() {
                rpass.set_vertex_buffer(slot as u32, buffer.slice(offset..));
            }

            match (&index_buffer, &indices) {
                (Some(ib), Some(indices)) => {
                    rpass.set_index_buffer(ib.slice(..), wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(0..indices.len() as u32, 0, 0..1);
                }
                _ => rpass.draw(first..end, 0..1),
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    program: &GpuProgram,
    target_format: wgpu::TextureFormat,
    key: &PipelineKey,
) -> wgpu::RenderPipeline {
    let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
        .inputs
        .iter()
        .map(|&(shader_location, format, _)| {
            [wgpu::VertexAttribute {
                format,
                offset: 0,
                shader_location,
            }]
        })
        .collect();

    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = key
        .inputs
        .iter()
        .zip(&attributes)
        .map(|(&(_, _, array_stride), attributes)| wgpu::VertexBufferLayout {
            array_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        })
        .collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("nabu pipeline"),
        // Bind group layouts are derived from the shaders.
        layout: None,
        vertex: wgpu::VertexState {
            module: &program.vertex,
            entry_point: Some(program.vertex_entry.as_str()),
            compilation_options: Default::default(),
            buffers: &buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: &program.fragment,
            entry_point: Some(program.fragment_entry.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: key.topology,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

fn vertex_format(layout: &VertexLayout) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;

    Some(match (layout.component_type, layout.components, layout.normalized) {
        (ComponentType::Float32, 1, _) => F::Float32,
        (ComponentType::Float32, 2, _) => F::Float32x2,
        (ComponentType::Float32, 3, _) => F::Float32x3,
        (ComponentType::Float32, 4, _) => F::Float32x4,
        (ComponentType::UnsignedByte, 2, true) => F::Unorm8x2,
        (ComponentType::UnsignedByte, 4, true) => F::Unorm8x4,
        (ComponentType::UnsignedByte, 2, false) => F::Uint8x2,
        (ComponentType::UnsignedByte, 4, false) => F::Uint8x4,
        _ => return None,
    })
}

/// Triangle list indices equivalent to a fan over `first..first + count`.
/// `None` if the last index does not fit in a `u32`.
fn fan_indices(first: u32, count: u32) -> Option<Vec<u32>> {
    first.checked_add(count)?;
    Some(
        (1..count.saturating_sub(1))
            .flat_map(|i| [first, first + i, first + i + 1])
            .collect(),
    )
}

/// Converts a GL viewport (bottom-left origin) into a wgpu viewport rect
/// (top-left origin) clamped to the target. `None` if nothing is visible.
fn viewport_in_target(vp: (i32, i32, u32, u32), width: u32, height: u32) -> Option<[f32; 4]> {
    let (x, y, w, h) = (i64::from(vp.0), i64::from(vp.1), i64::from(vp.2), i64::from(vp.3));
    let (tw, th) = (i64::from(width), i64::from(height));
    let top = th - (y + h);

    let x0 = x.clamp(0, tw);
    let x1 = (x + w).clamp(0, tw);
    let y0 = top.clamp(0, th);
    let y1 = (top + h).clamp(0, th);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some([x0 as f32, y0 as f32, (x1 - x0) as f32, (y1 - y0) as f32])
}
