//! Recording device that runs the binding state machine on host memory.
//!
//! `HeadlessDevice` compiles and links exactly like the GPU backend (same WGSL
//! front end) but never touches a GPU. Every call is appended to a command log,
//! and buffer contents, attribute pointers, uniform values and texture images
//! can be read back. Uniforms live in the same byte blocks the GPU backend
//! uploads, so a read back shows the layout the shader would see. Used for
//! tests and dry runs.

use std::collections::{BTreeSet, HashMap};

use super::api::Device;
use super::block::HostBlock;
use super::frontend::{ResourceKind, ShaderFrontend};
use super::handle::{AttribLocation, BufferId, IdAllocator, ProgramId, ShaderId, TextureId};
use super::pixels::unpack_rows;
use super::types::{
    BufferUsage, ClearMask, ComponentType, PixelFormat, ShaderStage, Topology, UniformLocation,
    UniformShape, UniformValue, VertexLayout,
};

/// One submitted device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateShader { shader: ShaderId, stage: ShaderStage },
    CompileShader { shader: ShaderId, success: bool },
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader { program: ProgramId, shader: ShaderId },
    LinkProgram { program: ProgramId, success: bool },
    DeleteProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    CreateBuffer(BufferId),
    BindArrayBuffer(Option<BufferId>),
    BufferData { buffer: BufferId, len: usize, usage: BufferUsage },
    DeleteBuffer(BufferId),
    EnableVertexAttribArray(AttribLocation),
    VertexAttribPointer { location: AttribLocation, buffer: BufferId, layout: VertexLayout },
    Uniform { location: UniformLocation, value: UniformValue },
    CreateTexture(TextureId),
    ActiveTexture(u32),
    BindTexture { unit: u32, texture: Option<TextureId> },
    PixelStoreUnpackAlignment(u32),
    TexImage2d { texture: TextureId, width: u32, height: u32, format: PixelFormat },
    DeleteTexture(TextureId),
    Viewport { x: i32, y: i32, width: u32, height: u32 },
    ClearColor([f32; 4]),
    Clear(ClearMask),
    DrawArrays { topology: Topology, first: u32, count: u32 },
}

/// A texture image as the device stored it (rows tightly packed).
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

pub struct HeadlessDevice {
    ids: IdAllocator,
    frontend: ShaderFrontend,
    commands: Vec<DeviceCommand>,

    buffers: HashMap<BufferId, Vec<u8>>,
    textures: HashMap<TextureId, Option<TextureImage>>,
    /// Buffer-backed uniforms per `(program, resource index)`.
    blocks: HashMap<(ProgramId, u32), HostBlock>,
    texture_units: HashMap<(ProgramId, u32), i32>,

    current_program: Option<ProgramId>,
    array_buffer: Option<BufferId>,
    active_unit: u32,
    units: HashMap<u32, TextureId>,
    unpack_alignment: u32,
    enabled: BTreeSet<AttribLocation>,
    pointers: HashMap<AttribLocation, (BufferId, VertexLayout)>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            ids: IdAllocator::default(),
            frontend: ShaderFrontend::default(),
            commands: Vec::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            blocks: HashMap::new(),
            texture_units: HashMap::new(),
            current_program: None,
            array_buffer: None,
            active_unit: 0,
            units: HashMap::new(),
            unpack_alignment: 4,
            enabled: BTreeSet::new(),
            pointers: HashMap::new(),
        }
    }

    /// Every call submitted so far, in order.
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Draw submissions as `(topology, first, count)`.
    pub fn draws(&self) -> Vec<(Topology, u32, u32)> {
        self.commands
            .iter()
            .filter_map(|c| match *c {
                DeviceCommand::DrawArrays { topology, first, count } => Some((topology, first, count)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    pub fn shader_exists(&self, shader: ShaderId) -> bool {
        self.frontend.shader_exists(shader)
    }

    pub fn program_exists(&self, program: ProgramId) -> bool {
        self.frontend.program_exists(program)
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn is_attrib_enabled(&self, location: AttribLocation) -> bool {
        self.enabled.contains(&location)
    }

    pub fn attrib_pointer(&self, location: AttribLocation) -> Option<(BufferId, VertexLayout)> {
        self.pointers.get(&location).copied()
    }

    /// Decodes the float32 stream an attribute location would read, one
    /// `Vec` per vertex.
    pub fn vertex_stream(&self, location: AttribLocation) -> Option<Vec<Vec<f32>>> {
        let (buffer, layout) = self.attrib_pointer(location)?;
        if layout.component_type != ComponentType::Float32 {
            return None;
        }
        let bytes = self.buffers.get(&buffer)?;

        let stride = layout.effective_stride() as usize;
        let element = layout.element_size() as usize;
        let mut out = Vec::new();
        let mut at = layout.offset as usize;
        while at + element <= bytes.len() {
            let vertex = bytes[at..at + element]
                .chunks_exact(4)
                .map(bytemuck::pod_read_unaligned::<f32>)
                .collect();
            out.push(vertex);
            at += stride;
        }
        Some(out)
    }

    /// Current value of `name` on `program`, decoded from its block.
    ///
    /// Unwritten block members read as zero. Array uniforms return every
    /// float the array holds, padding lanes included. Texture uniforms
    /// report their unit once one has been set.
    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let loc = self.frontend.uniform_location(program, name)?;
        match loc.shape {
            UniformShape::Texture => self
                .texture_units
                .get(&(program, loc.resource))
                .copied()
                .map(UniformValue::Int),
            _ => self.blocks.get(&(program, loc.resource))?.read(&loc),
        }
    }

    /// Raw bytes of the block backing resource `resource` of `program`.
    pub fn uniform_block(&self, program: ProgramId, resource: u32) -> Option<&[u8]> {
        self.blocks.get(&(program, resource)).map(HostBlock::bytes)
    }

    pub fn texture_image(&self, texture: TextureId) -> Option<&TextureImage> {
        self.textures.get(&texture)?.as_ref()
    }

    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.units.get(&unit).copied()
    }

    pub fn unpack_alignment(&self) -> u32 {
        self.unpack_alignment
    }

    fn record(&mut self, command: DeviceCommand) {
        log::trace!("{command:?}");
        self.commands.push(command);
    }

    fn write_uniform(&mut self, location: &UniformLocation, value: UniformValue) {
        if self.current_program != Some(location.program) {
            log::warn!(
                "uniform write for {} while {:?} is in use; ignored",
                location.program,
                self.current_program
            );
            return;
        }
        let key = (location.program, location.resource);
        match (&value, location.shape) {
            (UniformValue::Int(unit), UniformShape::Texture) => {
                if *unit < 0 {
                    log::warn!("negative texture unit {unit}; ignored");
                    return;
                }
                self.texture_units.insert(key, *unit);
            }
            _ => {
                let Some(block) = self.blocks.get_mut(&key) else {
                    log::warn!(
                        "{} has no buffer-backed uniform at resource {}; ignored",
                        location.program,
                        location.resource
                    );
                    return;
                };
                let written = match &value {
                    UniformValue::Float(v) => block.write(location.offset, bytemuck::bytes_of(v)),
                    UniformValue::Int(v) => block.write(location.offset, bytemuck::bytes_of(v)),
                    UniformValue::Vec2(v) => block.write(location.offset, bytemuck::cast_slice(v)),
                    UniformValue::Floats(v) => block.write_floats(location, v),
                };
                if !written {
                    return;
                }
            }
        }
        self.record(DeviceCommand::Uniform { location: *location, value });
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for HeadlessDevice {
    fn create_shader(&mut self, stage: ShaderStage) -> ShaderId {
        let shader = ShaderId(self.ids.next());
        self.frontend.create_shader(shader, stage);
        self.record(DeviceCommand::CreateShader { shader, stage });
        shader
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) {
        self.frontend.shader_source(shader, source);
    }

    fn compile_shader(&mut self, shader: ShaderId) {
        if let Some(success) = self.frontend.compile_shader(shader) {
            self.record(DeviceCommand::CompileShader { shader, success });
        }
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.frontend.compile_status(shader)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.frontend.shader_log(shader)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.frontend.delete_shader(shader);
        self.record(DeviceCommand::DeleteShader(shader));
    }

    fn create_program(&mut self) -> ProgramId {
        let program = ProgramId(self.ids.next());
        self.frontend.create_program(program);
        self.record(DeviceCommand::CreateProgram(program));
        program
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.frontend.attach_shader(program, shader);
        self.record(DeviceCommand::AttachShader { program, shader });
    }

    fn link_program(&mut self, program: ProgramId) {
        self.blocks.retain(|(p, _), _| *p != program);
        self.texture_units.retain(|(p, _), _| *p != program);
        let Some(success) = self.frontend.link_program(program) else { return };
        if let Some(linked) = self.frontend.linked(program).filter(|_| success) {
            for (index, res) in linked.resources.iter().enumerate() {
                let block = match res.kind {
                    ResourceKind::Uniform { size } => HostBlock::new(size, false),
                    ResourceKind::Storage { size } => HostBlock::new(size, true),
                    ResourceKind::Texture | ResourceKind::Sampler => continue,
                };
                self.blocks.insert((program, index as u32), block);
            }
        }
        self.record(DeviceCommand::LinkProgram { program, success });
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.frontend.link_status(program)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.frontend.program_log(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.frontend.delete_program(program);
        self.blocks.retain(|(p, _), _| *p != program);
        self.texture_units.retain(|(p, _), _| *p != program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.record(DeviceCommand::DeleteProgram(program));
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        if let Some(p) = program {
            if !self.frontend.link_status(p) {
                log::warn!("use_program: {p} is not linked; ignored");
                return;
            }
        }
        self.current_program = program;
        self.record(DeviceCommand::UseProgram(program));
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribLocation> {
        self.frontend.attrib_location(program, name)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.frontend.uniform_location(program, name)
    }

    fn create_buffer(&mut self) -> BufferId {
        let buffer = BufferId(self.ids.next());
        self.buffers.insert(buffer, Vec::new());
        self.record(DeviceCommand::CreateBuffer(buffer));
        buffer
    }

    fn bind_array_buffer(&mut self, buffer: Option<BufferId>) {
        self.array_buffer = buffer;
        self.record(DeviceCommand::BindArrayBuffer(buffer));
    }

    fn buffer_data(&mut self, data: &[u8], usage: BufferUsage) {
        let Some(buffer) = self.array_buffer else {
            log::warn!("buffer_data with no array buffer bound; ignored");
            return;
        };
        let Some(contents) = self.buffers.get_mut(&buffer) else {
            log::warn!("buffer_data on deleted {buffer}; ignored");
            return;
        };
        contents.clear();
        contents.extend_from_slice(data);
        self.record(DeviceCommand::BufferData { buffer, len: data.len(), usage });
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        self.pointers.retain(|_, (b, _)| *b != buffer);
        self.record(DeviceCommand::DeleteBuffer(buffer));
    }

    fn enable_vertex_attrib_array(&mut self, location: AttribLocation) {
        self.enabled.insert(location);
        self.record(DeviceCommand::EnableVertexAttribArray(location));
    }

    fn vertex_attrib_pointer(&mut self, location: AttribLocation, layout: VertexLayout) {
        let Some(buffer) = self.array_buffer else {
            log::warn!("vertex_attrib_pointer with no array buffer bound; ignored");
            return;
        };
        self.pointers.insert(location, (buffer, layout));
        self.record(DeviceCommand::VertexAttribPointer { location, buffer, layout });
    }

    fn uniform_1f(&mut self, location: &UniformLocation, value: f32) {
        self.write_uniform(location, UniformValue::Float(value));
    }

    fn uniform_2f(&mut self, location: &UniformLocation, value: [f32; 2]) {
        self.write_uniform(location, UniformValue::Vec2(value));
    }

    fn uniform_1fv(&mut self, location: &UniformLocation, values: &[f32]) {
        self.write_uniform(location, UniformValue::Floats(values.to_vec()));
    }

    fn uniform_1i(&mut self, location: &UniformLocation, value: i32) {
        self.write_uniform(location, UniformValue::Int(value));
    }

    fn create_texture(&mut self) -> TextureId {
        let texture = TextureId(self.ids.next());
        self.textures.insert(texture, None);
        self.record(DeviceCommand::CreateTexture(texture));
        texture
    }

    fn active_texture(&mut self, unit: u32) {
        self.active_unit = unit;
        self.record(DeviceCommand::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        let unit = self.active_unit;
        match texture {
            Some(t) => self.units.insert(unit, t),
            None => self.units.remove(&unit),
        };
        self.record(DeviceCommand::BindTexture { unit, texture });
    }

    fn pixel_store_unpack_alignment(&mut self, alignment: u32) {
        if !matches!(alignment, 1 | 2 | 4 | 8) {
            log::warn!("unpack alignment {alignment} is not 1, 2, 4 or 8; ignored");
            return;
        }
        self.unpack_alignment = alignment;
        self.record(DeviceCommand::PixelStoreUnpackAlignment(alignment));
    }

    fn tex_image_2d(&mut self, width: u32, height: u32, format: PixelFormat, pixels: &[u8]) {
        let Some(texture) = self.units.get(&self.active_unit).copied() else {
            log::warn!("tex_image_2d with no texture bound to unit {}; ignored", self.active_unit);
            return;
        };
        let bpp = format.bytes_per_pixel();
        let Some(rows) = unpack_rows(pixels, width, height, bpp, self.unpack_alignment) else {
            log::warn!(
                "tex_image_2d: {} bytes is too short for {width}x{height} {format:?} at alignment {}; ignored",
                pixels.len(),
                self.unpack_alignment
            );
            return;
        };
        self.textures.insert(
            texture,
            Some(TextureImage { width, height, format, pixels: rows }),
        );
        self.record(DeviceCommand::TexImage2d { texture, width, height, format });
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.units.retain(|_, t| *t != texture);
        self.record(DeviceCommand::DeleteTexture(texture));
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.record(DeviceCommand::Viewport { x, y, width, height });
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.record(DeviceCommand::ClearColor(rgba));
    }

    fn clear(&mut self, mask: ClearMask) {
        self.record(DeviceCommand::Clear(mask));
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) {
        let Some(program) = self.current_program else {
            log::warn!("draw_arrays with no program in use; ignored");
            return;
        };
        let Some(end) = first.checked_add(count) else {
            log::warn!("draw_arrays range {first}+{count} overflows; ignored");
            return;
        };
        if let Some(linked) = self.frontend.linked(program) {
            for attr in &linked.attributes {
                let pointer = self
                    .enabled
                    .contains(&attr.location)
                    .then(|| self.pointers.get(&attr.location))
                    .flatten();
                let Some((buffer, layout)) = pointer else {
                    log::warn!("draw_arrays: vertex input `{}` has no enabled buffer", attr.name);
                    continue;
                };
                let len = self.buffers.get(buffer).map_or(0, Vec::len) as u64;
                let available = layout.vertex_count(len);
                if count > 0 && u64::from(end) > available {
                    log::warn!(
                        "draw_arrays reads vertices {first}..{end} but `{}` holds {available}; ignored",
                        attr.name
                    );
                    return;
                }
            }
            for res in &linked.resources {
                if res.shape == UniformShape::Texture && self.units.is_empty() {
                    log::warn!("draw_arrays: `{}` samples but no texture is bound", res.name);
                }
            }
        }
        self.record(DeviceCommand::DrawArrays { topology, first, count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryBuffer;
    use crate::program::build_program;
    use crate::render::RenderContext;
    use crate::test_shaders::{CONVOLUTION_FS, QUAD_VS, SOLID_FS, TEXCOORD_VS};

    #[test]
    fn kernel_array_is_stored_at_vec4_lane_offsets() {
        let mut ctx = RenderContext::new(HeadlessDevice::new());
        let program = build_program(&mut ctx, TEXCOORD_VS, CONVOLUTION_FS).unwrap();
        let device = ctx.device_mut();
        let kernel = device.uniform_location(program.id(), "u_kernel").unwrap();
        let weight = device.uniform_location(program.id(), "u_kernelWeight").unwrap();
        assert_eq!(
            kernel.shape,
            UniformShape::FloatArray { components: 4, len: Some(3), stride: 16 }
        );

        let taps: Vec<f32> = (1..=9).map(|i| i as f32).collect();
        device.use_program(Some(program.id()));
        device.uniform_1fv(&kernel, &taps);
        device.uniform_1f(&weight, 45.0);

        let block = device.uniform_block(program.id(), kernel.resource).unwrap();
        let f32_at = |at: usize| bytemuck::pod_read_unaligned::<f32>(&block[at..at + 4]);
        for (i, tap) in taps.iter().enumerate() {
            assert_eq!(f32_at(kernel.offset as usize + i * 4), *tap, "tap {i}");
        }
        assert_eq!(f32_at(weight.offset as usize), 45.0);
        assert_eq!(
            device.uniform_value(program.id(), "u_kernelWeight"),
            Some(UniformValue::Float(45.0))
        );
    }

    #[test]
    fn uniform_write_from_another_program_is_dropped() {
        let mut ctx = RenderContext::new(HeadlessDevice::new());
        let convolution = build_program(&mut ctx, TEXCOORD_VS, CONVOLUTION_FS).unwrap();
        let solid = build_program(&mut ctx, QUAD_VS, SOLID_FS).unwrap();
        let device = ctx.device_mut();
        let weight = device.uniform_location(convolution.id(), "u_kernelWeight").unwrap();

        device.use_program(Some(solid.id()));
        device.clear_commands();
        device.uniform_1f(&weight, 3.0);

        assert!(device.commands().is_empty());
        assert_eq!(
            device.uniform_value(convolution.id(), "u_kernelWeight"),
            Some(UniformValue::Float(0.0))
        );
    }

    #[test]
    fn draw_past_the_buffer_end_is_not_recorded() {
        let mut ctx = RenderContext::new(HeadlessDevice::new());
        let program = build_program(&mut ctx, QUAD_VS, SOLID_FS).unwrap();
        let quad = GeometryBuffer::upload(&mut ctx, &program, "a_position", &[0.0; 8], 2).unwrap();

        let mut active = ctx.use_program(&program);
        quad.bind_for_draw(&mut active).unwrap();
        let device = active.device();
        device.draw_arrays(Topology::Triangles, 0, 6);
        device.draw_arrays(Topology::TriangleFan, 1, 4);
        device.draw_arrays(Topology::TriangleFan, u32::MAX - 1, 4);
        device.draw_arrays(Topology::TriangleFan, 0, 4);

        assert_eq!(ctx.device().draws(), vec![(Topology::TriangleFan, 0, 4)]);
    }
}
