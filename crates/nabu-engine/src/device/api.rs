use super::handle::{AttribLocation, BufferId, ProgramId, ShaderId, TextureId};
use super::types::{
    BufferUsage, ClearMask, PixelFormat, ShaderStage, Topology, UniformLocation, VertexLayout,
};

/// Device context: the GPU command stream the pipeline drives.
///
/// The contract is a GL-style state machine. Calls are issued in program order
/// and treated as fire-and-forget; the only read-backs are compile/link status,
/// info logs and location lookups. Binding state (current program, array buffer,
/// active texture unit, unpack alignment) lives in the device; the engine's
/// `RenderContext` mirrors it so callers never have to.
///
/// Operations other than compile/link cannot fail at this boundary. Backends
/// report misuse (writing to a stale handle, drawing with no program) through
/// `log::warn!` and ignore the call, the way a GL driver records an error flag.
pub trait Device {
    // ── shaders ──────────────────────────────────────────────────────────

    fn create_shader(&mut self, stage: ShaderStage) -> ShaderId;
    fn shader_source(&mut self, shader: ShaderId, source: &str);
    fn compile_shader(&mut self, shader: ShaderId);
    fn shader_compile_status(&self, shader: ShaderId) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&mut self, shader: ShaderId);

    // ── programs ─────────────────────────────────────────────────────────

    fn create_program(&mut self) -> ProgramId;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    fn link_program(&mut self, program: ProgramId);
    fn program_link_status(&self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&mut self, program: ProgramId);
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Location of an active vertex input, `None` if the linked program has no
    /// such input.
    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribLocation>;

    /// Location of an active uniform, `None` if the linked program does not use it.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    // ── vertex buffers ───────────────────────────────────────────────────

    fn create_buffer(&mut self) -> BufferId;
    fn bind_array_buffer(&mut self, buffer: Option<BufferId>);
    /// Replaces the contents of the bound array buffer.
    fn buffer_data(&mut self, data: &[u8], usage: BufferUsage);
    fn delete_buffer(&mut self, buffer: BufferId);
    fn enable_vertex_attrib_array(&mut self, location: AttribLocation);
    /// Points `location` at the bound array buffer.
    fn vertex_attrib_pointer(&mut self, location: AttribLocation, layout: VertexLayout);

    // ── uniforms (current program) ───────────────────────────────────────

    fn uniform_1f(&mut self, location: &UniformLocation, value: f32);
    fn uniform_2f(&mut self, location: &UniformLocation, value: [f32; 2]);
    fn uniform_1fv(&mut self, location: &UniformLocation, values: &[f32]);
    /// Integer uniforms, and the texture unit of a sampled image.
    fn uniform_1i(&mut self, location: &UniformLocation, value: i32);

    // ── textures ─────────────────────────────────────────────────────────

    fn create_texture(&mut self) -> TextureId;
    fn active_texture(&mut self, unit: u32);
    /// Binds `texture` to the active unit.
    fn bind_texture(&mut self, texture: Option<TextureId>);
    /// Row alignment used to read host pixel rows (1, 2, 4 or 8).
    fn pixel_store_unpack_alignment(&mut self, alignment: u32);
    /// Replaces the image of the texture bound to the active unit.
    fn tex_image_2d(&mut self, width: u32, height: u32, format: PixelFormat, pixels: &[u8]);
    fn delete_texture(&mut self, texture: TextureId);

    // ── raster ───────────────────────────────────────────────────────────

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    fn clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self, mask: ClearMask);
    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32);
}
