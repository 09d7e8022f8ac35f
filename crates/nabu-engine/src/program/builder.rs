use std::fmt;

use crate::device::{Device, ProgramId, ShaderId, ShaderStage};
use crate::error::ShaderError;
use crate::render::RenderContext;

/// Shader text for one stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShaderSource<'a> {
    pub stage: ShaderStage,
    pub source: &'a str,
}

impl<'a> ShaderSource<'a> {
    pub const fn vertex(source: &'a str) -> Self {
        Self { stage: ShaderStage::Vertex, source }
    }

    pub const fn fragment(source: &'a str) -> Self {
        Self { stage: ShaderStage::Fragment, source }
    }
}

/// A successfully compiled shader object.
///
/// Not `Clone`: the handle has a single owner, first the caller, then the
/// [`Program`] it is linked into.
#[derive(Debug, PartialEq, Eq)]
pub struct CompiledShader {
    id: ShaderId,
    stage: ShaderStage,
}

impl CompiledShader {
    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

/// A linked, usable program. Owns the two shaders it was linked from.
#[derive(Debug, PartialEq, Eq)]
pub struct Program {
    id: ProgramId,
    vertex: ShaderId,
    fragment: ShaderId,
}

impl Program {
    pub fn id(&self) -> ProgramId {
        self.id
    }
}

/// Failed link. The program object is already released; the shaders are
/// handed back still valid.
#[derive(Debug)]
pub struct LinkFailure {
    pub error: ShaderError,
    pub vertex: CompiledShader,
    pub fragment: CompiledShader,
}

impl LinkFailure {
    /// Releases both shaders and keeps only the error.
    pub fn release<D: Device>(self, ctx: &mut RenderContext<D>) -> ShaderError {
        release_shader(ctx, self.vertex);
        release_shader(ctx, self.fragment);
        self.error
    }
}

impl fmt::Display for LinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for LinkFailure {}

/// Creates a shader object, submits `source` and compiles it.
///
/// On failure the shader object is released and the diagnostic log returned.
pub fn compile_shader<D: Device>(
    ctx: &mut RenderContext<D>,
    source: &ShaderSource<'_>,
) -> Result<CompiledShader, ShaderError> {
    let device = ctx.device_mut();
    let id = device.create_shader(source.stage);
    device.shader_source(id, source.source);
    device.compile_shader(id);

    if device.shader_compile_status(id) {
        log::debug!("compiled {} shader {id}", source.stage);
        return Ok(CompiledShader { id, stage: source.stage });
    }

    let log = device.shader_info_log(id);
    device.delete_shader(id);
    log::error!("{} shader failed to compile:\n{log}", source.stage);
    Err(ShaderError::Compile { stage: source.stage, log })
}

/// Links a vertex and a fragment shader into a program.
///
/// Shaders of the wrong stage are rejected before any device call.
pub fn link_program<D: Device>(
    ctx: &mut RenderContext<D>,
    vertex: CompiledShader,
    fragment: CompiledShader,
) -> Result<Program, LinkFailure> {
    let mismatch = if vertex.stage != ShaderStage::Vertex {
        Some((ShaderStage::Vertex, vertex.stage))
    } else if fragment.stage != ShaderStage::Fragment {
        Some((ShaderStage::Fragment, fragment.stage))
    } else {
        None
    };
    if let Some((expected, found)) = mismatch {
        return Err(LinkFailure {
            error: ShaderError::StageMismatch { expected, found },
            vertex,
            fragment,
        });
    }

    let device = ctx.device_mut();
    let id = device.create_program();
    device.attach_shader(id, vertex.id);
    device.attach_shader(id, fragment.id);
    device.link_program(id);

    if device.program_link_status(id) {
        log::debug!("linked {id} from {} + {}", vertex.id, fragment.id);
        return Ok(Program {
            id,
            vertex: vertex.id,
            fragment: fragment.id,
        });
    }

    let log = device.program_info_log(id);
    device.delete_program(id);
    ctx.forget_program(id);
    log::error!("program failed to link:\n{log}");
    Err(LinkFailure {
        error: ShaderError::Link { log },
        vertex,
        fragment,
    })
}

/// Compiles both stages and links them. Everything allocated by this call is
/// released on failure.
pub fn build_program<D: Device>(
    ctx: &mut RenderContext<D>,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<Program, ShaderError> {
    let vertex = compile_shader(ctx, &ShaderSource::vertex(vertex_source))?;
    let fragment = match compile_shader(ctx, &ShaderSource::fragment(fragment_source)) {
        Ok(fragment) => fragment,
        Err(e) => {
            release_shader(ctx, vertex);
            return Err(e);
        }
    };
    link_program(ctx, vertex, fragment).map_err(|failure| failure.release(ctx))
}

pub fn release_shader<D: Device>(ctx: &mut RenderContext<D>, shader: CompiledShader) {
    ctx.device_mut().delete_shader(shader.id);
}

/// Releases a program and the shaders it owns.
pub fn release_program<D: Device>(ctx: &mut RenderContext<D>, program: Program) {
    ctx.forget_program(program.id);
    let device = ctx.device_mut();
    device.delete_program(program.id);
    device.delete_shader(program.vertex);
    device.delete_shader(program.fragment);
    log::debug!("released {}", program.id);
}
