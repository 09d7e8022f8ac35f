//! Shader program construction.
//!
//! Compile failures release the shader object; link failures release the
//! program object and hand both shaders back to the caller.

mod builder;

pub use builder::{
    build_program, compile_shader, link_program, release_program, release_shader, CompiledShader,
    LinkFailure, Program, ShaderSource,
};
