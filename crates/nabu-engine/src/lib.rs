//! Nabu engine crate.
//!
//! A small GL-style rendering pipeline: shader programs, vertex buffers,
//! uniforms, textures and convolution filters, all issued through the
//! [`device::Device`] trait. [`device::HeadlessDevice`] records commands for
//! tests; [`device::WgpuDevice`] renders through wgpu into a winit window.

pub mod device;
pub mod error;
pub mod program;
pub mod geometry;
pub mod uniform;
pub mod texture;
pub mod filter;
pub mod render;

pub mod core;
pub mod window;
pub mod logging;

#[cfg(test)]
mod test_shaders;

pub use error::{
    BindingError, Error, GeometryError, KernelError, Result, ShaderError, TextureError,
};
