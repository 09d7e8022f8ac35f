//! Device layer.
//!
//! - [`Device`]: the GL-style command contract the pipeline drives
//! - [`HeadlessDevice`]: host-memory backend that records every call
//! - [`WgpuDevice`]: wgpu backend rendering into a [`Gpu`] surface
//! - [`Gpu`]: instance/adapter/device/queue and window surface ownership
//!
//! Both backends share one WGSL front end (naga) for compile, link and
//! reflection, so shader diagnostics are identical on either.

mod api;
mod block;
mod context;
mod error;
mod frame;
mod frontend;
mod handle;
mod headless;
mod init;
mod pixels;
mod surface;
mod types;
mod wgpu_device;

pub use api::Device;
pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use handle::{AttribLocation, BufferId, ProgramId, ShaderId, TextureId};
pub use headless::{DeviceCommand, HeadlessDevice, TextureImage};
pub use init::GpuInit;
pub use pixels::{required_len, row_pitch, unpack_rows};
pub use types::{
    BufferUsage, ClearMask, ComponentType, PixelFormat, ShaderStage, Topology, UniformLocation,
    UniformShape, UniformValue, VertexLayout,
};
pub use wgpu_device::WgpuDevice;
