//! Frame rendering over a [`Device`](crate::device::Device).
//!
//! [`RenderContext`] owns the device and tracks which program is current.
//! [`FrameRenderer`] drives one clear/bind/draw/present pass against any
//! [`Surface`].

mod ctx;
mod frame;
mod surface;

pub use ctx::{ActiveProgram, RenderContext};
pub use frame::{DrawSpec, FrameRenderer, UniformBinding};
pub use surface::{HeadlessSurface, Surface};
