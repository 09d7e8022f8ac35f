//! Vertex attribute buffers.

mod buffer;

pub use buffer::{AttributeSlot, GeometryBuffer};
