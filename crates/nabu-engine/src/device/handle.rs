//! Opaque object handles handed out by a [`Device`](super::Device).
//!
//! Handles are plain integers. A device never reuses an id within its
//! lifetime, so a stale handle can be detected (and ignored) by the backend.

use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

handle!(
    /// A shader object (one stage, possibly not yet compiled).
    ShaderId,
    "shader"
);
handle!(
    /// A program object (attached shaders, possibly not yet linked).
    ProgramId,
    "program"
);
handle!(
    /// A vertex buffer object.
    BufferId,
    "buffer"
);
handle!(
    /// A 2D texture object.
    TextureId,
    "texture"
);

/// Vertex input location inside a linked program.
pub type AttribLocation = u32;

/// Monotonic id source shared by the backends.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub(crate) fn next(&mut self) -> u32 {
        self.next += 1;
        self.next
    }
}
