use std::fmt;

use crate::device::{ComponentType, ProgramId, ShaderStage, UniformShape};

/// Shader compile or link failure, carrying the device's diagnostic log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    Compile { stage: ShaderStage, log: String },
    Link { log: String },
    /// A shader of the wrong stage was passed where `expected` was required.
    StageMismatch {
        expected: ShaderStage,
        found: ShaderStage,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Compile { stage, log } => {
                write!(f, "{stage} shader failed to compile:\n{log}")
            }
            ShaderError::Link { log } => write!(f, "program failed to link:\n{log}"),
            ShaderError::StageMismatch { expected, found } => {
                write!(f, "expected a {expected} shader, got a {found} shader")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// A bind or set call that cannot be honored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The slot was resolved on a program other than the active one.
    InactiveBinding {
        slot_program: ProgramId,
        active_program: ProgramId,
    },
    /// The value does not fit the uniform's declared shape.
    ShapeMismatch {
        name: String,
        shape: UniformShape,
        attempted: &'static str,
    },
    ArrayOverflow {
        name: String,
        capacity: u32,
        len: usize,
    },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::InactiveBinding {
                slot_program,
                active_program,
            } => write!(
                f,
                "slot belongs to {slot_program} but {active_program} is active"
            ),
            BindingError::ShapeMismatch {
                name,
                shape,
                attempted,
            } => write!(f, "uniform `{name}` is {shape}, cannot set it as {attempted}"),
            BindingError::ArrayOverflow {
                name,
                capacity,
                len,
            } => write!(
                f,
                "uniform `{name}` holds {capacity} floats, {len} were supplied"
            ),
        }
    }
}

impl std::error::Error for BindingError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// Tightly packed rows whose byte length is not a multiple of the unpack
    /// alignment; uploading them would skew every row after the first.
    UnalignedRows { row_bytes: usize, alignment: u32 },
    SizeMismatch { expected: usize, actual: usize },
    EmptyImage { width: u32, height: u32 },
    /// The texture has no image yet.
    NotUploaded,
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::UnalignedRows {
                row_bytes,
                alignment,
            } => write!(
                f,
                "rows of {row_bytes} bytes are tightly packed but the unpack alignment is {alignment}; \
                 upload with an alignment of 1 or pad the rows"
            ),
            TextureError::SizeMismatch { expected, actual } => {
                write!(f, "pixel data is {actual} bytes, at least {expected} required")
            }
            TextureError::EmptyImage { width, height } => {
                write!(f, "texture image cannot be {width}x{height}")
            }
            TextureError::NotUploaded => f.write_str("texture has no uploaded image"),
        }
    }
}

impl std::error::Error for TextureError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// Components per vertex outside `1..=4`.
    InvalidComponentCount(u32),
    /// Data length is not a whole number of vertices.
    RaggedData { len: usize, components_per_vertex: u32 },
    /// Replacement data of a different component type than the upload.
    ComponentTypeMismatch { expected: ComponentType },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::InvalidComponentCount(n) => {
                write!(f, "a vertex attribute has 1 to 4 components, not {n}")
            }
            GeometryError::RaggedData {
                len,
                components_per_vertex,
            } => write!(
                f,
                "{len} components is not a multiple of {components_per_vertex} per vertex"
            ),
            GeometryError::ComponentTypeMismatch { expected } => {
                write!(f, "buffer holds {expected:?} components")
            }
        }
    }
}

impl std::error::Error for GeometryError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    Empty,
    ShapeMismatch {
        width: usize,
        height: usize,
        len: usize,
    },
    /// Row `row` has `found` weights where the first row has `expected`.
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// Weight `index` is NaN or infinite.
    NonFinite { index: usize },
    /// The shader reads `expected` taps; the kernel has `found`.
    TapCountMismatch { expected: usize, found: usize },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Empty => f.write_str("kernel has no weights"),
            KernelError::ShapeMismatch { width, height, len } => match width.checked_mul(*height) {
                Some(needed) => write!(f, "a {width}x{height} kernel needs {needed} weights, got {len}"),
                None => write!(f, "a {width}x{height} kernel is too large ({len} weights given)"),
            },
            KernelError::Ragged {
                row,
                expected,
                found,
            } => write!(f, "kernel row {row} has {found} weights, expected {expected}"),
            KernelError::NonFinite { index } => write!(f, "kernel weight {index} is not finite"),
            KernelError::TapCountMismatch { expected, found } => {
                write!(f, "shader reads {expected} kernel taps, kernel has {found}")
            }
        }
    }
}

impl std::error::Error for KernelError {}

/// Any pipeline failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Shader(ShaderError),
    Binding(BindingError),
    Texture(TextureError),
    Geometry(GeometryError),
    Kernel(KernelError),
    /// The display surface could not provide a frame to render into.
    SurfaceUnavailable(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Shader(e) => e.fmt(f),
            Error::Binding(e) => e.fmt(f),
            Error::Texture(e) => e.fmt(f),
            Error::Geometry(e) => e.fmt(f),
            Error::Kernel(e) => e.fmt(f),
            Error::SurfaceUnavailable(reason) => write!(f, "surface unavailable: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ShaderError> for Error {
    fn from(e: ShaderError) -> Self {
        Error::Shader(e)
    }
}

impl From<BindingError> for Error {
    fn from(e: BindingError) -> Self {
        Error::Binding(e)
    }
}

impl From<TextureError> for Error {
    fn from(e: TextureError) -> Self {
        Error::Texture(e)
    }
}

impl From<GeometryError> for Error {
    fn from(e: GeometryError) -> Self {
        Error::Geometry(e)
    }
}

impl From<KernelError> for Error {
    fn from(e: KernelError) -> Self {
        Error::Kernel(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
