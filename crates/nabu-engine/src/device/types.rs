use std::fmt;

use super::handle::ProgramId;

/// Pipeline stage a shader object compiles for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Primitive assembly mode for `draw_arrays`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    /// First vertex is shared by every triangle: (0,1,2), (0,2,3), ...
    TriangleFan,
}

/// Host pixel layout of texture uploads.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One byte per pixel, sampled as `(l, l, l, 1)`.
    Luminance,
    /// Two bytes per pixel, sampled as `(l, l, l, a)`.
    LuminanceAlpha,
    Rgb,
    Rgba,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Luminance => 1,
            PixelFormat::LuminanceAlpha => 2,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    /// Expands one host pixel to straight RGBA8.
    #[inline]
    pub(crate) fn to_rgba(self, px: &[u8]) -> [u8; 4] {
        match self {
            PixelFormat::Luminance => [px[0], px[0], px[0], 255],
            PixelFormat::LuminanceAlpha => [px[0], px[0], px[0], px[1]],
            PixelFormat::Rgb => [px[0], px[1], px[2], 255],
            PixelFormat::Rgba => [px[0], px[1], px[2], px[3]],
        }
    }
}

/// Scalar type of one vertex component in a buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Float32,
    UnsignedByte,
}

impl ComponentType {
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            ComponentType::Float32 => 4,
            ComponentType::UnsignedByte => 1,
        }
    }
}

/// How a vertex input reads its buffer (the `vertexAttribPointer` arguments).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    /// Components per vertex, `1..=4`.
    pub components: u32,
    pub component_type: ComponentType,
    /// Map integer components to `[0, 1]`. Ignored for floats.
    pub normalized: bool,
    /// Bytes between consecutive vertices; `0` means tightly packed.
    pub stride: u32,
    /// Byte offset of the first vertex in the buffer.
    pub offset: u32,
}

impl VertexLayout {
    /// Tightly packed float32 vectors starting at the buffer head.
    pub const fn packed_f32(components: u32) -> Self {
        Self {
            components,
            component_type: ComponentType::Float32,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    /// Size of one vertex element in bytes.
    #[inline]
    pub const fn element_size(&self) -> u32 {
        self.components * self.component_type.size()
    }

    /// Stride with the `0 = tightly packed` convention resolved.
    #[inline]
    pub const fn effective_stride(&self) -> u32 {
        if self.stride == 0 { self.element_size() } else { self.stride }
    }

    /// Number of whole vertices this layout can read from a buffer of
    /// `buffer_len` bytes.
    pub fn vertex_count(&self, buffer_len: u64) -> u64 {
        let head = u64::from(self.offset) + u64::from(self.element_size());
        if buffer_len < head {
            return 0;
        }
        (buffer_len - head) / u64::from(self.effective_stride().max(1)) + 1
    }
}

/// Update-frequency hint for buffer uploads.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    Static,
}

/// Buffers affected by `clear`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
}

impl ClearMask {
    pub const COLOR: Self = Self { color: true, depth: false };
    pub const COLOR_AND_DEPTH: Self = Self { color: true, depth: true };
}

/// Value shape of a uniform, as reported by the linked program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformShape {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    /// Array of `f32` or `vecN<f32>`. Host floats fill `components` lanes of
    /// each element before moving `stride` bytes to the next one.
    /// `len` is `None` for runtime-sized arrays.
    FloatArray {
        components: u32,
        len: Option<u32>,
        stride: u32,
    },
    /// Sampled image; its value is a texture unit index.
    Texture,
    Sampler,
    /// Anything the binder has no setter for (matrices, structs, ...).
    Opaque,
}

impl UniformShape {
    /// Number of floats an array uniform can hold, `None` if unbounded.
    pub fn float_capacity(&self) -> Option<u32> {
        match *self {
            UniformShape::Float => Some(1),
            UniformShape::FloatArray { components, len, .. } => len.map(|n| n * components),
            _ => Some(0),
        }
    }
}

impl fmt::Display for UniformShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniformShape::Float => f.write_str("f32"),
            UniformShape::Int => f.write_str("i32"),
            UniformShape::Vec2 => f.write_str("vec2<f32>"),
            UniformShape::Vec3 => f.write_str("vec3<f32>"),
            UniformShape::Vec4 => f.write_str("vec4<f32>"),
            UniformShape::FloatArray { components, len: Some(n), .. } => {
                write!(f, "array<f32x{components}, {n}>")
            }
            UniformShape::FloatArray { components, len: None, .. } => {
                write!(f, "array<f32x{components}>")
            }
            UniformShape::Texture => f.write_str("texture"),
            UniformShape::Sampler => f.write_str("sampler"),
            UniformShape::Opaque => f.write_str("opaque"),
        }
    }
}

/// Resolved uniform location.
///
/// Only meaningful for the program it was resolved on; devices ignore
/// writes while a different program is in use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub program: ProgramId,
    /// Index of the backing resource (buffer, texture or sampler binding)
    /// in the program's resource table.
    pub resource: u32,
    /// Byte offset inside the resource's buffer.
    pub offset: u32,
    pub shape: UniformShape,
}

/// A value pushed into a uniform location.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Floats(Vec<f32>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_count_covers_whole_elements_only() {
        let vec2 = VertexLayout::packed_f32(2);
        assert_eq!(vec2.vertex_count(32), 4);
        assert_eq!(vec2.vertex_count(31), 3);
        assert_eq!(vec2.vertex_count(7), 0);
    }

    #[test]
    fn vertex_count_honors_offset_and_stride() {
        // Interleaved position + texcoord, reading the texcoord half.
        let texcoord = VertexLayout { stride: 16, offset: 8, ..VertexLayout::packed_f32(2) };
        assert_eq!(texcoord.vertex_count(64), 4);
        assert_eq!(texcoord.vertex_count(56), 3);
        assert_eq!(texcoord.vertex_count(8), 0);
    }
}
