//! Host copy of a buffer-backed uniform resource.
//!
//! Both backends keep uniforms in these byte blocks and write them with the
//! same rules, so what the recording device reports is what the GPU reads.

use super::types::{UniformLocation, UniformShape, UniformValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HostBlock {
    bytes: Vec<u8>,
    /// Storage blocks grow to fit runtime-sized arrays; uniform blocks don't.
    growable: bool,
}

impl HostBlock {
    pub(crate) fn new(size: u32, growable: bool) -> Self {
        Self {
            bytes: vec![0; (size.max(16) as usize).next_multiple_of(16)],
            growable,
        }
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies `data` to `offset`. Returns `false` if the write was dropped.
    pub(crate) fn write(&mut self, offset: u32, data: &[u8]) -> bool {
        let start = offset as usize;
        let Some(end) = start.checked_add(data.len()) else {
            return false;
        };
        if end > self.bytes.len() {
            if !self.growable {
                log::warn!(
                    "uniform write past the end of its block ({end} > {}); ignored",
                    self.bytes.len()
                );
                return false;
            }
            self.bytes.resize(end.next_multiple_of(16), 0);
        }
        self.bytes[start..end].copy_from_slice(data);
        true
    }

    /// Writes `values` the way `glUniform1fv` does: array uniforms receive
    /// `components` floats per element, elements `stride` bytes apart, and
    /// only the first `values.len()` floats change.
    pub(crate) fn write_floats(&mut self, location: &UniformLocation, values: &[f32]) -> bool {
        let UniformShape::FloatArray { components, len, stride } = location.shape else {
            return self.write(location.offset, bytemuck::cast_slice(values));
        };

        let mut values = values;
        if let Some(capacity) = len.map(|n| n as usize * components as usize) {
            if values.len() > capacity {
                log::warn!(
                    "{} floats written to an array of {capacity}; extra dropped",
                    values.len()
                );
                values = &values[..capacity];
            }
        }

        values.iter().enumerate().all(|(i, v)| {
            let at = element_offset(location.offset, i, components, stride);
            at.is_some_and(|at| self.write(at, bytemuck::bytes_of(v)))
        })
    }

    /// Decodes the value at `location` according to its shape.
    pub(crate) fn read(&self, location: &UniformLocation) -> Option<UniformValue> {
        let at = location.offset;
        match location.shape {
            UniformShape::Float => self.read_f32(at).map(UniformValue::Float),
            UniformShape::Int => self.read_i32(at).map(UniformValue::Int),
            UniformShape::Vec2 => Some(UniformValue::Vec2([self.read_f32(at)?, self.read_f32(at + 4)?])),
            UniformShape::Vec3 => self.read_lanes(at, 3).map(UniformValue::Floats),
            UniformShape::Vec4 => self.read_lanes(at, 4).map(UniformValue::Floats),
            UniformShape::FloatArray { components, len, stride } => {
                let elements = match len {
                    Some(n) => n as usize,
                    None => self.bytes.len().saturating_sub(at as usize) / stride.max(1) as usize,
                };
                let count = elements * components as usize;
                (0..count)
                    .map(|i| element_offset(at, i, components, stride).and_then(|o| self.read_f32(o)))
                    .collect::<Option<Vec<_>>>()
                    .map(UniformValue::Floats)
            }
            UniformShape::Texture | UniformShape::Sampler | UniformShape::Opaque => None,
        }
    }

    fn read_f32(&self, offset: u32) -> Option<f32> {
        let start = offset as usize;
        self.bytes
            .get(start..start.checked_add(4)?)
            .map(bytemuck::pod_read_unaligned::<f32>)
    }

    fn read_i32(&self, offset: u32) -> Option<i32> {
        let start = offset as usize;
        self.bytes
            .get(start..start.checked_add(4)?)
            .map(bytemuck::pod_read_unaligned::<i32>)
    }

    fn read_lanes(&self, offset: u32, lanes: u32) -> Option<Vec<f32>> {
        (0..lanes).map(|i| self.read_f32(offset + i * 4)).collect()
    }
}

/// Byte offset of float `index` in an array of `components`-wide elements.
fn element_offset(base: u32, index: usize, components: u32, stride: u32) -> Option<u32> {
    let index = u32::try_from(index).ok()?;
    let components = components.max(1);
    (index / components)
        .checked_mul(stride)?
        .checked_add((index % components) * 4)?
        .checked_add(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ProgramId;

    fn location(offset: u32, shape: UniformShape) -> UniformLocation {
        UniformLocation { program: ProgramId(1), resource: 0, offset, shape }
    }

    fn f32_at(block: &HostBlock, offset: usize) -> f32 {
        bytemuck::pod_read_unaligned(&block.bytes()[offset..offset + 4])
    }

    const KERNEL: UniformShape = UniformShape::FloatArray { components: 4, len: Some(3), stride: 16 };

    #[test]
    fn vec4_packed_kernel_lands_on_consecutive_lanes() {
        // struct { u_kernel: array<vec4<f32>, 3>, u_textureSize: vec2<f32>, u_kernelWeight: f32 }
        let mut block = HostBlock::new(64, false);
        let size = location(48, UniformShape::Vec2);
        block.write(48, bytemuck::cast_slice(&[100.0f32, 100.0]));

        let taps: Vec<f32> = (1..=9).map(|i| i as f32).collect();
        assert!(block.write_floats(&location(0, KERNEL), &taps));

        for (i, tap) in taps.iter().enumerate() {
            assert_eq!(f32_at(&block, i * 4), *tap, "tap {i}");
        }
        assert_eq!(f32_at(&block, 36), 0.0);
        assert_eq!(block.read(&size), Some(UniformValue::Vec2([100.0, 100.0])));
    }

    #[test]
    fn scalar_arrays_follow_the_element_stride() {
        let mut block = HostBlock::new(64, false);
        let shape = UniformShape::FloatArray { components: 1, len: Some(3), stride: 16 };
        block.write_floats(&location(16, shape), &[1.0, 2.0, 3.0]);

        assert_eq!(f32_at(&block, 16), 1.0);
        assert_eq!(f32_at(&block, 32), 2.0);
        assert_eq!(f32_at(&block, 48), 3.0);
        assert_eq!(f32_at(&block, 20), 0.0);
    }

    #[test]
    fn short_writes_leave_later_elements_alone() {
        let mut block = HostBlock::new(48, false);
        block.write_floats(&location(0, KERNEL), &[1.0; 9]);
        block.write_floats(&location(0, KERNEL), &[2.0; 4]);

        let Some(UniformValue::Floats(lanes)) = block.read(&location(0, KERNEL)) else {
            panic!("expected floats");
        };
        assert_eq!(&lanes[..4], &[2.0; 4]);
        assert_eq!(&lanes[4..9], &[1.0; 5]);
        assert_eq!(&lanes[9..], &[0.0; 3]);
    }

    #[test]
    fn overlong_arrays_are_truncated() {
        let mut block = HostBlock::new(48, false);
        block.write_floats(&location(0, KERNEL), &[5.0; 20]);
        assert_eq!(block.read(&location(0, KERNEL)), Some(UniformValue::Floats(vec![5.0; 12])));
    }

    #[test]
    fn uniform_blocks_do_not_grow() {
        let mut block = HostBlock::new(16, false);
        assert!(!block.write(12, &[0; 8]));
        assert_eq!(block.bytes().len(), 16);

        let mut storage = HostBlock::new(16, true);
        assert!(storage.write(12, &[1; 8]));
        assert_eq!(storage.bytes().len(), 32);
    }
}
