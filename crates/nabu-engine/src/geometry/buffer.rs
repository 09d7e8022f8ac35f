use crate::device::{
    AttribLocation, BufferId, BufferUsage, ComponentType, Device, ProgramId, VertexLayout,
};
use crate::error::{BindingError, GeometryError};
use crate::program::Program;
use crate::render::{ActiveProgram, RenderContext};

/// A named vertex input resolved on one program, plus how its buffer is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSlot {
    pub name: String,
    pub program: ProgramId,
    /// `None` when the program has no active input of this name.
    pub location: Option<AttribLocation>,
    pub layout: VertexLayout,
}

impl AttributeSlot {
    pub fn is_active(&self) -> bool {
        self.location.is_some()
    }
}

/// A device vertex buffer feeding one attribute.
#[derive(Debug)]
pub struct GeometryBuffer {
    slot: AttributeSlot,
    buffer: BufferId,
    vertex_count: u32,
}

impl GeometryBuffer {
    /// Uploads tightly packed float32 vectors of `components_per_vertex`
    /// components for `attribute`.
    pub fn upload<D: Device>(
        ctx: &mut RenderContext<D>,
        program: &Program,
        attribute: &str,
        components: &[f32],
        components_per_vertex: u32,
    ) -> Result<Self, GeometryError> {
        let layout = VertexLayout::packed_f32(components_per_vertex);
        Self::create(ctx, program, attribute, bytemuck::cast_slice(components), components.len(), layout)
    }

    /// Uploads unsigned byte vectors, optionally normalized to `[0, 1]`.
    pub fn upload_bytes<D: Device>(
        ctx: &mut RenderContext<D>,
        program: &Program,
        attribute: &str,
        components: &[u8],
        components_per_vertex: u32,
        normalized: bool,
    ) -> Result<Self, GeometryError> {
        let layout = VertexLayout {
            components: components_per_vertex,
            component_type: ComponentType::UnsignedByte,
            normalized,
            stride: 0,
            offset: 0,
        };
        Self::create(ctx, program, attribute, components, components.len(), layout)
    }

    fn create<D: Device>(
        ctx: &mut RenderContext<D>,
        program: &Program,
        attribute: &str,
        bytes: &[u8],
        len: usize,
        layout: VertexLayout,
    ) -> Result<Self, GeometryError> {
        let vertex_count = vertex_count(len, layout.components)?;

        let location = ctx.device().attrib_location(program.id(), attribute);
        if location.is_none() {
            log::debug!("attribute `{attribute}` is not active in {}", program.id());
        }

        let buffer = ctx.device_mut().create_buffer();
        ctx.bind_array_buffer(buffer);
        ctx.device_mut().buffer_data(bytes, BufferUsage::Static);
        log::debug!("{buffer}: {vertex_count} vertices for `{attribute}`");

        Ok(Self {
            slot: AttributeSlot {
                name: attribute.to_owned(),
                program: program.id(),
                location,
                layout,
            },
            buffer,
            vertex_count,
        })
    }

    /// Replaces the buffer contents. The slot is not re-resolved.
    pub fn replace<D: Device>(
        &mut self,
        ctx: &mut RenderContext<D>,
        components: &[f32],
    ) -> Result<(), GeometryError> {
        if self.slot.layout.component_type != ComponentType::Float32 {
            return Err(GeometryError::ComponentTypeMismatch {
                expected: self.slot.layout.component_type,
            });
        }
        self.vertex_count = vertex_count(components.len(), self.slot.layout.components)?;

        ctx.bind_array_buffer(self.buffer);
        ctx.device_mut()
            .buffer_data(bytemuck::cast_slice(components), BufferUsage::Static);
        Ok(())
    }

    /// Binds the buffer and points the slot's input stream at it.
    ///
    /// A slot with no location is a no-op.
    pub fn bind_for_draw<D: Device>(
        &self,
        active: &mut ActiveProgram<'_, D>,
    ) -> Result<(), BindingError> {
        active.check(self.slot.program)?;
        let Some(location) = self.slot.location else {
            return Ok(());
        };

        active.ctx().bind_array_buffer(self.buffer);
        let device = active.device();
        device.enable_vertex_attrib_array(location);
        device.vertex_attrib_pointer(location, self.slot.layout);
        Ok(())
    }

    pub fn slot(&self) -> &AttributeSlot {
        &self.slot
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn release<D: Device>(self, ctx: &mut RenderContext<D>) {
        ctx.forget_buffer(self.buffer);
        ctx.device_mut().delete_buffer(self.buffer);
    }
}

fn vertex_count(len: usize, components_per_vertex: u32) -> Result<u32, GeometryError> {
    if !(1..=4).contains(&components_per_vertex) {
        return Err(GeometryError::InvalidComponentCount(components_per_vertex));
    }
    if len % components_per_vertex as usize != 0 {
        return Err(GeometryError::RaggedData {
            len,
            components_per_vertex,
        });
    }
    Ok((len / components_per_vertex as usize) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;
    use crate::program::build_program;
    use crate::test_shaders::{QUAD_VS, SOLID_FS, TEXCOORD_VS};

    const QUAD: [f32; 8] = [0.0, 0.0, 0.0, 0.5, 0.7, 0.5, 0.7, 0.0];

    fn setup(vs: &str) -> (RenderContext<HeadlessDevice>, Program) {
        let mut ctx = RenderContext::new(HeadlessDevice::new());
        let program = build_program(&mut ctx, vs, SOLID_FS).unwrap();
        (ctx, program)
    }

    #[test]
    fn bound_stream_reads_back_in_order() {
        let (mut ctx, program) = setup(QUAD_VS);
        let quad = GeometryBuffer::upload(&mut ctx, &program, "a_position", &QUAD, 2).unwrap();
        assert_eq!(quad.vertex_count(), 4);

        let mut active = ctx.use_program(&program);
        quad.bind_for_draw(&mut active).unwrap();

        let location = quad.slot().location.unwrap();
        let stream = ctx.device().vertex_stream(location).unwrap();
        assert_eq!(
            stream,
            vec![vec![0.0, 0.0], vec![0.0, 0.5], vec![0.7, 0.5], vec![0.7, 0.0]]
        );
        assert!(ctx.device().is_attrib_enabled(location));
    }

    #[test]
    fn inactive_attribute_binds_as_no_op() {
        let (mut ctx, program) = setup(QUAD_VS);
        let colors = GeometryBuffer::upload(&mut ctx, &program, "a_color", &[1.0; 12], 3).unwrap();
        assert!(!colors.slot().is_active());

        let mut active = ctx.use_program(&program);
        colors.bind_for_draw(&mut active).unwrap();
        assert!(!ctx.device().is_attrib_enabled(0));
    }

    #[test]
    fn rejects_bad_component_counts() {
        let (mut ctx, program) = setup(QUAD_VS);
        assert_eq!(
            GeometryBuffer::upload(&mut ctx, &program, "a_position", &QUAD, 5).unwrap_err(),
            GeometryError::InvalidComponentCount(5)
        );
        assert_eq!(
            GeometryBuffer::upload(&mut ctx, &program, "a_position", &QUAD[..7], 2).unwrap_err(),
            GeometryError::RaggedData { len: 7, components_per_vertex: 2 }
        );
    }

    #[test]
    fn replace_keeps_the_slot() {
        let (mut ctx, program) = setup(TEXCOORD_VS);
        let mut coords =
            GeometryBuffer::upload(&mut ctx, &program, "a_texcoords", &[0.0; 8], 2).unwrap();
        let slot = coords.slot().clone();

        coords.replace(&mut ctx, &[1.0; 12]).unwrap();
        assert_eq!(coords.slot(), &slot);
        assert_eq!(coords.vertex_count(), 6);
        assert_eq!(
            ctx.device().buffer_contents(coords.buffer()).map(<[u8]>::len),
            Some(48)
        );
    }

    #[test]
    fn byte_buffers_cannot_be_replaced_with_floats() {
        let (mut ctx, program) = setup(QUAD_VS);
        let mut bytes =
            GeometryBuffer::upload_bytes(&mut ctx, &program, "a_position", &[0, 255, 255, 0], 2, true)
                .unwrap();
        assert_eq!(bytes.slot().layout.element_size(), 2);
        assert!(matches!(
            bytes.replace(&mut ctx, &QUAD),
            Err(GeometryError::ComponentTypeMismatch { .. })
        ));
    }

    #[test]
    fn slot_from_another_program_is_rejected() {
        let (mut ctx, first) = setup(QUAD_VS);
        let second = build_program(&mut ctx, QUAD_VS, SOLID_FS).unwrap();
        let quad = GeometryBuffer::upload(&mut ctx, &first, "a_position", &QUAD, 2).unwrap();

        let mut active = ctx.use_program(&second);
        assert_eq!(
            quad.bind_for_draw(&mut active),
            Err(BindingError::InactiveBinding {
                slot_program: first.id(),
                active_program: second.id(),
            })
        );
    }
}
