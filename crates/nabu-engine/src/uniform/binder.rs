use crate::device::{Device, ProgramId, UniformLocation, UniformShape};
use crate::error::BindingError;
use crate::program::Program;
use crate::render::{ActiveProgram, RenderContext};

/// A uniform name resolved on one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    name: String,
    program: ProgramId,
    location: Option<UniformLocation>,
}

impl UniformSlot {
    /// Looks `name` up on `program`. A name the program does not use yields
    /// an inactive slot, not an error. Resolving twice gives equal slots.
    pub fn resolve<D: Device>(ctx: &RenderContext<D>, program: &Program, name: &str) -> Self {
        let location = ctx.device().uniform_location(program.id(), name);
        if location.is_none() {
            log::debug!("uniform `{name}` is not active in {}", program.id());
        }
        Self {
            name: name.to_owned(),
            program: program.id(),
            location,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn location(&self) -> Option<&UniformLocation> {
        self.location.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.location.is_some()
    }

    pub fn shape(&self) -> Option<UniformShape> {
        self.location.map(|l| l.shape)
    }

    fn mismatch(&self, shape: UniformShape, attempted: &'static str) -> BindingError {
        BindingError::ShapeMismatch {
            name: self.name.clone(),
            shape,
            attempted,
        }
    }
}

impl<D: Device> ActiveProgram<'_, D> {
    /// The slot's location, or `None` for an inactive slot.
    fn target(&self, slot: &UniformSlot) -> Result<Option<UniformLocation>, BindingError> {
        self.check(slot.program)?;
        Ok(slot.location)
    }

    pub fn set_float(&mut self, slot: &UniformSlot, value: f32) -> Result<(), BindingError> {
        let Some(location) = self.target(slot)? else { return Ok(()) };
        match location.shape {
            UniformShape::Float | UniformShape::FloatArray { components: 1, .. } => {
                self.device().uniform_1f(&location, value);
                Ok(())
            }
            shape => Err(slot.mismatch(shape, "f32")),
        }
    }

    pub fn set_int(&mut self, slot: &UniformSlot, value: i32) -> Result<(), BindingError> {
        let Some(location) = self.target(slot)? else { return Ok(()) };
        match location.shape {
            UniformShape::Int => {
                self.device().uniform_1i(&location, value);
                Ok(())
            }
            shape => Err(slot.mismatch(shape, "i32")),
        }
    }

    pub fn set_vec2(&mut self, slot: &UniformSlot, value: [f32; 2]) -> Result<(), BindingError> {
        let Some(location) = self.target(slot)? else { return Ok(()) };
        match location.shape {
            UniformShape::Vec2 => {
                self.device().uniform_2f(&location, value);
                Ok(())
            }
            shape => Err(slot.mismatch(shape, "vec2<f32>")),
        }
    }

    /// Writes `values` from the slot's first float on, filling each array
    /// element's lanes in order.
    pub fn set_float_array(&mut self, slot: &UniformSlot, values: &[f32]) -> Result<(), BindingError> {
        let Some(location) = self.target(slot)? else { return Ok(()) };
        if !matches!(location.shape, UniformShape::Float | UniformShape::FloatArray { .. }) {
            return Err(slot.mismatch(location.shape, "a float array"));
        }
        if let Some(capacity) = location.shape.float_capacity() {
            if values.len() > capacity as usize {
                return Err(BindingError::ArrayOverflow {
                    name: slot.name.clone(),
                    capacity,
                    len: values.len(),
                });
            }
        }
        self.device().uniform_1fv(&location, values);
        Ok(())
    }

    /// Points a sampled texture at texture unit `unit`.
    ///
    /// Sampler slots accept the call as a no-op: every texture unit samples
    /// through the device's one sampler.
    pub fn set_texture_unit(&mut self, slot: &UniformSlot, unit: u32) -> Result<(), BindingError> {
        let Some(location) = self.target(slot)? else { return Ok(()) };
        match location.shape {
            UniformShape::Texture => {
                let unit = i32::try_from(unit).unwrap_or(i32::MAX);
                self.device().uniform_1i(&location, unit);
                Ok(())
            }
            UniformShape::Sampler => Ok(()),
            shape => Err(slot.mismatch(shape, "a texture unit")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{HeadlessDevice, UniformValue};
    use crate::program::build_program;
    use crate::test_shaders::{CONVOLUTION_FS, QUAD_VS, RESOLUTION_FS, SOLID_FS, TEXCOORD_VS};

    fn setup(vs: &str, fs: &str) -> (RenderContext<HeadlessDevice>, Program) {
        let mut ctx = RenderContext::new(HeadlessDevice::new());
        let program = build_program(&mut ctx, vs, fs).unwrap();
        (ctx, program)
    }

    #[test]
    fn resolve_is_idempotent() {
        let (ctx, program) = setup(QUAD_VS, RESOLUTION_FS);
        let a = UniformSlot::resolve(&ctx, &program, "r");
        let b = UniformSlot::resolve(&ctx, &program, "r");
        assert_eq!(a, b);
        assert_eq!(a.shape(), Some(UniformShape::Vec2));
    }

    #[test]
    fn vec2_reaches_the_device() {
        let (mut ctx, program) = setup(QUAD_VS, RESOLUTION_FS);
        let r = UniformSlot::resolve(&ctx, &program, "r");

        let mut active = ctx.use_program(&program);
        active.set_vec2(&r, [512.0, 512.0]).unwrap();

        assert_eq!(
            ctx.device().uniform_value(program.id(), "r"),
            Some(UniformValue::Vec2([512.0, 512.0]))
        );
    }

    #[test]
    fn inactive_slot_is_a_no_op() {
        let (mut ctx, program) = setup(QUAD_VS, SOLID_FS);
        let missing = UniformSlot::resolve(&ctx, &program, "u_missing");
        assert!(!missing.is_active());

        ctx.device_mut().clear_commands();
        let mut active = ctx.use_program(&program);
        active.set_float(&missing, 1.0).unwrap();
        active.set_vec2(&missing, [1.0, 2.0]).unwrap();
        active.set_float_array(&missing, &[1.0; 9]).unwrap();
        active.set_texture_unit(&missing, 0).unwrap();

        assert!(
            ctx.device()
                .commands()
                .iter()
                .all(|c| !matches!(c, crate::device::DeviceCommand::Uniform { .. }))
        );
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let (mut ctx, program) = setup(TEXCOORD_VS, CONVOLUTION_FS);
        let kernel = UniformSlot::resolve(&ctx, &program, "u_kernel");
        let size = UniformSlot::resolve(&ctx, &program, "u_textureSize");

        let mut active = ctx.use_program(&program);
        assert!(matches!(
            active.set_vec2(&kernel, [1.0, 1.0]),
            Err(BindingError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            active.set_float_array(&size, &[1.0, 2.0]),
            Err(BindingError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn array_overflow_is_reported() {
        let (mut ctx, program) = setup(TEXCOORD_VS, CONVOLUTION_FS);
        let kernel = UniformSlot::resolve(&ctx, &program, "u_kernel");

        let mut active = ctx.use_program(&program);
        active.set_float_array(&kernel, &[0.0; 12]).unwrap();
        assert_eq!(
            active.set_float_array(&kernel, &[0.0; 13]),
            Err(BindingError::ArrayOverflow {
                name: "u_kernel".into(),
                capacity: 12,
                len: 13,
            })
        );
    }

    #[test]
    fn slot_from_another_program_is_rejected() {
        let (mut ctx, first) = setup(QUAD_VS, RESOLUTION_FS);
        let second = build_program(&mut ctx, QUAD_VS, RESOLUTION_FS).unwrap();
        let r = UniformSlot::resolve(&ctx, &first, "r");

        let mut active = ctx.use_program(&second);
        assert_eq!(
            active.set_vec2(&r, [1.0, 1.0]),
            Err(BindingError::InactiveBinding {
                slot_program: first.id(),
                active_program: second.id(),
            })
        );
    }

    #[test]
    fn texture_unit_is_pushed_as_int() {
        let (mut ctx, program) = setup(TEXCOORD_VS, CONVOLUTION_FS);
        let texture = UniformSlot::resolve(&ctx, &program, "u_texture");
        let sampler = UniformSlot::resolve(&ctx, &program, "u_sampler");

        let mut active = ctx.use_program(&program);
        active.set_texture_unit(&texture, 2).unwrap();
        active.set_texture_unit(&sampler, 2).unwrap();

        assert_eq!(
            ctx.device().uniform_value(program.id(), "u_texture"),
            Some(UniformValue::Int(2))
        );
    }
}
