use crate::device::{BufferId, Device, ProgramId, TextureId};
use crate::error::BindingError;
use crate::program::Program;

/// Owns the device and mirrors its binding state.
///
/// Every pipeline operation goes through a `RenderContext` instead of
/// ambient global state. The mirror lets the context skip redundant binds
/// (array buffer, texture unit, unpack alignment) and answer "which program
/// is active" without a device read-back.
pub struct RenderContext<D: Device> {
    device: D,
    current_program: Option<ProgramId>,
    array_buffer: Option<BufferId>,
    active_unit: u32,
    unpack_alignment: u32,
}

impl<D: Device> RenderContext<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            current_program: None,
            array_buffer: None,
            active_unit: 0,
            // GL default.
            unpack_alignment: 4,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Direct device access. Calls made here bypass the binding mirror, so
    /// prefer the typed pipeline operations.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    /// Makes `program` current and returns the token every bind/set call
    /// requires. The token borrows the context, so no other program can
    /// become current while it is alive.
    pub fn use_program(&mut self, program: &Program) -> ActiveProgram<'_, D> {
        let id = program.id();
        if self.current_program != Some(id) {
            self.device.use_program(Some(id));
            self.current_program = Some(id);
        }
        ActiveProgram { ctx: self, program: id }
    }

    /// Forgets a program that is about to be deleted.
    pub(crate) fn forget_program(&mut self, program: ProgramId) {
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    pub(crate) fn bind_array_buffer(&mut self, buffer: BufferId) {
        if self.array_buffer != Some(buffer) {
            self.device.bind_array_buffer(Some(buffer));
            self.array_buffer = Some(buffer);
        }
    }

    pub(crate) fn forget_buffer(&mut self, buffer: BufferId) {
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
    }

    pub(crate) fn active_texture(&mut self, unit: u32) {
        if self.active_unit != unit {
            self.device.active_texture(unit);
            self.active_unit = unit;
        }
    }

    pub(crate) fn active_unit(&self) -> u32 {
        self.active_unit
    }

    /// Texture bindings are not mirrored: uploads and draws rebind as needed.
    pub(crate) fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.active_texture(unit);
        self.device.bind_texture(Some(texture));
    }

    pub(crate) fn set_unpack_alignment(&mut self, alignment: u32) {
        if self.unpack_alignment != alignment {
            self.device.pixel_store_unpack_alignment(alignment);
            self.unpack_alignment = alignment;
        }
    }

    pub fn unpack_alignment(&self) -> u32 {
        self.unpack_alignment
    }
}

/// Proof that a program is current on a [`RenderContext`].
///
/// Attribute binds and uniform writes take `&mut ActiveProgram`, and reject
/// slots resolved on any other program with
/// [`BindingError::InactiveBinding`].
pub struct ActiveProgram<'c, D: Device> {
    ctx: &'c mut RenderContext<D>,
    program: ProgramId,
}

impl<D: Device> ActiveProgram<'_, D> {
    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub(crate) fn ctx(&mut self) -> &mut RenderContext<D> {
        self.ctx
    }

    pub(crate) fn device(&mut self) -> &mut D {
        &mut self.ctx.device
    }

    /// Fails unless `slot_program` is the active program.
    pub(crate) fn check(&self, slot_program: ProgramId) -> Result<(), BindingError> {
        if slot_program == self.program {
            Ok(())
        } else {
            Err(BindingError::InactiveBinding {
                slot_program,
                active_program: self.program,
            })
        }
    }
}
