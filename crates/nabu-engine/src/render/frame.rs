use crate::device::{ClearMask, Device, Topology};
use crate::error::Error;
use crate::filter::{ConvolutionFilter, Kernel};
use crate::geometry::GeometryBuffer;
use crate::program::Program;
use crate::texture::Texture;
use crate::uniform::UniformSlot;

use super::ctx::{ActiveProgram, RenderContext};
use super::surface::Surface;

/// Primitive range submitted by one draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DrawSpec {
    pub topology: Topology,
    pub first: u32,
    pub count: u32,
}

impl DrawSpec {
    pub const fn new(topology: Topology, first: u32, count: u32) -> Self {
        Self { topology, first, count }
    }

    pub const fn triangle_fan(count: u32) -> Self {
        Self::new(Topology::TriangleFan, 0, count)
    }

    pub const fn triangles(count: u32) -> Self {
        Self::new(Topology::Triangles, 0, count)
    }
}

/// A value pushed into the active program before drawing.
#[derive(Debug, Clone, Copy)]
pub enum UniformBinding<'a> {
    Float(&'a UniformSlot, f32),
    Int(&'a UniformSlot, i32),
    Vec2(&'a UniformSlot, [f32; 2]),
    FloatArray(&'a UniformSlot, &'a [f32]),
    TextureUnit(&'a UniformSlot, u32),
    /// Binds `texture` to `unit` and points `slot` at that unit.
    Texture {
        slot: &'a UniformSlot,
        texture: &'a Texture,
        unit: u32,
    },
    Convolution {
        filter: &'a ConvolutionFilter,
        kernel: &'a Kernel,
        texture: &'a Texture,
    },
}

impl UniformBinding<'_> {
    fn push<D: Device>(&self, active: &mut ActiveProgram<'_, D>) -> Result<(), Error> {
        match *self {
            UniformBinding::Float(slot, v) => active.set_float(slot, v)?,
            UniformBinding::Int(slot, v) => active.set_int(slot, v)?,
            UniformBinding::Vec2(slot, v) => active.set_vec2(slot, v)?,
            UniformBinding::FloatArray(slot, v) => active.set_float_array(slot, v)?,
            UniformBinding::TextureUnit(slot, unit) => active.set_texture_unit(slot, unit)?,
            UniformBinding::Texture { slot, texture, unit } => {
                texture.size()?;
                active.bind_texture(texture, unit);
                active.set_texture_unit(slot, unit)?;
            }
            UniformBinding::Convolution {
                filter,
                kernel,
                texture,
            } => filter.apply(active, kernel, texture)?,
        }
        Ok(())
    }
}

/// Clear, bind and draw in one pass over a [`Surface`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRenderer {
    pub clear_color: [f32; 4],
    /// Also clear depth. There is no depth attachment to test against, so
    /// this only matters for devices that keep one.
    pub clear_depth: bool,
}

impl Default for FrameRenderer {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 0.0],
            clear_depth: false,
        }
    }
}

impl FrameRenderer {
    /// Renders one frame.
    ///
    /// 1. resize the surface and acquire its image (full-extent viewport)
    /// 2. clear
    /// 3. activate `program`, bind every buffer, push every uniform
    /// 4. draw and present
    ///
    /// A surface that cannot provide an image fails with
    /// [`Error::SurfaceUnavailable`] before any device command. A binding
    /// error aborts the draw; the cleared frame is still presented.
    pub fn render_once<D: Device, S: Surface<D>>(
        &self,
        surface: &mut S,
        ctx: &mut RenderContext<D>,
        program: &Program,
        geometry: &[&GeometryBuffer],
        uniforms: &[UniformBinding<'_>],
        draw: DrawSpec,
    ) -> Result<(), Error> {
        let (width, height) = surface.resize_to_display_size();
        surface.begin(ctx.device_mut())?;

        let device = ctx.device_mut();
        device.viewport(0, 0, width, height);
        device.clear_color(self.clear_color);
        device.clear(if self.clear_depth {
            ClearMask::COLOR_AND_DEPTH
        } else {
            ClearMask::COLOR
        });

        let drawn = Self::draw(ctx, program, geometry, uniforms, draw);
        if let Err(e) = &drawn {
            log::error!("draw aborted: {e}");
        }

        surface.present(ctx.device_mut());
        drawn
    }

    fn draw<D: Device>(
        ctx: &mut RenderContext<D>,
        program: &Program,
        geometry: &[&GeometryBuffer],
        uniforms: &[UniformBinding<'_>],
        draw: DrawSpec,
    ) -> Result<(), Error> {
        let mut active = ctx.use_program(program);
        for buffer in geometry {
            buffer.bind_for_draw(&mut active)?;
        }
        for binding in uniforms {
            binding.push(&mut active)?;
        }

        if draw.count == 0 {
            log::debug!("empty draw skipped");
            return Ok(());
        }
        active.device().draw_arrays(draw.topology, draw.first, draw.count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCommand, HeadlessDevice};
    use crate::program::build_program;
    use crate::render::HeadlessSurface;
    use crate::test_shaders::{QUAD_VS, RESOLUTION_FS, SOLID_FS};

    const QUAD: [f32; 8] = [0.0, 0.0, 0.0, 0.5, 0.7, 0.5, 0.7, 0.0];

    #[test]
    fn quad_is_cleared_then_drawn_as_one_fan() {
        let mut ctx = RenderContext::new(HeadlessDevice::new());
        let program = build_program(&mut ctx, QUAD_VS, SOLID_FS).unwrap();
        let quad = GeometryBuffer::upload(&mut ctx, &program, "a_position", &QUAD, 2).unwrap();
        let mut surface = HeadlessSurface::new(640, 480);
        ctx.device_mut().clear_commands();

        FrameRenderer::default()
            .render_once(&mut surface, &mut ctx, &program, &[&quad], &[], DrawSpec::triangle_fan(4))
            .unwrap();

        let commands = ctx.device().commands();
        assert_eq!(
            &commands[..3],
            &[
                DeviceCommand::Viewport { x: 0, y: 0, width: 640, height: 480 },
                DeviceCommand::ClearColor([0.0; 4]),
                DeviceCommand::Clear(ClearMask::COLOR),
            ]
        );
        assert_eq!(ctx.device().draws(), vec![(Topology::TriangleFan, 0, 4)]);
        assert_eq!(surface.presented_frames(), 1);
    }

    #[test]
    fn viewport_follows_display_size() {
        let mut ctx = RenderContext::new(HeadlessDevice::new());
        let program = build_program(&mut ctx, QUAD_VS, SOLID_FS).unwrap();
        let mut surface = HeadlessSurface::new(300, 150).with_display_size(800, 600);

        FrameRenderer::default()
            .render_once(&mut surface, &mut ctx, &program, &[], &[], DrawSpec::triangles(0))
            .unwrap();

        assert!(ctx.device().commands().contains(&DeviceCommand::Viewport {
            x: 0,
            y: 0,
            width: 800,
            height: 600
        }));
        assert!(ctx.device().draws().is_empty());
    }

    #[test]
    fn unavailable_surface_fails_before_any_command() {
        let mut ctx = RenderContext::new(HeadlessDevice::new());
        let program = build_program(&mut ctx, QUAD_VS, SOLID_FS).unwrap();
        ctx.device_mut().clear_commands();
        let mut surface = HeadlessSurface::unavailable("no canvas");

        let err = FrameRenderer::default()
            .render_once(&mut surface, &mut ctx, &program, &[], &[], DrawSpec::triangle_fan(4))
            .unwrap_err();
        assert_eq!(err, Error::SurfaceUnavailable("no canvas".into()));
        assert!(ctx.device().commands().is_empty());
    }

    #[test]
    fn binding_error_skips_the_draw_but_presents() {
        let mut ctx = RenderContext::new(HeadlessDevice::new());
        let program = build_program(&mut ctx, QUAD_VS, RESOLUTION_FS).unwrap();
        let r = UniformSlot::resolve(&ctx, &program, "r");
        let mut surface = HeadlessSurface::new(64, 64);

        let err = FrameRenderer::default()
            .render_once(
                &mut surface,
                &mut ctx,
                &program,
                &[],
                &[UniformBinding::Float(&r, 1.0)],
                DrawSpec::triangle_fan(4),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Binding(_)));
        assert!(ctx.device().draws().is_empty());
        assert_eq!(surface.presented_frames(), 1);
    }

    #[test]
    fn depth_clear_is_opt_in() {
        let mut ctx = RenderContext::new(HeadlessDevice::new());
        let program = build_program(&mut ctx, QUAD_VS, SOLID_FS).unwrap();
        let renderer = FrameRenderer {
            clear_color: [0.1, 0.2, 0.3, 1.0],
            clear_depth: true,
        };

        renderer
            .render_once(
                &mut HeadlessSurface::new(8, 8),
                &mut ctx,
                &program,
                &[],
                &[],
                DrawSpec::triangles(0),
            )
            .unwrap();
        assert!(ctx.device().commands().contains(&DeviceCommand::Clear(ClearMask::COLOR_AND_DEPTH)));
        assert!(ctx.device().commands().contains(&DeviceCommand::ClearColor([0.1, 0.2, 0.3, 1.0])));
    }
}
