use winit::window::Window;

use crate::device::{Gpu, GpuFrame, SurfaceErrorAction, WgpuDevice};
use crate::error::Error;
use crate::geometry::GeometryBuffer;
use crate::program::Program;
use crate::render::{DrawSpec, FrameRenderer, RenderContext, Surface, UniformBinding};

use super::app::AppControl;

/// [`Surface`] backed by a window's swapchain.
pub struct WindowSurface<'a, 'w> {
    window: &'a Window,
    gpu: &'a mut Gpu<'w>,
    frame: Option<GpuFrame>,
    fatal: bool,
}

impl<'a, 'w> WindowSurface<'a, 'w> {
    pub fn new(window: &'a Window, gpu: &'a mut Gpu<'w>) -> Self {
        Self {
            window,
            gpu,
            frame: None,
            fatal: false,
        }
    }

    /// Whether the last failed acquisition cannot be recovered from.
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }
}

impl Surface<WgpuDevice> for WindowSurface<'_, '_> {
    fn resize_to_display_size(&mut self) -> (u32, u32) {
        let display = self.window.inner_size();
        if display != self.gpu.size() {
            self.gpu.resize(display);
        }
        self.size()
    }

    fn size(&self) -> (u32, u32) {
        let size = self.gpu.size();
        (size.width, size.height)
    }

    fn begin(&mut self, device: &mut WgpuDevice) -> Result<(), Error> {
        let (width, height) = self.size();
        if width == 0 || height == 0 {
            return Err(Error::SurfaceUnavailable("window is minimized".to_owned()));
        }

        let frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                let reason = err.to_string();
                let action = self.gpu.handle_surface_error(err);
                self.fatal = action == SurfaceErrorAction::Fatal;
                log::warn!("surface acquisition failed ({reason}), {action:?}");
                return Err(Error::SurfaceUnavailable(reason));
            }
        };

        device.set_target(frame.view.clone(), width, height);
        self.frame = Some(frame);
        Ok(())
    }

    fn present(&mut self, device: &mut WgpuDevice) {
        device.take_target();
        if let Some(frame) = self.frame.take() {
            self.window.pre_present_notify();
            self.gpu.present(frame);
        }
    }
}

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a mut Gpu<'w>,
    pub render: &'a mut RenderContext<WgpuDevice>,
}

impl FrameCtx<'_, '_> {
    /// Renders one frame into the window with `renderer`.
    ///
    /// Surface hiccups skip the frame; only an unrecoverable surface error
    /// asks the runtime to exit.
    pub fn render(
        &mut self,
        renderer: &FrameRenderer,
        program: &Program,
        geometry: &[&GeometryBuffer],
        uniforms: &[UniformBinding<'_>],
        draw: DrawSpec,
    ) -> AppControl {
        let mut surface = WindowSurface::new(self.window, self.gpu);
        match renderer.render_once(&mut surface, self.render, program, geometry, uniforms, draw) {
            Ok(()) => AppControl::Continue,
            Err(Error::SurfaceUnavailable(_)) if surface.is_fatal() => AppControl::Exit,
            Err(Error::SurfaceUnavailable(reason)) => {
                log::debug!("frame skipped: {reason}");
                AppControl::Continue
            }
            Err(e) => {
                log::error!("frame failed: {e}");
                AppControl::Continue
            }
        }
    }
}
