//! Runs one of the rendering exercises in a window.
//!
//! Usage: `nabu-studio [exercise] [kernel]`
//!
//! `exercise` is one of `quad`, `resolution`, `texcoords`, `convolution`
//! (default). `kernel` names a convolution preset (default `edge-detect`).

mod exercise;

use anyhow::{Context, Result};

use nabu_engine::core::{App, AppControl, FrameCtx};
use nabu_engine::device::{GpuInit, WgpuDevice};
use nabu_engine::filter::Kernel;
use nabu_engine::logging::{init_logging, LoggingConfig};
use nabu_engine::render::{FrameRenderer, RenderContext};
use nabu_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use exercise::{Exercise, Scene};

struct Studio {
    exercise: Exercise,
    kernel: Kernel,
    renderer: FrameRenderer,
    scene: Option<Scene>,
}

impl App for Studio {
    fn on_ready(&mut self, ctx: &mut RenderContext<WgpuDevice>) -> Result<()> {
        self.scene = Some(self.exercise.build(ctx, self.kernel.clone())?);
        log::info!("{} exercise ready", self.exercise);
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(scene) = &self.scene else {
            return AppControl::Continue;
        };
        ctx.render(
            &self.renderer,
            scene.program(),
            &scene.geometry(),
            &scene.uniforms(),
            scene.draw(),
        )
    }
}

fn parse_args() -> Result<(Exercise, Kernel)> {
    let mut args = std::env::args().skip(1);

    let exercise = match args.next() {
        Some(name) => name.parse()?,
        None => Exercise::Convolution,
    };
    let kernel_name = args.next().unwrap_or_else(|| "edge-detect".to_owned());
    let kernel = Kernel::preset(&kernel_name).with_context(|| {
        format!(
            "unknown kernel `{kernel_name}` (expected one of {})",
            Kernel::PRESETS.join(", ")
        )
    })?;
    Ok((exercise, kernel))
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let (exercise, kernel) = parse_args()?;
    log::info!("running {exercise} with a {}x{} kernel", kernel.width(), kernel.height());

    let config = RuntimeConfig {
        title: format!("nabu studio: {exercise}"),
        initial_size: LogicalSize::new(512.0, 512.0),
        ..RuntimeConfig::default()
    };
    let studio = Studio {
        exercise,
        kernel,
        renderer: FrameRenderer::default(),
        scene: None,
    };

    Runtime::run(config, GpuInit::default(), studio)
}
