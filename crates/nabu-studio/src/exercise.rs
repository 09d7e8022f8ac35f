use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use rand::Rng;

use nabu_engine::device::{Device, PixelFormat};
use nabu_engine::filter::{ConvolutionFilter, ConvolutionUniforms, Kernel};
use nabu_engine::geometry::GeometryBuffer;
use nabu_engine::program::{build_program, Program};
use nabu_engine::render::{DrawSpec, RenderContext, UniformBinding};
use nabu_engine::texture::{Texture, TextureUpload};
use nabu_engine::uniform::UniformSlot;

const POSITION_VS: &str = include_str!("../shaders/position.vert.wgsl");
const SOLID_FS: &str = include_str!("../shaders/solid.frag.wgsl");
const RESOLUTION_FS: &str = include_str!("../shaders/resolution.frag.wgsl");
const TEXCOORDS_VS: &str = include_str!("../shaders/texcoords.vert.wgsl");
const TEXCOORDS_FS: &str = include_str!("../shaders/texcoords.frag.wgsl");
const CONVOLUTION_FS: &str = include_str!("../shaders/convolution.frag.wgsl");

/// Value of the `r` uniform: the drawn square, in pixels.
pub const RESOLUTION: [f32; 2] = [512.0, 512.0];

/// Side of the generated luminance texture.
const TEXTURE_SIZE: u32 = 100;

const SMALL_QUAD: [f32; 8] = [0.0, 0.0, 0.0, 0.5, 0.7, 0.5, 0.7, 0.0];
const FULL_QUAD_FAN: [f32; 8] = [-1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0, -1.0];
const FAN_TEXCOORDS: [f32; 8] = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0];
const FULL_QUAD_TRIANGLES: [f32; 12] = [
    -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, //
    -1.0, -1.0, 1.0, 1.0, 1.0, -1.0,
];
const TRIANGLE_TEXCOORDS: [f32; 12] = [
    0.0, 0.0, 0.0, 1.0, 1.0, 1.0, //
    0.0, 0.0, 1.0, 1.0, 1.0, 0.0,
];

/// One configuration of the rendering pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exercise {
    /// A small fan quad, solid color.
    Quad,
    /// Full-window quad shaded by pixel position over `r`.
    Resolution,
    /// Full-window quad shaded by its texture coordinates.
    Texcoords,
    /// Random luminance texture seen through a convolution kernel.
    Convolution,
}

impl Exercise {
    pub const ALL: [Exercise; 4] = [
        Exercise::Quad,
        Exercise::Resolution,
        Exercise::Texcoords,
        Exercise::Convolution,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Exercise::Quad => "quad",
            Exercise::Resolution => "resolution",
            Exercise::Texcoords => "texcoords",
            Exercise::Convolution => "convolution",
        }
    }

    fn sources(self) -> (&'static str, &'static str) {
        match self {
            Exercise::Quad => (POSITION_VS, SOLID_FS),
            Exercise::Resolution => (POSITION_VS, RESOLUTION_FS),
            Exercise::Texcoords => (TEXCOORDS_VS, TEXCOORDS_FS),
            Exercise::Convolution => (TEXCOORDS_VS, CONVOLUTION_FS),
        }
    }

    /// Builds every device resource the exercise draws with.
    pub fn build<D: Device>(self, ctx: &mut RenderContext<D>, kernel: Kernel) -> Result<Scene> {
        let (vs, fs) = self.sources();
        let program = build_program(ctx, vs, fs)
            .with_context(|| format!("building the {self} program"))?;

        let mut scene = Scene {
            geometry: Vec::new(),
            resolution: None,
            convolution: None,
            draw: DrawSpec::triangle_fan(4),
            program,
        };

        match self {
            Exercise::Quad => {
                scene.push_geometry(ctx, "a_position", &SMALL_QUAD)?;
            }
            Exercise::Resolution => {
                scene.push_geometry(ctx, "a_position", &FULL_QUAD_FAN)?;
                scene.resolve_resolution(ctx);
            }
            Exercise::Texcoords => {
                scene.push_geometry(ctx, "a_position", &FULL_QUAD_FAN)?;
                scene.push_geometry(ctx, "a_texcoords", &FAN_TEXCOORDS)?;
                scene.resolve_resolution(ctx);
            }
            Exercise::Convolution => {
                scene.push_geometry(ctx, "a_position", &FULL_QUAD_TRIANGLES)?;
                scene.push_geometry(ctx, "a_texcoords", &TRIANGLE_TEXCOORDS)?;
                scene.resolve_resolution(ctx);
                scene.convolution = Some(ConvolutionStage::new(ctx, &scene.program, kernel)?);
                scene.draw = DrawSpec::triangles(6);
            }
        }
        Ok(scene)
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Exercise {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Exercise::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .with_context(|| {
                let names: Vec<_> = Exercise::ALL.iter().map(|e| e.name()).collect();
                format!("unknown exercise `{s}` (expected one of {})", names.join(", "))
            })
    }
}

struct ConvolutionStage {
    texture: Texture,
    sampler: UniformSlot,
    filter: ConvolutionFilter,
    kernel: Kernel,
}

impl ConvolutionStage {
    fn new<D: Device>(ctx: &mut RenderContext<D>, program: &Program, kernel: Kernel) -> Result<Self> {
        let mut texture = Texture::create(ctx);
        let pixels = random_luminance(TEXTURE_SIZE, TEXTURE_SIZE);
        texture
            .upload(
                ctx,
                &TextureUpload::new(TEXTURE_SIZE, TEXTURE_SIZE, PixelFormat::Luminance, &pixels),
            )
            .context("uploading the source texture")?;

        Ok(Self {
            sampler: UniformSlot::resolve(ctx, program, "u_texture"),
            filter: ConvolutionFilter::resolve(ctx, program, &ConvolutionUniforms::default()),
            texture,
            kernel,
        })
    }
}

/// Everything one exercise draws with.
pub struct Scene {
    program: Program,
    geometry: Vec<GeometryBuffer>,
    resolution: Option<UniformSlot>,
    convolution: Option<ConvolutionStage>,
    draw: DrawSpec,
}

impl Scene {
    fn push_geometry<D: Device>(
        &mut self,
        ctx: &mut RenderContext<D>,
        attribute: &str,
        components: &[f32],
    ) -> Result<()> {
        let buffer = GeometryBuffer::upload(ctx, &self.program, attribute, components, 2)
            .with_context(|| format!("uploading `{attribute}`"))?;
        self.geometry.push(buffer);
        Ok(())
    }

    fn resolve_resolution<D: Device>(&mut self, ctx: &RenderContext<D>) {
        self.resolution = Some(UniformSlot::resolve(ctx, &self.program, "r"));
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn geometry(&self) -> Vec<&GeometryBuffer> {
        self.geometry.iter().collect()
    }

    pub fn uniforms(&self) -> Vec<UniformBinding<'_>> {
        let mut uniforms = Vec::new();
        if let Some(r) = &self.resolution {
            uniforms.push(UniformBinding::Vec2(r, RESOLUTION));
        }
        if let Some(stage) = &self.convolution {
            uniforms.push(UniformBinding::Texture {
                slot: &stage.sampler,
                texture: &stage.texture,
                unit: 0,
            });
            uniforms.push(UniformBinding::Convolution {
                filter: &stage.filter,
                kernel: &stage.kernel,
                texture: &stage.texture,
            });
        }
        uniforms
    }

    pub fn draw(&self) -> DrawSpec {
        self.draw
    }
}

/// A `width` x `height` matrix of uniformly random luminance bytes.
fn random_luminance(width: u32, height: u32) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..width * height).map(|_| rng.gen_range(0..=u8::MAX)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nabu_engine::device::{HeadlessDevice, Topology, UniformValue};
    use nabu_engine::render::{FrameRenderer, HeadlessSurface};

    fn render(exercise: Exercise, kernel: Kernel) -> RenderContext<HeadlessDevice> {
        let mut ctx = RenderContext::new(HeadlessDevice::new());
        let scene = exercise.build(&mut ctx, kernel).unwrap();
        FrameRenderer::default()
            .render_once(
                &mut HeadlessSurface::new(512, 512),
                &mut ctx,
                scene.program(),
                &scene.geometry(),
                &scene.uniforms(),
                scene.draw(),
            )
            .unwrap();
        ctx
    }

    #[test]
    fn names_parse_back() {
        for exercise in Exercise::ALL {
            assert_eq!(exercise.name().parse::<Exercise>().unwrap(), exercise);
        }
        assert!("triangle".parse::<Exercise>().is_err());
    }

    #[test]
    fn every_exercise_draws_once() {
        for exercise in Exercise::ALL {
            let ctx = render(exercise, Kernel::identity());
            assert_eq!(ctx.device().draws().len(), 1, "{exercise}");
        }
    }

    #[test]
    fn quad_is_a_fan_of_four() {
        let ctx = render(Exercise::Quad, Kernel::identity());
        assert_eq!(ctx.device().draws(), vec![(Topology::TriangleFan, 0, 4)]);
    }

    #[test]
    fn convolution_draws_six_vertices_with_its_uniforms() {
        let ctx = render(Exercise::Convolution, Kernel::box_blur());
        let device = ctx.device();
        assert_eq!(device.draws(), vec![(Topology::Triangles, 0, 6)]);

        let program = device.current_program().unwrap();
        assert_eq!(
            device.uniform_value(program, "u_kernelWeight"),
            Some(UniformValue::Float(9.0))
        );
        assert_eq!(
            device.uniform_value(program, "u_textureSize"),
            Some(UniformValue::Vec2([100.0, 100.0]))
        );
        assert_eq!(device.uniform_value(program, "r"), Some(UniformValue::Vec2(RESOLUTION)));
    }

    #[test]
    fn random_texture_has_one_byte_per_pixel() {
        assert_eq!(random_luminance(100, 100).len(), 10_000);
    }
}
