use crate::device::Device;
use crate::error::{Error, KernelError};
use crate::program::Program;
use crate::render::{ActiveProgram, RenderContext};
use crate::texture::Texture;
use crate::uniform::UniformSlot;

use super::kernel::{compute_weight, Kernel};

/// Names of the uniforms a convolution shader declares, and how many
/// kernel taps it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvolutionUniforms {
    /// Float array, row-major kernel weights.
    pub kernel: String,
    /// Float, the normalization weight.
    pub weight: String,
    /// Vec2, the sampled texture's size in texels.
    pub texture_size: String,
    pub taps: usize,
}

impl Default for ConvolutionUniforms {
    fn default() -> Self {
        Self {
            kernel: "u_kernel".to_owned(),
            weight: "u_kernelWeight".to_owned(),
            texture_size: "u_textureSize".to_owned(),
            taps: 9,
        }
    }
}

/// The three convolution uniforms resolved on one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvolutionFilter {
    kernel: UniformSlot,
    weight: UniformSlot,
    texture_size: UniformSlot,
    taps: usize,
}

impl ConvolutionFilter {
    pub fn resolve<D: Device>(
        ctx: &RenderContext<D>,
        program: &Program,
        names: &ConvolutionUniforms,
    ) -> Self {
        Self {
            kernel: UniformSlot::resolve(ctx, program, &names.kernel),
            weight: UniformSlot::resolve(ctx, program, &names.weight),
            texture_size: UniformSlot::resolve(ctx, program, &names.texture_size),
            taps: names.taps,
        }
    }

    /// Pushes the kernel, its weight and the texture size.
    ///
    /// The kernel must have exactly as many weights as the shader reads
    /// taps. The whole kernel array is written, zero past the last tap.
    pub fn apply<D: Device>(
        &self,
        active: &mut ActiveProgram<'_, D>,
        kernel: &Kernel,
        texture: &Texture,
    ) -> Result<(), Error> {
        if kernel.weights().len() != self.taps {
            return Err(KernelError::TapCountMismatch {
                expected: self.taps,
                found: kernel.weights().len(),
            }
            .into());
        }
        let (width, height) = texture.size()?;
        let weight = compute_weight(kernel);
        log::debug!(
            "convolution {}x{} kernel, weight {weight}, texture {width}x{height}",
            kernel.width(),
            kernel.height()
        );

        let capacity = self
            .kernel
            .shape()
            .and_then(|shape| shape.float_capacity())
            .map_or(0, |c| c as usize);
        let mut taps = kernel.weights().to_vec();
        taps.resize(taps.len().max(capacity), 0.0);
        active.set_float_array(&self.kernel, &taps)?;
        active.set_float(&self.weight, weight)?;
        active.set_vec2(&self.texture_size, [width as f32, height as f32])?;
        Ok(())
    }

    pub fn kernel_slot(&self) -> &UniformSlot {
        &self.kernel
    }

    pub fn weight_slot(&self) -> &UniformSlot {
        &self.weight
    }

    pub fn texture_size_slot(&self) -> &UniformSlot {
        &self.texture_size
    }

    pub fn taps(&self) -> usize {
        self.taps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{HeadlessDevice, PixelFormat, UniformValue};
    use crate::error::TextureError;
    use crate::program::build_program;
    use crate::test_shaders::{CONVOLUTION_FS, TEXCOORD_VS};
    use crate::texture::TextureUpload;

    /// `taps` followed by the zero lanes that fill out `array<vec4<f32>, 3>`.
    fn padded(taps: &[f32]) -> Vec<f32> {
        let mut lanes = taps.to_vec();
        lanes.resize(12, 0.0);
        lanes
    }

    fn setup() -> (RenderContext<HeadlessDevice>, Program, Texture) {
        let mut ctx = RenderContext::new(HeadlessDevice::new());
        let program = build_program(&mut ctx, TEXCOORD_VS, CONVOLUTION_FS).unwrap();
        let mut texture = Texture::create(&mut ctx);
        let pixels = vec![128u8; 100 * 100];
        texture
            .upload(&mut ctx, &TextureUpload::new(100, 100, PixelFormat::Luminance, &pixels))
            .unwrap();
        (ctx, program, texture)
    }

    #[test]
    fn pushes_kernel_weight_and_size() {
        let (mut ctx, program, texture) = setup();
        let filter = ConvolutionFilter::resolve(&ctx, &program, &ConvolutionUniforms::default());
        assert!(filter.kernel_slot().is_active());

        let mut active = ctx.use_program(&program);
        filter.apply(&mut active, &Kernel::box_blur(), &texture).unwrap();

        let device = ctx.device();
        assert_eq!(
            device.uniform_value(program.id(), "u_kernel"),
            Some(UniformValue::Floats(padded(&[1.0; 9])))
        );
        assert_eq!(
            device.uniform_value(program.id(), "u_kernelWeight"),
            Some(UniformValue::Float(9.0))
        );
        assert_eq!(
            device.uniform_value(program.id(), "u_textureSize"),
            Some(UniformValue::Vec2([100.0, 100.0]))
        );
    }

    #[test]
    fn edge_detect_is_applied_with_unit_weight() {
        let (mut ctx, program, texture) = setup();
        let filter = ConvolutionFilter::resolve(&ctx, &program, &ConvolutionUniforms::default());

        let mut active = ctx.use_program(&program);
        filter.apply(&mut active, &Kernel::edge_detect(), &texture).unwrap();

        assert_eq!(
            ctx.device().uniform_value(program.id(), "u_kernelWeight"),
            Some(UniformValue::Float(1.0))
        );
    }

    #[test]
    fn kernel_with_the_wrong_tap_count_leaves_the_previous_one() {
        let (mut ctx, program, texture) = setup();
        let filter = ConvolutionFilter::resolve(&ctx, &program, &ConvolutionUniforms::default());
        let small = Kernel::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();

        let mut active = ctx.use_program(&program);
        filter.apply(&mut active, &Kernel::box_blur(), &texture).unwrap();
        assert_eq!(
            filter.apply(&mut active, &small, &texture),
            Err(Error::Kernel(KernelError::TapCountMismatch { expected: 9, found: 4 }))
        );

        let device = ctx.device();
        assert_eq!(
            device.uniform_value(program.id(), "u_kernel"),
            Some(UniformValue::Floats(padded(&[1.0; 9])))
        );
        assert_eq!(
            device.uniform_value(program.id(), "u_kernelWeight"),
            Some(UniformValue::Float(9.0))
        );
    }

    #[test]
    fn lanes_past_the_last_tap_are_cleared() {
        let (mut ctx, program, texture) = setup();
        let filter = ConvolutionFilter::resolve(&ctx, &program, &ConvolutionUniforms::default());

        let mut active = ctx.use_program(&program);
        active.set_float_array(filter.kernel_slot(), &[7.0; 12]).unwrap();
        filter.apply(&mut active, &Kernel::identity(), &texture).unwrap();

        assert_eq!(
            ctx.device().uniform_value(program.id(), "u_kernel"),
            Some(UniformValue::Floats(padded(Kernel::identity().weights())))
        );
    }

    #[test]
    fn texture_without_image_is_rejected() {
        let (mut ctx, program, _) = setup();
        let empty = Texture::create(&mut ctx);
        let filter = ConvolutionFilter::resolve(&ctx, &program, &ConvolutionUniforms::default());

        let mut active = ctx.use_program(&program);
        assert_eq!(
            filter.apply(&mut active, &Kernel::identity(), &empty),
            Err(Error::Texture(TextureError::NotUploaded))
        );
    }

    #[test]
    fn custom_names_resolve_other_uniforms() {
        let (ctx, program, _) = setup();
        let names = ConvolutionUniforms {
            kernel: "u_kernel[0]".to_owned(),
            ..ConvolutionUniforms::default()
        };
        let filter = ConvolutionFilter::resolve(&ctx, &program, &names);
        assert_eq!(filter.kernel_slot().name(), "u_kernel[0]");
        assert!(filter.kernel_slot().is_active());
    }
}
