//! Image convolution through texture sampling.
//!
//! The fragment stage samples a texture around each texel, multiplies by a
//! kernel and divides by the kernel weight. This module owns the host side
//! of that protocol: kernels, the weight, and the three uniforms carrying them.

mod convolution;
mod kernel;

pub use convolution::{ConvolutionFilter, ConvolutionUniforms};
pub use kernel::{compute_weight, Kernel};
