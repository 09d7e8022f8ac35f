/// A single acquired surface texture.
///
/// Short-lived: holding the surface texture blocks acquisition of the next
/// one. Hand it back with [`Gpu::present`](super::Gpu::present).
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}
