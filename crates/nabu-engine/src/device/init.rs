/// Window surface choices made when the GPU layer starts.
///
/// Everything else (adapter, limits, latency) is fixed: the pipeline needs
/// no optional wgpu features and draws one small frame at a time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GpuInit {
    /// Pick an sRGB surface format when one exists.
    ///
    /// Off by default: shader outputs are written to the surface unconverted,
    /// the way a plain GL default framebuffer stores them.
    pub prefer_srgb: bool,

    /// Present on vertical blank. Without it the lowest-latency mode the
    /// surface supports is used.
    pub vsync: bool,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            vsync: true,
        }
    }
}
