use crate::device::Device;
use crate::error::Error;

/// Display surface a frame is rendered into.
pub trait Surface<D: Device> {
    /// Matches the backing store to the surface's display size and returns
    /// the resulting `(width, height)` in pixels.
    fn resize_to_display_size(&mut self) -> (u32, u32);

    fn size(&self) -> (u32, u32);

    /// Acquires the backing image and directs `device` at it. Must not issue
    /// device commands when it fails.
    fn begin(&mut self, device: &mut D) -> Result<(), Error>;

    /// Presents the image acquired by [`begin`](Surface::begin).
    fn present(&mut self, device: &mut D);
}

/// Fixed-size surface with no backing image. Counts presented frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessSurface {
    size: (u32, u32),
    display_size: (u32, u32),
    unavailable: Option<String>,
    in_frame: bool,
    presented: u32,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            display_size: (width, height),
            unavailable: None,
            in_frame: false,
            presented: 0,
        }
    }

    /// A surface whose display size differs from its current backing size.
    pub fn with_display_size(mut self, width: u32, height: u32) -> Self {
        self.display_size = (width, height);
        self
    }

    /// A surface that can never provide a frame.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::new(0, 0)
        }
    }

    pub fn presented_frames(&self) -> u32 {
        self.presented
    }
}

impl<D: Device> Surface<D> for HeadlessSurface {
    fn resize_to_display_size(&mut self) -> (u32, u32) {
        self.size = self.display_size;
        self.size
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn begin(&mut self, _device: &mut D) -> Result<(), Error> {
        if let Some(reason) = &self.unavailable {
            return Err(Error::SurfaceUnavailable(reason.clone()));
        }
        self.in_frame = true;
        Ok(())
    }

    fn present(&mut self, _device: &mut D) {
        if std::mem::take(&mut self.in_frame) {
            self.presented += 1;
        }
    }
}
