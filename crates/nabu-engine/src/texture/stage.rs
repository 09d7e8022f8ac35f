use crate::device::{Device, PixelFormat, TextureId, required_len};
use crate::error::TextureError;
use crate::render::{ActiveProgram, RenderContext};

/// Byte alignment of the starts of host pixel rows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum RowAlignment {
    One,
    Two,
    #[default]
    Four,
    Eight,
}

impl RowAlignment {
    pub const fn bytes(self) -> u32 {
        match self {
            RowAlignment::One => 1,
            RowAlignment::Two => 2,
            RowAlignment::Four => 4,
            RowAlignment::Eight => 8,
        }
    }

    pub const fn from_bytes(bytes: u32) -> Option<Self> {
        match bytes {
            1 => Some(RowAlignment::One),
            2 => Some(RowAlignment::Two),
            4 => Some(RowAlignment::Four),
            8 => Some(RowAlignment::Eight),
            _ => None,
        }
    }
}

/// One image upload.
#[derive(Debug, Copy, Clone)]
pub struct TextureUpload<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: &'a [u8],
    pub alignment: RowAlignment,
}

impl<'a> TextureUpload<'a> {
    /// Rows at the default alignment.
    pub fn new(width: u32, height: u32, format: PixelFormat, pixels: &'a [u8]) -> Self {
        Self {
            width,
            height,
            format,
            pixels,
            alignment: RowAlignment::default(),
        }
    }

    pub fn with_alignment(self, alignment: RowAlignment) -> Self {
        Self { alignment, ..self }
    }

    /// Checks the pixel buffer against the image size and row alignment.
    fn validate(&self) -> Result<(), TextureError> {
        if self.width == 0 || self.height == 0 {
            return Err(TextureError::EmptyImage {
                width: self.width,
                height: self.height,
            });
        }

        let bpp = self.format.bytes_per_pixel();
        let alignment = self.alignment.bytes();
        let row_bytes = self.width as usize * bpp as usize;
        let tight = row_bytes * self.height as usize;

        if self.height > 1 && self.pixels.len() == tight && row_bytes % alignment as usize != 0 {
            return Err(TextureError::UnalignedRows { row_bytes, alignment });
        }

        let expected = required_len(self.width, self.height, bpp, alignment);
        if self.pixels.len() < expected {
            return Err(TextureError::SizeMismatch {
                expected,
                actual: self.pixels.len(),
            });
        }
        if self.height > 1 && row_bytes % alignment as usize != 0 && self.pixels.len() != expected {
            // Could be tight rows with trailing bytes; the device reads padded rows.
            log::warn!(
                "{}x{} {:?} rows of {row_bytes} bytes are read at {alignment}-byte alignment; \
                 got {} bytes where padded rows take {expected}",
                self.width,
                self.height,
                self.format,
                self.pixels.len()
            );
        }
        Ok(())
    }
}

/// A device texture plus the size of its current image.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    image: Option<(u32, u32, PixelFormat)>,
}

impl Texture {
    /// Allocates an empty texture object.
    pub fn create<D: Device>(ctx: &mut RenderContext<D>) -> Self {
        let id = ctx.device_mut().create_texture();
        log::debug!("created {id}");
        Self { id, image: None }
    }

    /// Replaces the texture image.
    ///
    /// Tightly packed rows whose length is not a multiple of the alignment
    /// are rejected rather than uploaded skewed.
    pub fn upload<D: Device>(
        &mut self,
        ctx: &mut RenderContext<D>,
        upload: &TextureUpload<'_>,
    ) -> Result<(), TextureError> {
        if let Err(e) = upload.validate() {
            log::error!("{} upload rejected: {e}", self.id);
            return Err(e);
        }

        let unit = ctx.active_unit();
        ctx.bind_texture(unit, self.id);
        ctx.set_unpack_alignment(upload.alignment.bytes());
        ctx.device_mut()
            .tex_image_2d(upload.width, upload.height, upload.format, upload.pixels);

        self.image = Some((upload.width, upload.height, upload.format));
        log::debug!(
            "{}: uploaded {}x{} {:?}",
            self.id,
            upload.width,
            upload.height,
            upload.format
        );
        Ok(())
    }

    /// Binds the texture to sampler unit `unit`.
    pub fn bind<D: Device>(&self, ctx: &mut RenderContext<D>, unit: u32) {
        ctx.bind_texture(unit, self.id);
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    /// `(width, height)` of the uploaded image.
    pub fn size(&self) -> Result<(u32, u32), TextureError> {
        self.image
            .map(|(w, h, _)| (w, h))
            .ok_or(TextureError::NotUploaded)
    }

    pub fn format(&self) -> Option<PixelFormat> {
        self.image.map(|(_, _, format)| format)
    }

    pub fn release<D: Device>(self, ctx: &mut RenderContext<D>) {
        ctx.device_mut().delete_texture(self.id);
    }
}

impl<D: Device> ActiveProgram<'_, D> {
    /// [`Texture::bind`] while a program is active.
    pub fn bind_texture(&mut self, texture: &Texture, unit: u32) {
        texture.bind(self.ctx(), unit);
    }
}
