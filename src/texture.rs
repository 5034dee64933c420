use std::path::Path;

use crate::backend::{Backend, FilterMode, TextureDescriptor, TextureFormat, TextureHandle};
use crate::error::{Error, Result};

/// CPU-side RGBA image with components in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    data: Vec<[f32; 4]>, // Row-major, top row first.
    width: u32,
    height: u32,
}

impl Texture {
    /// Decodes an image file (PNG, JPG, etc.).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        Self::from_rgba8(width, height, img.as_raw())
    }

    /// Builds a texture from tightly packed 8-bit RGBA bytes.
    ///
    /// # Errors
    /// [`Error::InvalidGeometry`] if `bytes` does not hold exactly
    /// `width * height` texels.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if bytes.len() != expected || expected == 0 {
            return Err(Error::InvalidGeometry(format!(
                "{width}x{height} texture needs {expected} bytes, got {}",
                bytes.len()
            )));
        }
        let data = bytes
            .chunks_exact(4)
            .map(|p| [p[0], p[1], p[2], p[3]].map(|c| c as f32 / 255.0))
            .collect();
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Sample the texture at UV coordinates using nearest-neighbor filtering.
    ///
    /// UVs wrap (repeat) outside `[0, 1]`. V is flipped because texture
    /// coordinates have a bottom-left origin while rows are stored top first.
    #[inline]
    pub fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let u = u.rem_euclid(1.0);
        let v = (1.0 - v).rem_euclid(1.0);

        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);

        self.data[(y * self.width + x) as usize]
    }

    /// Creates a backend texture with these texels.
    pub fn upload<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        format: TextureFormat,
        filter: FilterMode,
    ) -> Result<TextureHandle> {
        let descriptor = TextureDescriptor::new(self.width, self.height, format).with_filter(filter);
        let handle = backend.create_texture(&descriptor)?;
        backend.upload_texture(handle, &self.data)?;
        log::debug!(
            "uploaded {}x{} texture as {format:?}",
            self.width,
            self.height
        );
        Ok(handle)
    }

    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    pub fn texels(&self) -> &[[f32; 4]] {
        &self.data
    }
}
