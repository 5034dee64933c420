//! In-memory backend.
//!
//! Buffers and textures live in plain vectors. Drawing is limited to the
//! pixel-level helpers below, which write into the color attachment of the
//! bound framebuffer, clipped to the current viewport.

use std::collections::HashMap;
use std::path::Path;

use super::{
    Backend, BufferData, BufferHandle, BufferTarget, BufferUsage, FramebufferHandle,
    TextureDescriptor, TextureFormat, TextureHandle, Viewport,
};
use crate::error::{Error, Result};

/// Contents of a buffer after its last upload.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredBuffer {
    Empty,
    Float32(Vec<f32>),
    Uint32(Vec<u32>),
}

#[derive(Debug)]
struct BufferSlot {
    target: BufferTarget,
    usage: BufferUsage,
    data: StoredBuffer,
}

#[derive(Debug)]
struct TextureSlot {
    descriptor: TextureDescriptor,
    texels: Vec<[f32; 4]>,
}

#[derive(Debug, Default)]
struct FramebufferSlot {
    color: Option<TextureHandle>,
}

/// CPU backend holding every resource in memory.
#[derive(Debug)]
pub struct SoftwareBackend {
    next_id: u32,
    buffers: HashMap<BufferHandle, BufferSlot>,
    textures: HashMap<TextureHandle, TextureSlot>,
    framebuffers: HashMap<FramebufferHandle, FramebufferSlot>,
    bound: Option<FramebufferHandle>,
    viewport: Viewport,
    render_formats: Vec<TextureFormat>,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    /// Creates a backend on which every texture format is renderable.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            bound: None,
            viewport: Viewport::default(),
            render_formats: vec![
                TextureFormat::Rgba8,
                TextureFormat::Rgba16F,
                TextureFormat::Rgba32F,
            ],
        }
    }

    /// Restricts which texture formats produce a complete framebuffer.
    pub fn with_render_formats(mut self, formats: &[TextureFormat]) -> Self {
        self.render_formats = formats.to_vec();
        self
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn bound_framebuffer(&self) -> Option<FramebufferHandle> {
        self.bound
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&StoredBuffer> {
        self.buffers.get(&handle).map(|b| &b.data)
    }

    pub fn buffer_target(&self, handle: BufferHandle) -> Option<BufferTarget> {
        self.buffers.get(&handle).map(|b| b.target)
    }

    pub fn buffer_usage(&self, handle: BufferHandle) -> Option<BufferUsage> {
        self.buffers.get(&handle).map(|b| b.usage)
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn texture_descriptor(&self, handle: TextureHandle) -> Option<&TextureDescriptor> {
        self.textures.get(&handle).map(|t| &t.descriptor)
    }

    pub fn texels(&self, handle: TextureHandle) -> Option<&[[f32; 4]]> {
        self.textures.get(&handle).map(|t| t.texels.as_slice())
    }

    /// Texel at `(x, y)` of a texture, or `None` if out of bounds.
    pub fn read_pixel(&self, texture: TextureHandle, x: u32, y: u32) -> Option<[f32; 4]> {
        let slot = self.textures.get(&texture)?;
        let d = &slot.descriptor;
        if x < d.width && y < d.height {
            Some(slot.texels[(y * d.width + x) as usize])
        } else {
            None
        }
    }

    fn render_target(&mut self) -> Result<&mut TextureSlot> {
        let fb = self
            .bound
            .ok_or_else(|| Error::Backend("no framebuffer bound".into()))?;
        let color = self
            .framebuffers
            .get(&fb)
            .and_then(|f| f.color)
            .ok_or_else(|| Error::Backend(format!("framebuffer {fb:?} has no color target")))?;
        self.textures
            .get_mut(&color)
            .ok_or_else(|| Error::Backend(format!("texture {color:?} was deleted")))
    }

    /// Fills the viewport area of the bound color target.
    pub fn clear(&mut self, color: [f32; 4]) -> Result<()> {
        let viewport = self.viewport;
        for y in 0..viewport.height as i32 {
            for x in 0..viewport.width as i32 {
                self.write_pixel(x, y, color)?;
            }
        }
        Ok(())
    }

    /// Writes a texel at viewport-relative `(x, y)` of the bound color target.
    ///
    /// Coordinates outside the viewport or the texture are silently ignored.
    pub fn write_pixel(&mut self, x: i32, y: i32, color: [f32; 4]) -> Result<()> {
        let viewport = self.viewport;
        if x < 0 || y < 0 || x >= viewport.width as i32 || y >= viewport.height as i32 {
            return Ok(());
        }
        let target = self.render_target()?;
        let (tx, ty) = (viewport.x + x, viewport.y + y);
        let d = target.descriptor;
        if tx >= 0 && ty >= 0 && (tx as u32) < d.width && (ty as u32) < d.height {
            target.texels[(ty as u32 * d.width + tx as u32) as usize] = quantize(d.format, color);
        }
        Ok(())
    }

    /// Writes a texture to disk as an 8-bit RGBA image.
    pub fn save_png<P: AsRef<Path>>(&self, texture: TextureHandle, path: P) -> Result<()> {
        let slot = self
            .textures
            .get(&texture)
            .ok_or_else(|| Error::Backend(format!("unknown texture {texture:?}")))?;
        let d = slot.descriptor;
        let image = image::RgbaImage::from_fn(d.width, d.height, |x, y| {
            let texel = slot.texels[(y * d.width + x) as usize];
            image::Rgba(texel.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
        });
        image.save(path)?;
        Ok(())
    }
}

/// Rounds a color to the precision of `format`.
fn quantize(format: TextureFormat, color: [f32; 4]) -> [f32; 4] {
    match format {
        TextureFormat::Rgba8 => color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() / 255.0),
        TextureFormat::Rgba16F | TextureFormat::Rgba32F => color,
    }
}

impl Backend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "Software"
    }

    fn create_buffer(&mut self, target: BufferTarget) -> Result<BufferHandle> {
        let handle = BufferHandle(self.next_id());
        log::trace!("SoftwareBackend: creating {target:?} buffer {handle:?}");
        self.buffers.insert(
            handle,
            BufferSlot {
                target,
                usage: BufferUsage::default(),
                data: StoredBuffer::Empty,
            },
        );
        Ok(handle)
    }

    fn upload_buffer(
        &mut self,
        handle: BufferHandle,
        data: BufferData<'_>,
        usage: BufferUsage,
    ) -> Result<()> {
        let slot = self
            .buffers
            .get_mut(&handle)
            .ok_or_else(|| Error::Backend(format!("unknown buffer {handle:?}")))?;
        slot.usage = usage;
        slot.data = match data {
            BufferData::Float32(d) => StoredBuffer::Float32(d.to_vec()),
            BufferData::Uint32(d) => StoredBuffer::Uint32(d.to_vec()),
        };
        Ok(())
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Result<TextureHandle> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(Error::Backend(format!(
                "texture dimensions must be non-zero, got {}x{}",
                descriptor.width, descriptor.height
            )));
        }
        let handle = TextureHandle(self.next_id());
        log::trace!(
            "SoftwareBackend: creating texture {handle:?} ({}x{} {:?})",
            descriptor.width,
            descriptor.height,
            descriptor.format
        );
        self.textures.insert(
            handle,
            TextureSlot {
                descriptor: *descriptor,
                texels: vec![[0.0; 4]; descriptor.texel_count()],
            },
        );
        Ok(handle)
    }

    fn upload_texture(&mut self, handle: TextureHandle, texels: &[[f32; 4]]) -> Result<()> {
        let slot = self
            .textures
            .get_mut(&handle)
            .ok_or_else(|| Error::Backend(format!("unknown texture {handle:?}")))?;
        if texels.len() != slot.descriptor.texel_count() {
            return Err(Error::Backend(format!(
                "expected {} texels, got {}",
                slot.descriptor.texel_count(),
                texels.len()
            )));
        }
        let format = slot.descriptor.format;
        slot.texels = texels.iter().map(|&t| quantize(format, t)).collect();
        Ok(())
    }

    fn delete_texture(&mut self, handle: TextureHandle) {
        self.textures.remove(&handle);
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferHandle> {
        let handle = FramebufferHandle(self.next_id());
        log::trace!("SoftwareBackend: creating framebuffer {handle:?}");
        self.framebuffers.insert(handle, FramebufferSlot::default());
        Ok(handle)
    }

    fn delete_framebuffer(&mut self, handle: FramebufferHandle) {
        self.framebuffers.remove(&handle);
        if self.bound == Some(handle) {
            self.bound = None;
        }
    }

    fn attach_color_target(
        &mut self,
        framebuffer: FramebufferHandle,
        texture: TextureHandle,
    ) -> Result<()> {
        if !self.textures.contains_key(&texture) {
            return Err(Error::Backend(format!("unknown texture {texture:?}")));
        }
        let slot = self
            .framebuffers
            .get_mut(&framebuffer)
            .ok_or_else(|| Error::Backend(format!("unknown framebuffer {framebuffer:?}")))?;
        slot.color = Some(texture);
        Ok(())
    }

    fn check_complete(&self, framebuffer: FramebufferHandle) -> bool {
        self.framebuffers
            .get(&framebuffer)
            .and_then(|f| f.color)
            .and_then(|color| self.textures.get(&color))
            .is_some_and(|t| self.render_formats.contains(&t.descriptor.format))
    }

    fn bind_framebuffer(
        &mut self,
        framebuffer: Option<FramebufferHandle>,
    ) -> Option<FramebufferHandle> {
        std::mem::replace(&mut self.bound, framebuffer)
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Viewport {
        std::mem::replace(&mut self.viewport, viewport)
    }
}
