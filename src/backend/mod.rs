//! Graphics backend capability consumed by the geometry core.
//!
//! The core never talks to a concrete graphics API. Buffers, textures and
//! framebuffers are created and bound through the [`Backend`] trait and are
//! referred to by opaque handles. [`SoftwareBackend`] keeps everything in
//! memory and is what tests and headless tools use.

mod software;

pub use software::{SoftwareBackend, StoredBuffer};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferHandle(pub(crate) u32);

/// What a buffer is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data.
    Vertex,
    /// Element indices into the vertex arrays.
    Index,
}

/// Numeric type of the elements in an uploaded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Float32,
    Uint32,
}

/// Borrowed flat buffer contents tagged with their element type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BufferData<'a> {
    Float32(&'a [f32]),
    Uint32(&'a [u32]),
}

impl BufferData<'_> {
    pub fn element_type(&self) -> ElementType {
        match self {
            BufferData::Float32(_) => ElementType::Float32,
            BufferData::Uint32(_) => ElementType::Uint32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BufferData::Float32(d) => d.len(),
            BufferData::Uint32(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Upload frequency hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
    Stream,
}

/// Texel format, covering both the channel layout and the component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8,
    Rgba16F,
    Rgba32F,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: FilterMode,
}

impl TextureDescriptor {
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            filter: FilterMode::default(),
        }
    }

    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Capabilities the geometry core needs from a graphics backend.
///
/// The backend's binding state (bound framebuffer, viewport) is global to
/// the backend. Callers that change it must restore what they found, which is
/// why the binding setters return the previous value.
pub trait Backend {
    /// Human readable backend name, for logs.
    fn name(&self) -> &'static str;

    fn create_buffer(&mut self, target: BufferTarget) -> Result<BufferHandle>;

    /// Replaces the contents of `handle` with `data`.
    fn upload_buffer(
        &mut self,
        handle: BufferHandle,
        data: BufferData<'_>,
        usage: BufferUsage,
    ) -> Result<()>;

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Result<TextureHandle>;

    /// Replaces the texels of `handle`; `texels` is row-major, one RGBA value
    /// per texel.
    fn upload_texture(&mut self, handle: TextureHandle, texels: &[[f32; 4]]) -> Result<()>;

    fn delete_texture(&mut self, handle: TextureHandle);

    fn create_framebuffer(&mut self) -> Result<FramebufferHandle>;

    fn delete_framebuffer(&mut self, handle: FramebufferHandle);

    /// Attaches `texture` as the single color target of `framebuffer`.
    fn attach_color_target(
        &mut self,
        framebuffer: FramebufferHandle,
        texture: TextureHandle,
    ) -> Result<()>;

    /// Whether `framebuffer` can currently be rendered to.
    fn check_complete(&self, framebuffer: FramebufferHandle) -> bool;

    /// Binds `framebuffer` (or the default target for `None`) and returns the
    /// previous binding.
    fn bind_framebuffer(
        &mut self,
        framebuffer: Option<FramebufferHandle>,
    ) -> Option<FramebufferHandle>;

    /// Sets the viewport and returns the previous one.
    fn set_viewport(&mut self, viewport: Viewport) -> Viewport;
}
