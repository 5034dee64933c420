//! Double-buffered render target for feedback (ping-pong) rendering.
//!
//! A pass reads the texture written by the previous pass while drawing into
//! the other one, then the two swap roles. Read and write never alias within
//! a pass.

use crate::backend::{
    Backend, FilterMode, FramebufferHandle, TextureDescriptor, TextureFormat, TextureHandle,
    Viewport,
};
use crate::error::{Error, Result};

/// Formats tried in order when creating a surface; the first one that is
/// render-target complete on the backend wins.
pub const DEFAULT_FORMATS: [TextureFormat; 2] = [TextureFormat::Rgba32F, TextureFormat::Rgba16F];

pub struct DoubleBufferedSurface {
    front: TextureHandle,
    back: TextureHandle,
    framebuffer: FramebufferHandle,
    front_is_read: bool,
    width: u32,
    height: u32,
    format: TextureFormat,
    filter: FilterMode,
}

impl DoubleBufferedSurface {
    /// Creates a surface using the first of [`DEFAULT_FORMATS`] the backend
    /// can render to.
    pub fn new<B: Backend + ?Sized>(
        backend: &mut B,
        width: u32,
        height: u32,
        filter: FilterMode,
    ) -> Result<Self> {
        Self::with_formats(backend, width, height, filter, &DEFAULT_FORMATS)
    }

    /// Creates a surface using the first of `formats` the backend can render to.
    ///
    /// # Errors
    /// [`Error::RenderTarget`] if no candidate format yields a complete
    /// framebuffer.
    pub fn with_formats<B: Backend + ?Sized>(
        backend: &mut B,
        width: u32,
        height: u32,
        filter: FilterMode,
        formats: &[TextureFormat],
    ) -> Result<Self> {
        let mut chosen = None;
        for (i, &format) in formats.iter().enumerate() {
            if probe(backend, width, height, format, filter)? {
                if i > 0 {
                    log::warn!(
                        "{} cannot render to {:?}, falling back to {format:?}",
                        backend.name(),
                        formats[0]
                    );
                }
                chosen = Some(format);
                break;
            }
            log::debug!("{format:?} is not render-target complete on {}", backend.name());
        }
        let format = chosen.ok_or_else(|| {
            Error::RenderTarget(format!(
                "none of {formats:?} is renderable on {}",
                backend.name()
            ))
        })?;

        let descriptor = TextureDescriptor::new(width, height, format).with_filter(filter);
        let front = backend.create_texture(&descriptor)?;
        let back = backend.create_texture(&descriptor)?;
        let framebuffer = backend.create_framebuffer()?;

        let surface = Self {
            front,
            back,
            framebuffer,
            front_is_read: true,
            width,
            height,
            format,
            filter,
        };
        if !surface.can_draw_to(backend)? {
            surface.release(backend);
            return Err(Error::RenderTarget(format!(
                "{width}x{height} {format:?} surface is incomplete"
            )));
        }

        log::info!(
            "created {width}x{height} {format:?} feedback surface on {}",
            backend.name()
        );
        Ok(surface)
    }

    /// Texture the next pass samples from.
    pub fn read(&self) -> TextureHandle {
        if self.front_is_read {
            self.front
        } else {
            self.back
        }
    }

    /// Texture the next pass draws into.
    pub fn write(&self) -> TextureHandle {
        if self.front_is_read {
            self.back
        } else {
            self.front
        }
    }

    /// Exchanges the read and write textures.
    pub fn swap(&mut self) {
        self.front_is_read = !self.front_is_read;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn framebuffer(&self) -> FramebufferHandle {
        self.framebuffer
    }

    /// Attaches the write texture and checks framebuffer completeness.
    ///
    /// Leaves the framebuffer binding as it found it.
    pub fn can_draw_to<B: Backend + ?Sized>(&self, backend: &mut B) -> Result<bool> {
        backend.attach_color_target(self.framebuffer, self.write())?;
        Ok(backend.check_complete(self.framebuffer))
    }

    /// Runs `draw` with the write texture as the render target, then swaps.
    ///
    /// The framebuffer binding and viewport in effect before the call are
    /// restored afterwards, also when `draw` fails. A failed pass does not
    /// swap.
    pub fn render_within<B, F, R>(&mut self, backend: &mut B, draw: F) -> Result<R>
    where
        B: Backend + ?Sized,
        F: FnOnce(&mut B) -> Result<R>,
    {
        let previous_framebuffer = backend.bind_framebuffer(Some(self.framebuffer));
        let result = backend
            .attach_color_target(self.framebuffer, self.write())
            .and_then(|()| {
                let previous_viewport =
                    backend.set_viewport(Viewport::new(0, 0, self.width, self.height));
                let result = draw(backend);
                backend.set_viewport(previous_viewport);
                result
            });
        backend.bind_framebuffer(previous_framebuffer);

        if result.is_ok() {
            self.swap();
        }
        result
    }

    /// Frees the textures and framebuffer.
    pub fn release<B: Backend + ?Sized>(self, backend: &mut B) {
        backend.delete_framebuffer(self.framebuffer);
        backend.delete_texture(self.front);
        backend.delete_texture(self.back);
    }
}

/// Builds a throwaway target in `format` and reports whether it is complete.
fn probe<B: Backend + ?Sized>(
    backend: &mut B,
    width: u32,
    height: u32,
    format: TextureFormat,
    filter: FilterMode,
) -> Result<bool> {
    let texture =
        backend.create_texture(&TextureDescriptor::new(width, height, format).with_filter(filter))?;
    let framebuffer = backend.create_framebuffer()?;
    let complete = backend
        .attach_color_target(framebuffer, texture)
        .map(|()| backend.check_complete(framebuffer));
    backend.delete_framebuffer(framebuffer);
    backend.delete_texture(texture);
    complete
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;

    #[test]
    fn read_and_write_never_alias() {
        let mut backend = SoftwareBackend::new();
        let mut surface =
            DoubleBufferedSurface::new(&mut backend, 4, 4, FilterMode::Nearest).unwrap();
        assert_ne!(surface.read(), surface.write());
        surface.swap();
        assert_ne!(surface.read(), surface.write());
    }

    #[test]
    fn prefers_full_float() {
        let mut backend = SoftwareBackend::new();
        let surface = DoubleBufferedSurface::new(&mut backend, 4, 4, FilterMode::Linear).unwrap();
        assert_eq!(surface.format(), TextureFormat::Rgba32F);
        // probe resources are cleaned up
        assert_eq!(backend.texture_count(), 2);
        assert_eq!(backend.framebuffer_count(), 1);
    }

    #[test]
    fn falls_back_to_half_float() {
        let mut backend = SoftwareBackend::new().with_render_formats(&[TextureFormat::Rgba16F]);
        let surface = DoubleBufferedSurface::new(&mut backend, 4, 4, FilterMode::Nearest).unwrap();
        assert_eq!(surface.format(), TextureFormat::Rgba16F);
    }

    #[test]
    fn fails_without_renderable_format() {
        let mut backend = SoftwareBackend::new().with_render_formats(&[TextureFormat::Rgba8]);
        let result = DoubleBufferedSurface::new(&mut backend, 4, 4, FilterMode::Nearest);
        assert!(matches!(result, Err(Error::RenderTarget(_))));
        assert_eq!(backend.texture_count(), 0);
        assert_eq!(backend.framebuffer_count(), 0);
    }

    #[test]
    fn written_texture_becomes_read() {
        let mut backend = SoftwareBackend::new();
        let mut surface =
            DoubleBufferedSurface::new(&mut backend, 2, 2, FilterMode::Nearest).unwrap();
        let target = surface.write();

        let drawn_into = surface
            .render_within(&mut backend, |b| {
                b.clear([1.0, 0.0, 0.0, 1.0])?;
                Ok(b.bound_framebuffer())
            })
            .unwrap();

        assert_eq!(drawn_into, Some(surface.framebuffer()));
        assert_eq!(surface.read(), target);
        assert_eq!(backend.read_pixel(target, 1, 1), Some([1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn restores_bindings() {
        let mut backend = SoftwareBackend::new();
        let outer = backend.create_framebuffer().unwrap();
        backend.bind_framebuffer(Some(outer));
        backend.set_viewport(Viewport::new(10, 20, 640, 480));

        let mut surface =
            DoubleBufferedSurface::new(&mut backend, 8, 8, FilterMode::Nearest).unwrap();
        surface
            .render_within(&mut backend, |b| {
                assert_eq!(b.viewport(), Viewport::new(0, 0, 8, 8));
                Ok(())
            })
            .unwrap();

        assert_eq!(backend.bound_framebuffer(), Some(outer));
        assert_eq!(backend.viewport(), Viewport::new(10, 20, 640, 480));
    }

    #[test]
    fn failed_pass_restores_and_does_not_swap() {
        let mut backend = SoftwareBackend::new();
        backend.set_viewport(Viewport::new(0, 0, 100, 100));
        let mut surface =
            DoubleBufferedSurface::new(&mut backend, 8, 8, FilterMode::Nearest).unwrap();
        let read = surface.read();

        let result: Result<()> = surface.render_within(&mut backend, |_| {
            Err(Error::Backend("draw failed".into()))
        });

        assert!(result.is_err());
        assert_eq!(surface.read(), read);
        assert_eq!(backend.bound_framebuffer(), None);
        assert_eq!(backend.viewport(), Viewport::new(0, 0, 100, 100));
    }

    #[test]
    fn passes_alternate_targets() {
        let mut backend = SoftwareBackend::new();
        let mut surface =
            DoubleBufferedSurface::new(&mut backend, 1, 1, FilterMode::Nearest).unwrap();
        let first = surface.write();
        surface.render_within(&mut backend, |_| Ok(())).unwrap();
        let second = surface.write();
        surface.render_within(&mut backend, |_| Ok(())).unwrap();
        assert_ne!(first, second);
        assert_eq!(surface.write(), first);
    }
}
