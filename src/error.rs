//! Error types for geometry, transform and render-target operations.

use thiserror::Error;

/// Errors returned by the mesh engine.
///
/// Every variant is a local, synchronous failure. Nothing is retried; the
/// caller decides whether to abort or substitute a fallback.
#[derive(Error, Debug)]
pub enum Error {
    /// Inconsistent tuple arity, mismatched attribute lengths, or an index
    /// pointing past the end of the vertex array.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A derived-geometry operation ran without its prerequisite array.
    #[error("missing data: {0}")]
    MissingData(&'static str),

    /// Matrix inverse requested on a (near) zero-determinant matrix.
    #[error("singular transform (determinant {determinant})")]
    SingularTransform { determinant: f32 },

    /// No candidate format produced a complete framebuffer.
    #[error("render target unusable: {0}")]
    RenderTarget(String),

    /// The backend rejected a call (unknown handle, nothing bound, ...).
    #[error("backend error: {0}")]
    Backend(String),

    #[error("failed to parse mesh data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to load OBJ: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for mesh engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = Error::MissingData("triangles");
        assert_eq!(err.to_string(), "missing data: triangles");

        let err = Error::SingularTransform { determinant: 0.0 };
        assert_eq!(err.to_string(), "singular transform (determinant 0)");
    }
}
