//! Mesh geometry engine for GPU-style rendering pipelines.
//!
//! This crate provides indexed meshes with typed vertex attributes, the 3D
//! math they need, upload of their arrays into backend buffers and a
//! double-buffered render target for feedback rendering. The graphics API
//! sits behind the [`Backend`] trait; [`SoftwareBackend`] keeps everything in
//! memory.
//!
//! # Quick Start
//!
//! ```
//! use meshkit::prelude::*;
//!
//! let mut backend = SoftwareBackend::new();
//! let mut cube = Mesh::cube(&mut backend, MeshOptions::default())?;
//! cube.compute_normals(&mut backend)?;
//! cube.transform(&mut backend, &Mat4::scaling(2.0, 1.0, 1.0))?;
//! assert_eq!(cube.vertex_count(), 24);
//! # Ok::<(), meshkit::Error>(())
//! ```

// Public API - exposed to library consumers
pub mod backend;
pub mod buffer;
pub mod error;
pub mod indexer;
pub mod math;
pub mod mesh;
pub mod projection;
pub mod surface;
pub mod texture;

// Re-export commonly needed types at crate root for convenience
pub use backend::{Backend, SoftwareBackend};
pub use buffer::GeometryBuffer;
pub use error::{Error, Result};
pub use indexer::Indexer;
pub use mesh::{Mesh, MeshData, MeshOptions};
pub use surface::DoubleBufferedSurface;

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use meshkit::prelude::*;
/// ```
pub mod prelude {
    // Backend
    pub use crate::backend::{
        Backend, BufferUsage, FilterMode, SoftwareBackend, TextureFormat, Viewport,
    };

    // Geometry
    pub use crate::buffer::GeometryBuffer;
    pub use crate::indexer::Indexer;
    pub use crate::mesh::{Aabb, Attribute, BoundingSphere, IndexKind, Mesh, MeshOptions, Slot};

    // Math
    pub use crate::math::mat4::Mat4;
    pub use crate::math::vec3::Vec3;

    // Rendering
    pub use crate::hit_test::HitTest;
    pub use crate::projection::{unproject, Projection};
    pub use crate::surface::DoubleBufferedSurface;
    pub use crate::texture::Texture;

    // Errors
    pub use crate::error::{Error, Result};
}
