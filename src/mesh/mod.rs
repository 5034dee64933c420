//! Indexed triangle/line meshes with typed vertex attributes.
//!
//! A [`Mesh`] owns its CPU-side arrays and one [`GeometryBuffer`] per active
//! array. Buffers mirror the arrays only as of the last [`Mesh::compile`];
//! mutating an array through an accessor leaves them stale until the next
//! compile. The derive operations ([`Mesh::transform`],
//! [`Mesh::compute_normals`], [`Mesh::compute_wireframe`]) recompile before
//! returning.

mod bounds;
mod derive;
mod io;
mod primitives;

pub use bounds::{Aabb, BoundingSphere};
pub use io::MeshData;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::backend::{Backend, BufferTarget, BufferUsage};
use crate::buffer::{flatten, Flattened, GeometryBuffer};
use crate::error::{Error, Result};
use crate::math::Vec3;

/// Per-vertex attribute kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Position,
    TexCoord,
    Normal,
    Color,
}

/// Index array kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Triangles,
    Lines,
}

/// Identifies one compiled buffer of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Attribute(Attribute),
    Index(IndexKind),
}

/// Which optional arrays a factory-built mesh carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshOptions {
    pub coords: bool,
    pub normals: bool,
    pub colors: bool,
    pub triangles: bool,
    pub lines: bool,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            coords: false,
            normals: false,
            colors: false,
            triangles: true,
            lines: false,
        }
    }
}

impl MeshOptions {
    pub fn with_coords(mut self) -> Self {
        self.coords = true;
        self
    }

    pub fn with_normals(mut self) -> Self {
        self.normals = true;
        self
    }

    pub fn with_colors(mut self) -> Self {
        self.colors = true;
        self
    }

    pub fn with_lines(mut self) -> Self {
        self.lines = true;
        self
    }
}

#[derive(Debug, Default)]
pub struct Mesh {
    positions: Vec<Vec3>,
    coords: Option<Vec<[f32; 2]>>,
    normals: Option<Vec<Vec3>>,
    colors: Option<Vec<Vec<f32>>>,
    triangles: Option<Vec<[u32; 3]>>,
    lines: Option<Vec<[u32; 2]>>,
    buffers: HashMap<Slot, GeometryBuffer>,
    usage: BufferUsage,
}

impl Mesh {
    /// Creates an empty, uncompiled mesh with the arrays selected by `options`.
    pub fn new(options: MeshOptions) -> Self {
        let mut mesh = Self::default();
        if options.coords {
            mesh.add_vertex_attribute(Attribute::TexCoord);
        }
        if options.normals {
            mesh.add_vertex_attribute(Attribute::Normal);
        }
        if options.colors {
            mesh.add_vertex_attribute(Attribute::Color);
        }
        if options.triangles {
            mesh.add_index_array(IndexKind::Triangles);
        }
        if options.lines {
            mesh.add_index_array(IndexKind::Lines);
        }
        mesh
    }

    /// Sets the usage hint passed to the backend on every compile.
    pub fn set_usage(&mut self, usage: BufferUsage) {
        self.usage = usage;
    }

    /// Registers an empty attribute array. Existing data is kept.
    pub fn add_vertex_attribute(&mut self, attribute: Attribute) {
        match attribute {
            Attribute::Position => {}
            Attribute::TexCoord => {
                self.coords.get_or_insert_with(Vec::new);
            }
            Attribute::Normal => {
                self.normals.get_or_insert_with(Vec::new);
            }
            Attribute::Color => {
                self.colors.get_or_insert_with(Vec::new);
            }
        }
    }

    /// Registers an empty index array. Existing data is kept.
    pub fn add_index_array(&mut self, kind: IndexKind) {
        match kind {
            IndexKind::Triangles => {
                self.triangles.get_or_insert_with(Vec::new);
            }
            IndexKind::Lines => {
                self.lines.get_or_insert_with(Vec::new);
            }
        }
    }

    pub fn has_attribute(&self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::Position => true,
            Attribute::TexCoord => self.coords.is_some(),
            Attribute::Normal => self.normals.is_some(),
            Attribute::Color => self.colors.is_some(),
        }
    }

    pub fn has_index_array(&self, kind: IndexKind) -> bool {
        match kind {
            IndexKind::Triangles => self.triangles.is_some(),
            IndexKind::Lines => self.lines.is_some(),
        }
    }

    // ============ Array Access ============

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut Vec<Vec3> {
        &mut self.positions
    }

    pub fn coords(&self) -> Option<&[[f32; 2]]> {
        self.coords.as_deref()
    }

    pub fn coords_mut(&mut self) -> Option<&mut Vec<[f32; 2]>> {
        self.coords.as_mut()
    }

    pub fn normals(&self) -> Option<&[Vec3]> {
        self.normals.as_deref()
    }

    pub fn normals_mut(&mut self) -> Option<&mut Vec<Vec3>> {
        self.normals.as_mut()
    }

    pub fn colors(&self) -> Option<&[Vec<f32>]> {
        self.colors.as_deref()
    }

    pub fn colors_mut(&mut self) -> Option<&mut Vec<Vec<f32>>> {
        self.colors.as_mut()
    }

    pub fn triangles(&self) -> Option<&[[u32; 3]]> {
        self.triangles.as_deref()
    }

    pub fn triangles_mut(&mut self) -> Option<&mut Vec<[u32; 3]>> {
        self.triangles.as_mut()
    }

    pub fn lines(&self) -> Option<&[[u32; 2]]> {
        self.lines.as_deref()
    }

    pub fn lines_mut(&mut self) -> Option<&mut Vec<[u32; 2]>> {
        self.lines.as_mut()
    }

    /// Compiled buffer for `slot`, if the array was active at the last compile.
    pub fn buffer(&self, slot: Slot) -> Option<&GeometryBuffer> {
        self.buffers.get(&slot)
    }

    // ============ Compilation ============

    /// Checks that every attribute matches the vertex count and every index
    /// refers to an existing vertex.
    pub fn validate(&self) -> Result<()> {
        let n = self.positions.len();
        let lengths = [
            ("coords", self.coords.as_ref().map(Vec::len)),
            ("normals", self.normals.as_ref().map(Vec::len)),
            ("colors", self.colors.as_ref().map(Vec::len)),
        ];
        for (name, len) in lengths {
            if let Some(len) = len.filter(|&len| len != n) {
                return Err(Error::InvalidGeometry(format!(
                    "{name} has {len} entries but the mesh has {n} vertices"
                )));
            }
        }

        let triangle_indices = self.triangles.iter().flatten().flatten();
        let line_indices = self.lines.iter().flatten().flatten();
        if let Some(bad) = triangle_indices
            .chain(line_indices)
            .find(|&&i| i as usize >= n)
        {
            return Err(Error::InvalidGeometry(format!(
                "index {bad} out of range for {n} vertices"
            )));
        }
        Ok(())
    }

    /// Uploads every active array to its backend buffer.
    ///
    /// Every array is validated and flattened before the first upload, so a
    /// geometry error leaves all buffers as they were. Only a backend failure
    /// part way through can leave them mixed.
    ///
    /// # Errors
    /// [`Error::InvalidGeometry`] on mismatched attribute lengths, out-of-range
    /// indices or mixed-arity tuples.
    pub fn compile<B: Backend + ?Sized>(&mut self, backend: &mut B) -> Result<()> {
        let staged = self.stage()?;
        self.upload(backend, staged)
    }

    /// Validates and flattens every active array without touching the backend.
    fn stage(&self) -> Result<Staged> {
        self.validate()?;

        let mut attributes = vec![(Attribute::Position, flatten(&self.positions)?)];
        if let Some(coords) = &self.coords {
            attributes.push((Attribute::TexCoord, flatten(coords)?));
        }
        if let Some(normals) = &self.normals {
            attributes.push((Attribute::Normal, flatten(normals)?));
        }
        if let Some(colors) = &self.colors {
            attributes.push((Attribute::Color, flatten(colors)?));
        }

        let mut indices = Vec::new();
        if let Some(triangles) = &self.triangles {
            indices.push((IndexKind::Triangles, flatten(triangles)?));
        }
        if let Some(lines) = &self.lines {
            indices.push((IndexKind::Lines, flatten(lines)?));
        }
        Ok(Staged {
            attributes,
            indices,
        })
    }

    fn upload<B: Backend + ?Sized>(&mut self, backend: &mut B, staged: Staged) -> Result<()> {
        let usage = self.usage;
        for (attribute, flat) in &staged.attributes {
            let buffer = self.buffer_for(backend, Slot::Attribute(*attribute))?;
            buffer.upload(backend, flat, usage)?;
        }
        for (kind, flat) in &staged.indices {
            let buffer = self.buffer_for(backend, Slot::Index(*kind))?;
            buffer.upload(backend, flat, usage)?;
        }

        log::debug!(
            "compiled mesh: {} vertices, {} buffers",
            self.positions.len(),
            self.buffers.len()
        );
        Ok(())
    }

    /// Buffer for `slot`, created on first use.
    fn buffer_for<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        slot: Slot,
    ) -> Result<&mut GeometryBuffer> {
        match self.buffers.entry(slot) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let target = match slot {
                    Slot::Attribute(_) => BufferTarget::Vertex,
                    Slot::Index(_) => BufferTarget::Index,
                };
                Ok(e.insert(GeometryBuffer::new(backend, target)?))
            }
        }
    }

    /// Swaps in replacement arrays, then compiles.
    ///
    /// If the replacement does not stage, the previous arrays are restored
    /// and the error returned with the mesh unchanged.
    fn commit<B: Backend + ?Sized>(&mut self, backend: &mut B, edit: Edit) -> Result<()> {
        let undo = self.apply(edit);
        match self.stage() {
            Ok(staged) => self.upload(backend, staged),
            Err(e) => {
                self.apply(undo);
                Err(e)
            }
        }
    }

    /// Replaces the arrays named in `edit`, returning their previous values.
    fn apply(&mut self, edit: Edit) -> Edit {
        Edit {
            positions: edit
                .positions
                .map(|p| std::mem::replace(&mut self.positions, p)),
            normals: edit.normals.map(|n| std::mem::replace(&mut self.normals, n)),
            lines: edit.lines.map(|l| std::mem::replace(&mut self.lines, l)),
        }
    }
}

/// Flattened arrays of a mesh, staged for upload.
struct Staged {
    attributes: Vec<(Attribute, Flattened<f32>)>,
    indices: Vec<(IndexKind, Flattened<u32>)>,
}

/// Replacement arrays for a derive operation; `None` leaves an array as is.
#[derive(Default)]
struct Edit {
    positions: Option<Vec<Vec3>>,
    normals: Option<Option<Vec<Vec3>>>,
    lines: Option<Option<Vec<[u32; 2]>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ElementType, SoftwareBackend};

    fn triangle_mesh() -> Mesh {
        let mut mesh = Mesh::new(MeshOptions::default());
        mesh.positions_mut().extend([
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]);
        if let Some(triangles) = mesh.triangles_mut() {
            triangles.push([0, 1, 2]);
        }
        mesh
    }

    #[test]
    fn new_registers_requested_arrays() {
        let mesh = Mesh::new(MeshOptions::default().with_normals().with_lines());
        assert!(mesh.has_attribute(Attribute::Position));
        assert!(mesh.has_attribute(Attribute::Normal));
        assert!(!mesh.has_attribute(Attribute::TexCoord));
        assert!(mesh.has_index_array(IndexKind::Triangles));
        assert!(mesh.has_index_array(IndexKind::Lines));
    }

    #[test]
    fn add_attribute_keeps_existing_data() {
        let mut mesh = triangle_mesh();
        mesh.add_vertex_attribute(Attribute::Normal);
        mesh.normals_mut().unwrap().push(Vec3::Z);
        mesh.add_vertex_attribute(Attribute::Normal);
        assert_eq!(mesh.normals().unwrap().len(), 1);
    }

    #[test]
    fn compile_creates_one_buffer_per_array() {
        let mut backend = SoftwareBackend::new();
        let mut mesh = triangle_mesh();
        mesh.compile(&mut backend).unwrap();

        let positions = mesh.buffer(Slot::Attribute(Attribute::Position)).unwrap();
        assert_eq!(positions.spacing(), 3);
        assert_eq!(positions.count(), 3);
        let triangles = mesh.buffer(Slot::Index(IndexKind::Triangles)).unwrap();
        assert_eq!(triangles.element_type(), Some(ElementType::Uint32));
        assert!(mesh.buffer(Slot::Attribute(Attribute::Normal)).is_none());
        assert_eq!(backend.buffer_count(), 2);
    }

    #[test]
    fn recompile_reuses_buffers() {
        let mut backend = SoftwareBackend::new();
        let mut mesh = triangle_mesh();
        mesh.compile(&mut backend).unwrap();
        let handle = mesh.buffer(Slot::Attribute(Attribute::Position)).unwrap().handle();

        mesh.positions_mut()[0] = Vec3::ONE;
        // stale until recompiled
        assert_eq!(
            backend.buffer(handle),
            Some(&crate::backend::StoredBuffer::Float32(vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0
            ]))
        );
        mesh.compile(&mut backend).unwrap();
        assert_eq!(
            mesh.buffer(Slot::Attribute(Attribute::Position)).unwrap().handle(),
            handle
        );
        assert_eq!(backend.buffer_count(), 2);
    }

    #[test]
    fn mixed_arity_colors_fail_compile() {
        let mut backend = SoftwareBackend::new();
        let mut mesh = triangle_mesh();
        mesh.add_vertex_attribute(Attribute::Color);
        mesh.colors_mut()
            .unwrap()
            .extend([vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 1.0], vec![0.0, 0.0, 1.0]]);
        assert!(matches!(
            mesh.compile(&mut backend),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn out_of_range_index_fails_compile() {
        let mut backend = SoftwareBackend::new();
        let mut mesh = triangle_mesh();
        mesh.triangles_mut().unwrap().push([0, 1, 3]);
        assert!(matches!(
            mesh.compile(&mut backend),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn attribute_length_mismatch_fails_compile() {
        let mut backend = SoftwareBackend::new();
        let mut mesh = triangle_mesh();
        mesh.add_vertex_attribute(Attribute::TexCoord);
        mesh.coords_mut().unwrap().push([0.0, 0.0]);
        assert!(matches!(
            mesh.compile(&mut backend),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn failed_compile_keeps_previous_buffers() {
        let mut backend = SoftwareBackend::new();
        let mut mesh = triangle_mesh();
        mesh.add_vertex_attribute(Attribute::Color);
        mesh.colors_mut().unwrap().extend(vec![vec![1.0, 1.0, 1.0, 1.0]; 3]);
        mesh.compile(&mut backend).unwrap();
        let positions = mesh.buffer(Slot::Attribute(Attribute::Position)).unwrap().handle();
        let compiled = backend.buffer(positions).cloned();

        mesh.positions_mut()[0] = Vec3::new(9.0, 9.0, 9.0);
        mesh.colors_mut().unwrap()[1] = vec![0.0, 0.0, 0.0];
        assert!(matches!(
            mesh.compile(&mut backend),
            Err(Error::InvalidGeometry(_))
        ));

        assert_eq!(backend.buffer(positions).cloned(), compiled);
        assert_eq!(
            mesh.buffer(Slot::Attribute(Attribute::Position)).unwrap().length(),
            9
        );
    }
}
