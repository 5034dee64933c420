//! Geometry derived from the triangle topology, and in-place transforms.

use super::{Edit, Mesh};
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::indexer::{Edge, Indexer};
use crate::math::{Mat4, Vec3};

impl Mesh {
    /// Populated triangle array, or [`Error::MissingData`].
    fn required_triangles(&self) -> Result<&[[u32; 3]]> {
        match self.triangles.as_deref() {
            Some(triangles) if !triangles.is_empty() => Ok(triangles),
            _ => Err(Error::MissingData("triangles")),
        }
    }

    /// Applies `matrix` to every position and, if present, every normal, then
    /// recompiles.
    ///
    /// Positions go through [`Mat4::transform_point`]. Normals go through the
    /// inverse-transpose of `matrix` and are renormalized, which keeps them
    /// perpendicular to the surface under non-uniform scale and shear.
    ///
    /// # Errors
    /// [`Error::SingularTransform`] if normals are present and `matrix` has no
    /// inverse; [`Error::InvalidGeometry`] if the mesh does not compile. The
    /// mesh is not modified in either case.
    pub fn transform<B: Backend + ?Sized>(&mut self, backend: &mut B, matrix: &Mat4) -> Result<()> {
        let normals = match &self.normals {
            Some(normals) => {
                let normal_matrix = matrix.inverse_transpose()?;
                let transformed: Vec<Vec3> = normals
                    .iter()
                    .map(|&n| normal_matrix.transform_vector(n).unit())
                    .collect();
                Some(Some(transformed))
            }
            None => None,
        };
        let positions: Vec<Vec3> = self
            .positions
            .iter()
            .map(|&p| matrix.transform_point(p))
            .collect();

        self.commit(
            backend,
            Edit {
                positions: Some(positions),
                normals,
                ..Edit::default()
            },
        )
    }

    /// Replaces the normals with smoothed per-vertex normals and recompiles.
    ///
    /// Each triangle contributes its *unit* face normal to each of its three
    /// vertices and the sums are normalized afterwards. Shared vertices are
    /// therefore weighted by triangle count rather than triangle area.
    /// Vertices referenced by no triangle get a zero normal.
    ///
    /// # Errors
    /// [`Error::MissingData`] without a populated triangle array;
    /// [`Error::InvalidGeometry`] if a triangle refers to a missing vertex or
    /// the mesh does not compile. The mesh is not modified on error.
    pub fn compute_normals<B: Backend + ?Sized>(&mut self, backend: &mut B) -> Result<()> {
        let triangles = self.required_triangles()?;
        let n = self.positions.len();
        let mut sums = vec![Vec3::ZERO; n];

        for &[a, b, c] in triangles {
            let (a, b, c) = (a as usize, b as usize, c as usize);
            if a >= n || b >= n || c >= n {
                return Err(Error::InvalidGeometry(format!(
                    "triangle [{a}, {b}, {c}] out of range for {n} vertices"
                )));
            }
            let (v0, v1, v2) = (self.positions[a], self.positions[b], self.positions[c]);
            let face = (v1 - v0).cross(v2 - v0).unit();
            sums[a] = sums[a] + face;
            sums[b] = sums[b] + face;
            sums[c] = sums[c] + face;
        }

        let normals: Vec<Vec3> = sums.into_iter().map(Vec3::unit).collect();
        self.commit(
            backend,
            Edit {
                normals: Some(Some(normals)),
                ..Edit::default()
            },
        )
    }

    /// Replaces the line array with the distinct undirected edges of the
    /// triangles, in first-seen order, and recompiles.
    ///
    /// # Errors
    /// [`Error::MissingData`] without a populated triangle array;
    /// [`Error::InvalidGeometry`] if the mesh does not compile, in which case
    /// the previous lines are kept.
    pub fn compute_wireframe<B: Backend + ?Sized>(&mut self, backend: &mut B) -> Result<()> {
        let triangles = self.required_triangles()?;
        let mut indexer = Indexer::new();
        for &[a, b, c] in triangles {
            indexer.add(Edge::undirected(a, b));
            indexer.add(Edge::undirected(b, c));
            indexer.add(Edge::undirected(c, a));
        }

        let lines: Vec<[u32; 2]> = indexer
            .into_unique()
            .into_iter()
            .map(Edge::to_array)
            .collect();
        self.commit(
            backend,
            Edit {
                lines: Some(Some(lines)),
                ..Edit::default()
            },
        )
    }
}
