//! Mesh interchange: the JSON parallel-array format and Wavefront OBJ.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Mesh, MeshOptions};
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::math::Vec3;

/// Parallel arrays describing a mesh.
///
/// `vertices` is required. A non-empty optional array activates the matching
/// attribute or index array on the loaded mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coords: Vec<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normals: Vec<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triangles: Vec<[u32; 3]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<[u32; 2]>,
}

/// Converts variable-length tuples to fixed arity `N`.
fn fixed<const N: usize>(name: &str, tuples: &[Vec<f32>]) -> Result<Vec<[f32; N]>> {
    tuples
        .iter()
        .enumerate()
        .map(|(i, t)| {
            <[f32; N]>::try_from(t.as_slice()).map_err(|_| {
                Error::InvalidGeometry(format!(
                    "{name}[{i}] has {} components, expected {N}",
                    t.len()
                ))
            })
        })
        .collect()
}

/// True when the file has at least one object and `f` holds for all of them.
fn every(models: &[tobj::Model], f: impl Fn(&tobj::Mesh) -> bool) -> bool {
    !models.is_empty() && models.iter().all(|m| f(&m.mesh))
}

/// Colors are RGB or RGBA.
fn check_colors(colors: &[Vec<f32>]) -> Result<()> {
    match colors.iter().position(|c| c.len() != 3 && c.len() != 4) {
        Some(i) => Err(Error::InvalidGeometry(format!(
            "colors[{i}] has {} components, expected 3 or 4",
            colors[i].len()
        ))),
        None => Ok(()),
    }
}

fn non_empty<T>(v: Vec<T>) -> Option<Vec<T>> {
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

impl Mesh {
    /// Builds and compiles a mesh from parallel arrays.
    ///
    /// # Errors
    /// [`Error::InvalidGeometry`] if a fixed-arity array (`vertices`,
    /// `normals`, `coords`) contains a tuple of the wrong size, a color is not
    /// RGB or RGBA, or the compiled arrays are inconsistent.
    pub fn load<B: Backend + ?Sized>(backend: &mut B, data: &MeshData) -> Result<Mesh> {
        let positions = fixed::<3>("vertices", &data.vertices)?;
        let normals = fixed::<3>("normals", &data.normals)?;
        let coords = fixed::<2>("coords", &data.coords)?;
        check_colors(&data.colors)?;

        let mut mesh = Mesh {
            positions: positions.into_iter().map(Vec3::from_array).collect(),
            coords: non_empty(coords),
            normals: non_empty(normals.into_iter().map(Vec3::from_array).collect()),
            colors: non_empty(data.colors.clone()),
            triangles: non_empty(data.triangles.clone()),
            lines: non_empty(data.lines.clone()),
            ..Mesh::default()
        };
        mesh.compile(backend)?;
        Ok(mesh)
    }

    /// Parses the JSON interchange format and loads it.
    pub fn from_json<B: Backend + ?Sized>(backend: &mut B, json: &str) -> Result<Mesh> {
        let data: MeshData = serde_json::from_str(json)?;
        Self::load(backend, &data)
    }

    /// Snapshot of the CPU-side arrays in interchange form.
    pub fn to_data(&self) -> MeshData {
        MeshData {
            vertices: self.positions.iter().map(|p| p.to_array().to_vec()).collect(),
            coords: self
                .coords
                .iter()
                .flatten()
                .map(|c| c.to_vec())
                .collect(),
            normals: self
                .normals
                .iter()
                .flatten()
                .map(|n| n.to_array().to_vec())
                .collect(),
            colors: self.colors.clone().unwrap_or_default(),
            triangles: self.triangles.clone().unwrap_or_default(),
            lines: self.lines.clone().unwrap_or_default(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_data())?)
    }

    /// Loads every object of a Wavefront OBJ file into one mesh.
    ///
    /// Faces are triangulated and vertices re-indexed so that positions,
    /// texture coordinates and normals share one index. An optional attribute
    /// is kept only when every object in the file provides it.
    pub fn load_obj<B, P>(backend: &mut B, path: P) -> Result<Mesh>
    where
        B: Backend + ?Sized,
        P: AsRef<Path>,
    {
        let (models, _materials) = tobj::load_obj(path.as_ref(), &tobj::GPU_LOAD_OPTIONS)?;
        log::debug!(
            "loaded {} objects from {}",
            models.len(),
            path.as_ref().display()
        );

        let mut mesh = Mesh::new(MeshOptions {
            coords: every(&models, |m| !m.texcoords.is_empty()),
            normals: every(&models, |m| !m.normals.is_empty()),
            colors: every(&models, |m| !m.vertex_color.is_empty()),
            triangles: true,
            lines: false,
        });

        for model in &models {
            let obj = &model.mesh;
            let base = mesh.positions.len() as u32;
            mesh.positions.extend(
                obj.positions
                    .chunks_exact(3)
                    .map(|p| Vec3::new(p[0], p[1], p[2])),
            );
            if let Some(coords) = &mut mesh.coords {
                coords.extend(obj.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]));
            }
            if let Some(normals) = &mut mesh.normals {
                normals.extend(
                    obj.normals
                        .chunks_exact(3)
                        .map(|n| Vec3::new(n[0], n[1], n[2])),
                );
            }
            if let Some(colors) = &mut mesh.colors {
                colors.extend(obj.vertex_color.chunks_exact(3).map(<[f32]>::to_vec));
            }
            if let Some(triangles) = &mut mesh.triangles {
                triangles.extend(
                    obj.indices
                        .chunks_exact(3)
                        .map(|f| [base + f[0], base + f[1], base + f[2]]),
                );
            }
        }

        mesh.compile(backend)?;
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::mesh::{Attribute, IndexKind};

    #[test]
    fn load_infers_optional_arrays() {
        let mut backend = SoftwareBackend::new();
        let data = MeshData {
            vertices: vec![vec![0.0, 0.0, 0.0], vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            colors: vec![vec![1.0, 0.0, 0.0, 1.0]; 3],
            triangles: vec![[0, 1, 2]],
            ..MeshData::default()
        };
        let mesh = Mesh::load(&mut backend, &data).unwrap();
        assert!(mesh.has_attribute(Attribute::Color));
        assert!(!mesh.has_attribute(Attribute::Normal));
        assert!(!mesh.has_attribute(Attribute::TexCoord));
        assert!(mesh.has_index_array(IndexKind::Triangles));
        assert!(!mesh.has_index_array(IndexKind::Lines));
    }

    #[test]
    fn load_rejects_wrong_vertex_arity() {
        let mut backend = SoftwareBackend::new();
        let data = MeshData {
            vertices: vec![vec![0.0, 0.0, 0.0], vec![1.0, 0.0]],
            ..MeshData::default()
        };
        assert!(matches!(
            Mesh::load(&mut backend, &data),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn load_rejects_two_component_colors() {
        let mut backend = SoftwareBackend::new();
        let json = r#"{
            "vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
            "colors": [[1, 0], [0, 1], [1, 1]]
        }"#;
        assert!(matches!(
            Mesh::from_json(&mut backend, json),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn json_round_trip() {
        let mut backend = SoftwareBackend::new();
        let json = r#"{
            "vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
            "coords": [[0, 0], [1, 0], [0, 1]],
            "triangles": [[0, 1, 2]]
        }"#;
        let mesh = Mesh::from_json(&mut backend, json).unwrap();
        assert_eq!(mesh.coords().unwrap()[1], [1.0, 0.0]);

        let reloaded = Mesh::from_json(&mut backend, &mesh.to_json().unwrap()).unwrap();
        assert_eq!(reloaded.to_data(), mesh.to_data());
    }

    #[test]
    fn json_requires_vertices() {
        let mut backend = SoftwareBackend::new();
        let result = Mesh::from_json(&mut backend, r#"{ "triangles": [[0, 1, 2]] }"#);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn load_obj_merges_objects() {
        let dir = std::env::temp_dir().join(format!("meshkit-obj-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("quads.obj");
        std::fs::write(
            &path,
            "o first\n\
             v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
             f 1 2 3 4\n\
             o second\n\
             v 0 0 1\nv 1 0 1\nv 0 1 1\n\
             f 5 6 7\n",
        )
        .unwrap();

        let mut backend = SoftwareBackend::new();
        let mesh = Mesh::load_obj(&mut backend, &path).unwrap();
        assert_eq!(mesh.vertex_count(), 7);
        assert_eq!(mesh.triangles().unwrap().len(), 3);
        assert!(!mesh.has_attribute(Attribute::Normal));
        assert!(mesh
            .triangles()
            .unwrap()
            .iter()
            .flatten()
            .all(|&i| (i as usize) < mesh.vertex_count()));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
