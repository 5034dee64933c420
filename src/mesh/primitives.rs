use super::{Mesh, MeshOptions};
use crate::backend::Backend;
use crate::error::Result;
use crate::math::Vec3;

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Per face: the four corner octants in (s, t) order, then the face normal.
const CUBE_FACES: [([usize; 4], Vec3); 6] = [
    ([0, 4, 2, 6], Vec3::new(-1.0, 0.0, 0.0)),
    ([1, 3, 5, 7], Vec3::new(1.0, 0.0, 0.0)),
    ([0, 1, 4, 5], Vec3::new(0.0, -1.0, 0.0)),
    ([2, 6, 3, 7], Vec3::new(0.0, 1.0, 0.0)),
    ([0, 2, 1, 3], Vec3::new(0.0, 0.0, -1.0)),
    ([4, 5, 6, 7], Vec3::new(0.0, 0.0, 1.0)),
];

/// Corner of the `[-1, 1]` cube selected by the bits of `i` (x = bit 0,
/// y = bit 1, z = bit 2).
fn octant(i: usize) -> Vec3 {
    let sign = |bit: usize| if i & bit != 0 { 1.0 } else { -1.0 };
    Vec3::new(sign(1), sign(2), sign(4))
}

impl Mesh {
    /// A `[-1, 1]` square in the XY plane facing +Z, split into
    /// `detail_x * detail_y` quads of two triangles each.
    ///
    /// Vertices are laid out row by row from the bottom-left corner, so a
    /// 1x1 plane has 4 vertices and 2 triangles.
    pub fn plane<B: Backend + ?Sized>(
        backend: &mut B,
        detail_x: u32,
        detail_y: u32,
        options: MeshOptions,
    ) -> Result<Mesh> {
        let detail_x = detail_x.max(1);
        let detail_y = detail_y.max(1);
        let mut mesh = Mesh::new(MeshOptions {
            triangles: true,
            ..options
        });

        for y in 0..=detail_y {
            let t = y as f32 / detail_y as f32;
            for x in 0..=detail_x {
                let s = x as f32 / detail_x as f32;
                mesh.positions.push(Vec3::new(2.0 * s - 1.0, 2.0 * t - 1.0, 0.0));
                if let Some(coords) = &mut mesh.coords {
                    coords.push([s, t]);
                }
                if let Some(normals) = &mut mesh.normals {
                    normals.push(Vec3::Z);
                }
                if let Some(colors) = &mut mesh.colors {
                    colors.push(WHITE.to_vec());
                }
                if x < detail_x && y < detail_y {
                    let i = x + y * (detail_x + 1);
                    let triangles = mesh.triangles.get_or_insert_with(Vec::new);
                    triangles.push([i, i + 1, i + detail_x + 1]);
                    triangles.push([i + detail_x + 1, i + 1, i + detail_x + 2]);
                }
            }
        }

        finish(backend, mesh, options)
    }

    /// A `[-1, 1]` cube with 4 unshared vertices per face (24 total) and 12
    /// triangles, so each face can carry its own normal and texture square.
    pub fn cube<B: Backend + ?Sized>(backend: &mut B, options: MeshOptions) -> Result<Mesh> {
        let mut mesh = Mesh::new(MeshOptions {
            triangles: true,
            ..options
        });

        for (face, (corners, normal)) in CUBE_FACES.iter().enumerate() {
            let base = face as u32 * 4;
            for (j, &corner) in corners.iter().enumerate() {
                mesh.positions.push(octant(corner));
                if let Some(coords) = &mut mesh.coords {
                    coords.push([(j & 1) as f32, ((j & 2) / 2) as f32]);
                }
                if let Some(normals) = &mut mesh.normals {
                    normals.push(*normal);
                }
                if let Some(colors) = &mut mesh.colors {
                    colors.push(WHITE.to_vec());
                }
            }
            let triangles = mesh.triangles.get_or_insert_with(Vec::new);
            triangles.push([base, base + 1, base + 2]);
            triangles.push([base + 2, base + 1, base + 3]);
        }

        finish(backend, mesh, options)
    }
}

/// Derives the line array if requested, then compiles.
fn finish<B: Backend + ?Sized>(backend: &mut B, mut mesh: Mesh, options: MeshOptions) -> Result<Mesh> {
    if options.lines {
        mesh.compute_wireframe(backend)?;
    } else {
        mesh.compile(backend)?;
    }
    Ok(mesh)
}
