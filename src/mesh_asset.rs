//! OBJ mesh loading.
//!
//! Models are loaded from Wavefront OBJ files with their MTL materials.
//! Normals are taken from the file when present and generated by
//! area-weighted averaging otherwise. Tangents are always derived from the
//! UV layout so every mesh shares one vertex format with the ground plane.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use glam::{Vec2, Vec3};

use crate::gpu::mesh::Vertex;

/// Axis-aligned bounding box for a mesh.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        if vertices.is_empty() {
            return Self::default();
        }

        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];

        for v in vertices {
            for i in 0..3 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }

        Self { min, max }
    }

    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// A loaded mesh with geometry ready for upload.
#[derive(Debug, Clone)]
pub struct MeshAsset {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub bounds: BoundingBox,
    /// Diffuse texture path from the first MTL material, resolved relative
    /// to the OBJ file. None when the model carries no texture.
    pub diffuse_texture: Option<PathBuf>,
}

impl MeshAsset {
    /// Load an OBJ file and its materials from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let load_options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };

        let (models, materials) = tobj::load_obj(path, &load_options)
            .with_context(|| format!("failed to load OBJ {}", path.display()))?;

        let diffuse_texture = match materials {
            Ok(materials) => materials
                .iter()
                .find_map(|m| m.diffuse_texture.clone())
                .map(|tex| {
                    path.parent()
                        .map(|dir| dir.join(&tex))
                        .unwrap_or_else(|| PathBuf::from(tex))
                }),
            Err(e) => {
                log::warn!("ignoring materials for {}: {}", path.display(), e);
                None
            }
        };

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut asset = Self::from_models(name, &models)?;
        asset.diffuse_texture = diffuse_texture;
        Ok(asset)
    }

    /// Parse a mesh from OBJ text. Materials are ignored.
    pub fn from_obj_str(name: &str, obj_content: &str) -> Result<Self> {
        let mut cursor = std::io::Cursor::new(obj_content.as_bytes());

        let load_options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };

        let (models, _materials) =
            tobj::load_obj_buf(&mut cursor, &load_options, |_| Ok((vec![], HashMap::new())))
                .context("failed to parse OBJ")?;

        Self::from_models(name.to_string(), &models)
    }

    fn from_models(name: String, models: &[tobj::Model]) -> Result<Self> {
        if models.is_empty() {
            bail!("OBJ file contains no models");
        }

        // Combine all submeshes into one vertex/index pair
        let mut positions: Vec<Vec3> = Vec::new();
        let mut normals: Vec<Vec3> = Vec::new();
        let mut uvs: Vec<Vec2> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut has_normals = true;

        for model in models {
            let mesh = &model.mesh;
            if mesh.positions.is_empty() {
                continue;
            }

            let base = positions.len() as u32;
            let vertex_count = mesh.positions.len() / 3;
            let model_has_normals = mesh.normals.len() == mesh.positions.len();
            let model_has_uvs = mesh.texcoords.len() == vertex_count * 2;
            if !model_has_normals {
                has_normals = false;
            }

            for i in 0..vertex_count {
                positions.push(Vec3::new(
                    mesh.positions[i * 3],
                    mesh.positions[i * 3 + 1],
                    mesh.positions[i * 3 + 2],
                ));
                if model_has_normals {
                    normals.push(Vec3::new(
                        mesh.normals[i * 3],
                        mesh.normals[i * 3 + 1],
                        mesh.normals[i * 3 + 2],
                    ));
                }
                if model_has_uvs {
                    uvs.push(Vec2::new(mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]));
                } else {
                    uvs.push(Vec2::ZERO);
                }
            }

            indices.extend(mesh.indices.iter().map(|&i| base + i));
        }

        if positions.is_empty() {
            bail!("OBJ file contains no vertices");
        }

        let normals = if has_normals && normals.len() == positions.len() {
            normals
        } else {
            compute_vertex_normals(&positions, &indices)
        };

        let tangents = compute_tangents(&positions, &uvs, &normals, &indices);

        let vertices: Vec<Vertex> = positions
            .iter()
            .zip(normals.iter())
            .zip(uvs.iter())
            .zip(tangents.iter())
            .map(|(((p, n), uv), t)| Vertex {
                position: p.to_array(),
                normal: n.to_array(),
                uv: uv.to_array(),
                tangent: t.to_array(),
            })
            .collect();

        let bounds = BoundingBox::from_vertices(&vertices);

        Ok(Self {
            name,
            vertices,
            indices,
            bounds,
            diffuse_texture: None,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Area-weighted vertex normals from face normals.
///
/// The cross product of the edge vectors is left unnormalized so larger
/// triangles contribute proportionally more to each vertex.
fn compute_vertex_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks(3) {
        if tri.len() != 3 {
            continue;
        }
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }

        let face_normal =
            (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);
        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }

    normals
        .into_iter()
        .map(|n| {
            if n.length() > 1e-6 {
                n.normalize()
            } else {
                Vec3::Y
            }
        })
        .collect()
}

/// Per-vertex tangents derived from the UV gradient of each triangle,
/// accumulated and then orthogonalized against the vertex normal.
fn compute_tangents(
    positions: &[Vec3],
    uvs: &[Vec2],
    normals: &[Vec3],
    indices: &[u32],
) -> Vec<Vec3> {
    let mut tangents = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks(3) {
        if tri.len() != 3 {
            continue;
        }
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }

        let e1 = positions[i1] - positions[i0];
        let e2 = positions[i2] - positions[i0];
        let duv1 = uvs[i1] - uvs[i0];
        let duv2 = uvs[i2] - uvs[i0];

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() < 1e-8 {
            continue;
        }
        let f = 1.0 / det;
        let tangent = (e1 * duv2.y - e2 * duv1.y) * f;

        tangents[i0] += tangent;
        tangents[i1] += tangent;
        tangents[i2] += tangent;
    }

    tangents
        .iter()
        .zip(normals.iter())
        .map(|(&t, &n)| {
            // Gram-Schmidt against the normal; fall back to an arbitrary
            // perpendicular axis for meshes without usable UVs
            let t = t - n * n.dot(t);
            if t.length() > 1e-6 {
                t.normalize()
            } else {
                n.any_orthonormal_vector()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3";

    #[test]
    fn test_obj_parsing() {
        let asset = MeshAsset::from_obj_str("tri", TRIANGLE_OBJ).unwrap();
        assert_eq!(asset.vertices.len(), 3);
        assert_eq!(asset.indices.len(), 3);
        assert_eq!(asset.triangle_count(), 1);
    }

    #[test]
    fn test_generated_normals_face_forward() {
        // CCW triangle in the xy plane, no normals in the file
        let asset = MeshAsset::from_obj_str("tri", TRIANGLE_OBJ).unwrap();
        for v in &asset.vertices {
            assert!((v.normal[2] - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_tangents_unit_length_and_orthogonal() {
        let asset = MeshAsset::from_obj_str("tri", TRIANGLE_OBJ).unwrap();
        for v in &asset.vertices {
            let t = Vec3::from_array(v.tangent);
            let n = Vec3::from_array(v.normal);
            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!(t.dot(n).abs() < 1e-5);
        }
    }

    #[test]
    fn test_bounding_box() {
        let asset = MeshAsset::from_obj_str("tri", TRIANGLE_OBJ).unwrap();
        assert_eq!(asset.bounds.min, [0.0, 0.0, 0.0]);
        assert_eq!(asset.bounds.max, [1.0, 1.0, 0.0]);
        assert_eq!(asset.bounds.center(), [0.5, 0.5, 0.0]);
        assert_eq!(asset.bounds.size(), [1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_empty_obj_fails() {
        assert!(MeshAsset::from_obj_str("empty", "").is_err());
    }
}
