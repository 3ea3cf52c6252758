//! Vertex formats and built-in geometry.
//!
//! Every lit surface shares one vertex layout (position, normal, uv,
//! tangent). The skybox uses a position-only layout since it samples a
//! cubemap by direction. Post-process passes draw a fullscreen triangle
//! generated in the vertex shader and need no buffer at all.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
}

impl Vertex {
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 24,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: 32,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Position-only layout for the skybox cube.
pub fn skybox_vertex_desc<'a>() -> wgpu::VertexBufferLayout<'a> {
    wgpu::VertexBufferLayout {
        array_stride: (std::mem::size_of::<f32>() * 3) as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

/// Geometry uploaded to the GPU, drawn with an index buffer.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(
        device: &wgpu::Device,
        label: &str,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }
}

fn quad_tangent(positions: [Vec3; 3], uvs: [Vec2; 3]) -> Vec3 {
    let e1 = positions[1] - positions[0];
    let e2 = positions[2] - positions[0];
    let duv1 = uvs[1] - uvs[0];
    let duv2 = uvs[2] - uvs[0];
    let f = 1.0 / (duv1.x * duv2.y - duv2.x * duv1.y);
    ((e1 * duv2.y - e2 * duv1.y) * f).normalize()
}

/// The ground plane: a 2x2 quad in the xy plane facing +z, with tangents
/// derived from the UV gradient for normal and parallax mapping. The scene
/// transform rotates it flat.
pub fn create_floor_geometry() -> (Vec<Vertex>, Vec<u32>) {
    let positions = [
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
    ];
    let uvs = [
        Vec2::new(0.0, 1.0),
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
    ];
    let normal = Vec3::Z;

    let t1 = quad_tangent(
        [positions[0], positions[1], positions[2]],
        [uvs[0], uvs[1], uvs[2]],
    );
    let t2 = quad_tangent(
        [positions[0], positions[2], positions[3]],
        [uvs[0], uvs[2], uvs[3]],
    );

    let vertex = |i: usize, t: Vec3| Vertex {
        position: positions[i].to_array(),
        normal: normal.to_array(),
        uv: uvs[i].to_array(),
        tangent: t.to_array(),
    };

    // Two triangles with per-triangle tangents, matching the UV winding
    let vertices = vec![
        vertex(0, t1),
        vertex(1, t1),
        vertex(2, t1),
        vertex(0, t2),
        vertex(2, t2),
        vertex(3, t2),
    ];
    let indices = vec![0, 1, 2, 3, 4, 5];
    (vertices, indices)
}

/// A single foliage card: a unit-height quad facing +z with the texture's
/// y axis flipped to match the source image orientation.
pub fn create_foliage_geometry() -> (Vec<Vertex>, Vec<u32>) {
    let corners: [([f32; 3], [f32; 2]); 4] = [
        ([0.0, 0.5, 0.0], [0.0, 0.0]),
        ([0.0, -0.5, 0.0], [0.0, 1.0]),
        ([1.0, -0.5, 0.0], [1.0, 1.0]),
        ([1.0, 0.5, 0.0], [1.0, 0.0]),
    ];
    let vertices = corners
        .iter()
        .map(|&(position, uv)| Vertex {
            position,
            normal: [0.0, 0.0, 1.0],
            uv,
            tangent: [1.0, 0.0, 0.0],
        })
        .collect();
    let indices = vec![0, 1, 2, 0, 2, 3];
    (vertices, indices)
}

/// Skybox cube positions, 36 vertices, faces pointing inward.
pub fn create_skybox_positions() -> Vec<[f32; 3]> {
    const S: f32 = 1.0;
    vec![
        // -z face
        [-S, S, -S], [-S, -S, -S], [S, -S, -S],
        [S, -S, -S], [S, S, -S], [-S, S, -S],
        // -x face
        [-S, -S, S], [-S, -S, -S], [-S, S, -S],
        [-S, S, -S], [-S, S, S], [-S, -S, S],
        // +x face
        [S, -S, -S], [S, -S, S], [S, S, S],
        [S, S, S], [S, S, -S], [S, -S, -S],
        // +z face
        [-S, -S, S], [-S, S, S], [S, S, S],
        [S, S, S], [S, -S, S], [-S, -S, S],
        // +y face
        [-S, S, -S], [S, S, -S], [S, S, S],
        [S, S, S], [-S, S, S], [-S, S, -S],
        // -y face
        [-S, -S, -S], [-S, -S, S], [S, -S, -S],
        [S, -S, -S], [-S, -S, S], [S, -S, S],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 44);
        let desc = Vertex::desc();
        assert_eq!(desc.array_stride, 44);
        assert_eq!(desc.attributes.len(), 4);
    }

    #[test]
    fn test_floor_tangents_orthogonal_to_normal() {
        let (vertices, indices) = create_floor_geometry();
        assert_eq!(indices.len(), 6);
        for v in &vertices {
            let t = Vec3::from_array(v.tangent);
            let n = Vec3::from_array(v.normal);
            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!(t.dot(n).abs() < 1e-5);
        }
    }

    #[test]
    fn test_floor_tangent_follows_u_axis() {
        let (vertices, _) = create_floor_geometry();
        // u grows with +x on this quad, so tangents point along +x
        for v in &vertices {
            assert!((v.tangent[0] - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_skybox_cube() {
        let positions = create_skybox_positions();
        assert_eq!(positions.len(), 36);
        for p in &positions {
            for c in p {
                assert_eq!(c.abs(), 1.0);
            }
        }
    }

    #[test]
    fn test_foliage_quad() {
        let (vertices, indices) = create_foliage_geometry();
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices.len(), 6);
        // Texture v is flipped relative to quad y
        assert_eq!(vertices[0].uv, [0.0, 0.0]);
        assert_eq!(vertices[1].uv, [0.0, 1.0]);
    }
}
