//! Procedural CPU geometry for the primitive shapes the scene format
//! supports. Kept separate from GPU upload so the generators can be
//! tested headless.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};

use crate::scene::ShapeDef;

/// 3D vertex for mesh rendering.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex3D {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// CPU-side mesh ready for upload.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn from_shape(shape: &ShapeDef) -> Self {
        match shape {
            ShapeDef::Box { size } => cuboid(size[0], size[1], size[2]),
            ShapeDef::Sphere { diameter } => uv_sphere(diameter / 2.0, 24, 32),
            ShapeDef::Capsule { height, radius } => capsule(*height, *radius, 16, 24),
            ShapeDef::Ground { width, depth } => ground_plane(*width, *depth),
        }
    }
}

/// Axis-aligned cuboid centered on the origin, flat normals per face.
pub fn cuboid(width: f32, height: f32, depth: f32) -> MeshData {
    let (hw, hh, hd) = (width / 2.0, height / 2.0, depth / 2.0);

    // (normal, four corners, CCW seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [[-hw, -hh, hd], [hw, -hh, hd], [hw, hh, hd], [-hw, hh, hd]],
        ),
        (
            [0.0, 0.0, -1.0],
            [[hw, -hh, -hd], [-hw, -hh, -hd], [-hw, hh, -hd], [hw, hh, -hd]],
        ),
        (
            [0.0, 1.0, 0.0],
            [[-hw, hh, hd], [hw, hh, hd], [hw, hh, -hd], [-hw, hh, -hd]],
        ),
        (
            [0.0, -1.0, 0.0],
            [[-hw, -hh, -hd], [hw, -hh, -hd], [hw, -hh, hd], [-hw, -hh, hd]],
        ),
        (
            [1.0, 0.0, 0.0],
            [[hw, -hh, hd], [hw, -hh, -hd], [hw, hh, -hd], [hw, hh, hd]],
        ),
        (
            [-1.0, 0.0, 0.0],
            [[-hw, -hh, -hd], [-hw, -hh, hd], [-hw, hh, hd], [-hw, hh, -hd]],
        ),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, corners) in &faces {
        let base = vertices.len() as u32;
        for corner in corners {
            vertices.push(Vertex3D {
                position: *corner,
                normal: *normal,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData { vertices, indices }
}

/// UV sphere centered on the origin.
pub fn uv_sphere(radius: f32, rings: u32, sectors: u32) -> MeshData {
    let mut vertices = Vec::new();

    for ring in 0..=rings {
        let theta = PI * ring as f32 / rings as f32;
        push_lat_ring(&mut vertices, theta, radius, 0.0, sectors);
    }

    let indices = stitch_rings(rings + 1, sectors);
    MeshData { vertices, indices }
}

/// Capsule along the y axis. `height` is the total height including the
/// caps; the cylinder section degenerates when `height <= 2 * radius`.
pub fn capsule(height: f32, radius: f32, rings: u32, sectors: u32) -> MeshData {
    let half_cyl = (height / 2.0 - radius).max(0.0);
    let half_rings = rings.max(2) / 2;

    let mut vertices = Vec::new();

    // Upper hemisphere, shifted up by the cylinder half-height. The
    // equator ring is emitted by both halves; the duplicated pair forms
    // the cylinder wall.
    for ring in 0..=half_rings {
        let theta = PI / 2.0 * ring as f32 / half_rings as f32;
        push_lat_ring(&mut vertices, theta, radius, half_cyl, sectors);
    }
    for ring in 0..=half_rings {
        let theta = PI / 2.0 + PI / 2.0 * ring as f32 / half_rings as f32;
        push_lat_ring(&mut vertices, theta, radius, -half_cyl, sectors);
    }

    let indices = stitch_rings(2 * (half_rings + 1), sectors);
    MeshData { vertices, indices }
}

/// One latitude ring of a sphere at polar angle `theta`, vertically
/// shifted by `y_offset`.
fn push_lat_ring(vertices: &mut Vec<Vertex3D>, theta: f32, radius: f32, y_offset: f32, sectors: u32) {
    let (sin_theta, cos_theta) = theta.sin_cos();
    for sector in 0..=sectors {
        let phi = 2.0 * PI * sector as f32 / sectors as f32;
        let (sin_phi, cos_phi) = phi.sin_cos();

        let nx = sin_theta * cos_phi;
        let ny = cos_theta;
        let nz = sin_theta * sin_phi;

        vertices.push(Vertex3D {
            position: [radius * nx, radius * ny + y_offset, radius * nz],
            normal: [nx, ny, nz],
        });
    }
}

/// Triangulate consecutive latitude rings of `sectors + 1` vertices each.
fn stitch_rings(ring_count: u32, sectors: u32) -> Vec<u32> {
    let mut indices = Vec::new();
    for ring in 0..ring_count - 1 {
        for sector in 0..sectors {
            let curr_row = ring * (sectors + 1);
            let next_row = (ring + 1) * (sectors + 1);

            // CCW winding when viewed from outside
            indices.push(curr_row + sector);
            indices.push(next_row + sector + 1);
            indices.push(next_row + sector);

            indices.push(curr_row + sector);
            indices.push(curr_row + sector + 1);
            indices.push(next_row + sector + 1);
        }
    }
    indices
}

/// Flat ground quad at y = 0, normal up, centered on the origin.
pub fn ground_plane(width: f32, depth: f32) -> MeshData {
    let (hw, hd) = (width / 2.0, depth / 2.0);
    let up = [0.0, 1.0, 0.0];

    let vertices = vec![
        Vertex3D {
            position: [-hw, 0.0, -hd],
            normal: up,
        },
        Vertex3D {
            position: [-hw, 0.0, hd],
            normal: up,
        },
        Vertex3D {
            position: [hw, 0.0, hd],
            normal: up,
        },
        Vertex3D {
            position: [hw, 0.0, -hd],
            normal: up,
        },
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];

    MeshData { vertices, indices }
}
