use std::collections::HashMap;

use wgpu::util::DeviceExt;

use manikin_core::components::MeshHandle;

use crate::primitives::MeshData;
use crate::scene::ShapeDef;

/// A mesh uploaded to the GPU.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// Shape key for deduplication. ShapeDef holds floats, so the cache keys
/// on the bit patterns of the dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ShapeKey {
    Box([u32; 3]),
    Sphere(u32),
    Capsule(u32, u32),
    Ground(u32, u32),
}

impl ShapeKey {
    fn from_shape(shape: &ShapeDef) -> Self {
        match shape {
            ShapeDef::Box { size } => {
                Self::Box([size[0].to_bits(), size[1].to_bits(), size[2].to_bits()])
            }
            ShapeDef::Sphere { diameter } => Self::Sphere(diameter.to_bits()),
            ShapeDef::Capsule { height, radius } => {
                Self::Capsule(height.to_bits(), radius.to_bits())
            }
            ShapeDef::Ground { width, depth } => Self::Ground(width.to_bits(), depth.to_bits()),
        }
    }
}

/// Cache of uploaded procedural meshes, keyed by shape.
pub struct MeshCache {
    meshes: Vec<GpuMesh>,
    shape_to_handle: HashMap<ShapeKey, MeshHandle>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            shape_to_handle: HashMap::new(),
        }
    }

    pub fn get_or_create(&mut self, device: &wgpu::Device, shape: &ShapeDef) -> MeshHandle {
        let key = ShapeKey::from_shape(shape);
        if let Some(&handle) = self.shape_to_handle.get(&key) {
            return handle;
        }

        let data = MeshData::from_shape(shape);
        let gpu_mesh = upload(device, &data, &format!("{:?}", shape));

        let handle = MeshHandle(self.meshes.len());
        self.meshes.push(gpu_mesh);
        self.shape_to_handle.insert(key, handle);
        tracing::info!(
            "Generated mesh {:?}: {} verts, {} indices",
            shape,
            data.vertices.len(),
            data.indices.len()
        );
        handle
    }

    pub fn get(&self, handle: MeshHandle) -> &GpuMesh {
        &self.meshes[handle.0]
    }
}

impl Default for MeshCache {
    fn default() -> Self {
        Self::new()
    }
}

fn upload(device: &wgpu::Device, data: &MeshData, label: &str) -> GpuMesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("Mesh VB: {}", label)),
        contents: bytemuck::cast_slice(&data.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("Mesh IB: {}", label)),
        contents: bytemuck::cast_slice(&data.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: data.indices.len() as u32,
    }
}
