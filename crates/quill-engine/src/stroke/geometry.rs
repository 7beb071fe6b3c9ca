use wgpu::util::DeviceExt;

use crate::coords::Bounds;
use crate::device::Gpu;

use super::{Edge, StrokeVertex};

/// Borrowed view of one stroke's prepared GPU geometry.
///
/// The buffers come from the stroke-geometry producer. The edge buffer must carry
/// `STORAGE` usage (both backends read it as a storage buffer) and `VERTEX` usage
/// when the fragment backend is used (seeds are drawn as instanced points).
#[derive(Debug, Copy, Clone)]
pub struct StrokeGeometry<'a> {
    pub edges: Option<&'a wgpu::Buffer>,
    pub edge_count: u32,
    pub vertices: Option<&'a wgpu::Buffer>,
    pub vertex_count: u32,
    /// Stroke-local bounding box; the output texture is anchored at `bounds.min`.
    pub bounds: Bounds,
}

/// CPU-side stroke geometry uploaded to the GPU.
///
/// Stands in for the external stroke-to-geometry stage in tools, tests and demos.
pub struct GpuStroke {
    edges: wgpu::Buffer,
    edge_count: u32,
    vertices: wgpu::Buffer,
    vertex_count: u32,
    bounds: Bounds,
}

impl GpuStroke {
    pub const EDGE_USAGE: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE
        .union(wgpu::BufferUsages::VERTEX)
        .union(wgpu::BufferUsages::COPY_DST);

    /// Uploads `edges` and `vertices`.
    ///
    /// Empty slices still produce (4-byte) buffers so the handle stays valid; the
    /// counts record the real lengths.
    pub fn upload(gpu: &Gpu, edges: &[Edge], vertices: &[StrokeVertex], bounds: Bounds) -> Self {
        let device = gpu.device();

        let edge_bytes: &[u8] = if edges.is_empty() { &[0; 4] } else { bytemuck::cast_slice(edges) };
        let vertex_bytes: &[u8] =
            if vertices.is_empty() { &[0; 4] } else { bytemuck::cast_slice(vertices) };

        let edges_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quill stroke edges"),
            contents: edge_bytes,
            usage: Self::EDGE_USAGE,
        });
        let vertices_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quill stroke vertices"),
            contents: vertex_bytes,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            edges: edges_buf,
            edge_count: edges.len() as u32,
            vertices: vertices_buf,
            vertex_count: vertices.len() as u32,
            bounds,
        }
    }

    pub fn geometry(&self) -> StrokeGeometry<'_> {
        StrokeGeometry {
            edges: Some(&self.edges),
            edge_count: self.edge_count,
            vertices: Some(&self.vertices),
            vertex_count: self.vertex_count,
            bounds: self.bounds,
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

impl Drop for GpuStroke {
    fn drop(&mut self) {
        self.edges.destroy();
        self.vertices.destroy();
    }
}
