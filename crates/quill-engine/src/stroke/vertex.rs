use bytemuck::{Pod, Zeroable};

use crate::coords::{Bounds, Vec2};

/// Polygon mesh vertex produced by the stroke-geometry stage (24 bytes).
///
///  offset  0  position  [f32; 2]   loc 0  stroke-local px
///  offset  8  uv        [f32; 2]   loc 1  normalized over the bounds square
///  offset 16  aux       [f32; 2]   (not read by the rasterizer)
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct StrokeVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub aux: [f32; 2],
}

impl StrokeVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2  // uv
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StrokeVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    /// Vertex at `position` with its UV derived from `bounds`.
    ///
    /// UVs address the distance raster, which covers the square of side
    /// `bounds.square_extent()` anchored at `bounds.min`.
    pub fn at(position: Vec2, bounds: Bounds) -> Self {
        let extent = bounds.square_extent();
        Self {
            position: position.to_array(),
            uv: [
                (position.x - bounds.min.x) / extent,
                (position.y - bounds.min.y) / extent,
            ],
            aux: [0.0; 2],
        }
    }

    /// Two triangles covering `rect` (counter-clockwise), with UVs relative to `bounds`.
    pub fn quad(rect: Bounds, bounds: Bounds) -> [StrokeVertex; 6] {
        let tl = Self::at(rect.min, bounds);
        let tr = Self::at(Vec2::new(rect.max.x, rect.min.y), bounds);
        let br = Self::at(rect.max, bounds);
        let bl = Self::at(Vec2::new(rect.min.x, rect.max.y), bounds);
        [tl, bl, br, tl, br, tr]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uv_is_relative_to_square_extent() {
        let bounds = Bounds::new(10.0, 0.0, 110.0, 50.0);
        let v = StrokeVertex::at(Vec2::new(60.0, 50.0), bounds);
        assert_eq!(v.uv, [0.5, 0.5]);
    }

    #[test]
    fn quad_covers_rect_corners() {
        let bounds = Bounds::new(0.0, 0.0, 8.0, 8.0);
        let q = StrokeVertex::quad(bounds, bounds);
        assert!(q.iter().any(|v| v.uv == [1.0, 1.0]));
        assert!(q.iter().any(|v| v.uv == [0.0, 0.0]));
        assert_eq!(std::mem::size_of::<StrokeVertex>(), 24);
    }
}
