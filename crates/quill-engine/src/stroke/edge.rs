use bytemuck::{Pod, Zeroable};

use crate::coords::Vec2;

/// One directed line segment of a stroke outline, as stored in the edge buffer.
///
/// Layout (32 bytes, matches `Edge` in the WGSL stages):
///
///  offset  0  x0, y0        [f32; 2]
///  offset  8  x1, y1        [f32; 2]
///  offset 16  edge_id       u32
///  offset 20  channel_id    u32
///  offset 24  inside_flag   f32   (±1, multiplies the distance)
///  offset 28  _pad          u32
///
/// When bound as an instanced vertex buffer (fragment backend) the attributes are
/// `0 => Float32x4` (both endpoints) and `1 => Uint32x2` (ids).
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Edge {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    /// Producer's identifier, carried through for callers.
    ///
    /// The GPU stages never read it: seeds store the edge's index in the buffer,
    /// and that index alone selects the segment the encoder measures against.
    pub edge_id: u32,
    pub channel_id: u32,
    pub inside_flag: f32,
    pub _pad: u32,
}

impl Edge {
    /// Edge with `inside_flag = +1` on channel 0.
    pub fn new(edge_id: u32, from: Vec2, to: Vec2) -> Self {
        Self {
            x0: from.x,
            y0: from.y,
            x1: to.x,
            y1: to.y,
            edge_id,
            channel_id: 0,
            inside_flag: 1.0,
            _pad: 0,
        }
    }

    pub fn with_inside_flag(mut self, flag: f32) -> Self {
        self.inside_flag = if flag < 0.0 { -1.0 } else { 1.0 };
        self
    }

    pub fn with_channel(mut self, channel_id: u32) -> Self {
        self.channel_id = channel_id;
        self
    }

    #[inline]
    pub fn start(&self) -> Vec2 {
        Vec2::new(self.x0, self.y0)
    }

    #[inline]
    pub fn end(&self) -> Vec2 {
        Vec2::new(self.x1, self.y1)
    }

    #[inline]
    pub fn midpoint(&self) -> Vec2 {
        self.start().lerp(self.end(), 0.5)
    }

    /// Same edge with the inside flag negated.
    pub fn flipped(self) -> Self {
        let flag = -self.inside_flag;
        self.with_inside_flag(flag)
    }

    pub(crate) const INSTANCE_ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x4, // x0, y0, x1, y1
        1 => Uint32x2   // edge_id, channel_id
    ];

    /// Edge buffer bound as a per-instance vertex stream (one instance per edge).
    pub(crate) fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Edge>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::INSTANCE_ATTRS,
        }
    }
}

/// Builds edges for an open polyline, numbering them in buffer order.
pub fn polyline_edges(points: &[Vec2]) -> Vec<Edge> {
    points
        .windows(2)
        .enumerate()
        .map(|(i, pair)| Edge::new(i as u32, pair[0], pair[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_32_bytes() {
        assert_eq!(std::mem::size_of::<Edge>(), 32);
    }

    #[test]
    fn flag_is_normalized_to_unit_sign() {
        let e = Edge::new(0, Vec2::zero(), Vec2::new(1.0, 0.0)).with_inside_flag(-7.0);
        assert_eq!(e.inside_flag, -1.0);
        assert_eq!(e.flipped().inside_flag, 1.0);
    }

    #[test]
    fn polyline_numbers_edges_in_order() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0), Vec2::new(4.0, 3.0)];
        let edges = polyline_edges(&pts);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].edge_id, 1);
        assert_eq!(edges[1].start(), Vec2::new(4.0, 0.0));
        assert_eq!(edges[0].midpoint(), Vec2::new(2.0, 0.0));
    }

    #[test]
    fn polyline_of_one_point_has_no_edges() {
        assert!(polyline_edges(&[Vec2::zero()]).is_empty());
    }
}
