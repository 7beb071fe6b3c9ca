//! Coordinate and geometry types shared by the stroke pipeline.
//!
//! Two spaces are in play:
//! - stroke-local pixels: where edges, vertices and bounds are produced
//! - raster texels: the fixed square grid the distance field is computed on
//!
//! Both have their origin top-left with +X right and +Y down.

mod bounds;
mod vec2;

pub use bounds::Bounds;
pub use vec2::Vec2;
