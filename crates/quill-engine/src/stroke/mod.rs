//! Stroke inputs consumed by the rasterizer.
//!
//! The stroke-geometry producer (outside this crate) turns pointer samples into an
//! edge buffer plus a triangulated footprint mesh; these are the types it emits.

mod edge;
mod geometry;
mod settings;
mod vertex;

pub use edge::{polyline_edges, Edge};
pub use geometry::{GpuStroke, StrokeGeometry};
pub use settings::{RenderSettings, StrokeMode};
pub use vertex::StrokeVertex;
