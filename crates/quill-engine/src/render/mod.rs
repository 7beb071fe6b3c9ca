//! Stroke renderers and the fallback chain over them.
//!
//! The distance-field pipeline (`crate::sdf`) is the primary strategy; the
//! direct polygon fill is the non-antialiased fallback.

mod chain;
pub(crate) mod common;
mod fill;

pub use chain::{RendererChain, StrokeRenderer};
pub use fill::PolygonFillRenderer;
