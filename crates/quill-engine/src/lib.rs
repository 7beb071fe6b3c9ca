//! Quill engine crate.
//!
//! GPU stroke rasterization for the quill drawing tools: stroke geometry types,
//! the jump-flood distance-field pipeline, its fallback renderers and the
//! headless device plumbing they run on.

pub mod device;
pub mod logging;

pub mod coords;
pub mod paint;
pub mod render;
pub mod sdf;
pub mod stroke;
