//! Distance-field stroke rasterizer.
//!
//! A stroke's edges are turned into a signed distance field by jump flooding on
//! the GPU, then the stroke's footprint mesh is drawn with coverage taken from a
//! smoothstep band over that field:
//!
//! 1. seed: endpoints and midpoint of every edge become seeds
//! 2. flood: nearest-seed propagation, ping-ponging two textures
//! 3. encode: exact distance to each texel's resolved edge
//! 4. polygon: threshold the field over the mesh into the output texture
//!
//! [`DistanceFieldPipeline`] sequences the stages and owns the program cache.
//! Stages 1–3 run either as compute kernels or as fragment passes
//! ([`Backend`]); [`reference`] holds a CPU rendition used as a test oracle.

mod config;
mod ctx;
mod encode;
mod error;
mod field;
mod flood;
mod ping_pong;
mod pipeline;
mod polygon;
mod programs;
pub mod reference;
mod resources;
mod seed;
mod texture;

pub use config::{jfa_passes_for, jfa_steps, Backend, SdfConfig, MAX_JFA_PASSES};
pub use ctx::RasterTransform;
pub use encode::FAR_DISTANCE;
pub use error::SdfError;
pub use field::DistanceField;
pub use ping_pong::PingPong;
pub use pipeline::DistanceFieldPipeline;
pub(crate) use pipeline::guarded;
pub use programs::{ProgramCache, StageKey};
pub use resources::{ResourceTracker, TrackedBuffer, TrackedTexture};
pub use texture::StrokeTexture;
