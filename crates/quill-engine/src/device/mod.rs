//! Headless GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue without a window
//! - observing device loss
//! - copying textures back to the CPU for inspection

mod gpu;
mod init;
pub mod readback;

pub use gpu::Gpu;
pub use init::GpuInit;
