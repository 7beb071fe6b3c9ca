use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use wgpu::util::DeviceExt;

/// Counts the per-stroke textures and buffers a component allocates.
///
/// Every allocation goes through the tracker and comes back wrapped in a handle
/// that destroys the GPU object on drop, so an early return or an unwinding pass
/// releases everything it had created.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    created: AtomicUsize,
    live: AtomicUsize,
}

impl ResourceTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Total allocations since construction.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Acquire)
    }

    /// Allocations not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    fn acquire(&self) {
        self.created.fetch_add(1, Ordering::AcqRel);
        self.live.fetch_add(1, Ordering::AcqRel);
    }

    fn release(&self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn texture(
        self: &Arc<Self>,
        device: &wgpu::Device,
        desc: &wgpu::TextureDescriptor<'_>,
    ) -> TrackedTexture {
        let texture = device.create_texture(desc);
        self.acquire();
        TrackedTexture {
            texture,
            tracker: Arc::clone(self),
        }
    }

    pub(crate) fn buffer_init(
        self: &Arc<Self>,
        device: &wgpu::Device,
        desc: &wgpu::util::BufferInitDescriptor<'_>,
    ) -> TrackedBuffer {
        let buffer = device.create_buffer_init(desc);
        self.acquire();
        TrackedBuffer {
            buffer,
            tracker: Arc::clone(self),
        }
    }
}

/// Texture that is destroyed and un-counted when dropped.
#[derive(Debug)]
pub struct TrackedTexture {
    texture: wgpu::Texture,
    tracker: Arc<ResourceTracker>,
}

impl TrackedTexture {
    pub fn view(&self) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}

impl Deref for TrackedTexture {
    type Target = wgpu::Texture;
    fn deref(&self) -> &wgpu::Texture {
        &self.texture
    }
}

impl Drop for TrackedTexture {
    fn drop(&mut self) {
        self.texture.destroy();
        self.tracker.release();
    }
}

/// Buffer that is destroyed and un-counted when dropped.
#[derive(Debug)]
pub struct TrackedBuffer {
    buffer: wgpu::Buffer,
    tracker: Arc<ResourceTracker>,
}

impl Deref for TrackedBuffer {
    type Target = wgpu::Buffer;
    fn deref(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

impl Drop for TrackedBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
        self.tracker.release();
    }
}
