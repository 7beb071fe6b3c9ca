use crate::coords::{Bounds, Vec2};
use crate::device::{readback, Gpu};

use super::TrackedTexture;

/// Rendered stroke returned to the caller.
///
/// The texture covers the square of side [`extent`](Self::extent) anchored at the
/// stroke bounds' minimum corner; [`width`](Self::width) × [`height`](Self::height)
/// is the texel size, which need not match the stroke's bounding box. Dropping
/// (or [`release`](Self::release)-ing) the handle destroys the texture.
#[derive(Debug)]
pub struct StrokeTexture {
    texture: TrackedTexture,
    width: u32,
    height: u32,
    origin: Vec2,
    extent: f32,
}

impl StrokeTexture {
    pub(crate) fn new(texture: TrackedTexture, bounds: Bounds) -> Self {
        let width = texture.width();
        let height = texture.height();
        Self {
            texture,
            width,
            height,
            origin: bounds.min,
            extent: bounds.square_extent(),
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> wgpu::TextureView {
        self.texture.view()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }

    /// Stroke-local position of the texture's top-left corner.
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Stroke-local side length the texture covers.
    pub fn extent(&self) -> f32 {
        self.extent
    }

    /// Reads the texels back as tightly packed rows in the texture's format.
    pub fn read_pixels(&self, gpu: &Gpu) -> anyhow::Result<Vec<u8>> {
        readback::read_texture(gpu, &self.texture)
    }

    /// Destroys the texture.
    pub fn release(self) {
        drop(self);
    }
}
