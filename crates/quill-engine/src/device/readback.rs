//! Texture → CPU readback.

use std::sync::mpsc;

use anyhow::{Context, Result};

use super::Gpu;

/// Row pitch of a texture copy, padded to wgpu's copy alignment.
pub fn aligned_bytes_per_row(width: u32, bytes_per_texel: u32) -> u32 {
    let unpadded = width * bytes_per_texel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Copies mip 0 of a single-sampled 2D texture into tightly packed bytes.
///
/// The texture must have `COPY_SRC` usage and a format with a fixed block size
/// (no depth/stencil or compressed formats). Blocks until the copy completes.
pub fn read_texture(gpu: &Gpu, texture: &wgpu::Texture) -> Result<Vec<u8>> {
    let format = texture.format();
    let bytes_per_texel = format
        .block_copy_size(None)
        .with_context(|| format!("texture format {format:?} cannot be read back"))?;

    let width = texture.width();
    let height = texture.height();
    let padded_row = aligned_bytes_per_row(width, bytes_per_texel);
    let tight_row = (width * bytes_per_texel) as usize;

    let device = gpu.device();
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("quill readback staging"),
        size: u64::from(padded_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("quill readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    gpu.queue().submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    gpu.wait_idle()?;

    rx.recv()
        .context("readback callback dropped")?
        .context("failed to map readback buffer")?;

    let mut out = Vec::with_capacity(tight_row * height as usize);
    {
        let data = slice.get_mapped_range();
        for row in data.chunks(padded_row as usize).take(height as usize) {
            out.extend_from_slice(&row[..tight_row]);
        }
    }
    staging.unmap();
    staging.destroy();

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(aligned_bytes_per_row(256, 4), 1024);
        assert_eq!(aligned_bytes_per_row(256, 16), 4096);
        assert_eq!(aligned_bytes_per_row(10, 4), 256);
        assert_eq!(aligned_bytes_per_row(65, 4), 512);
    }
}
