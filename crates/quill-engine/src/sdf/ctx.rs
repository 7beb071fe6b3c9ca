use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use wgpu::util::DeviceExt;

use crate::coords::{Bounds, Vec2};
use crate::device::Gpu;
use crate::render::common::{cleared_attachment, QUAD_INDICES, QUAD_VERTICES};

use super::config::jfa_steps;
use super::{ProgramCache, ResourceTracker, SdfConfig, SdfError, StageKey, TrackedBuffer};

/// Texture format of the seed / flood / distance textures.
///
/// Seeds carry raw sub-texel coordinates plus an edge index, so they need full
/// 32-bit floats; the distance texture shares the format (value replicated in rgb).
pub(crate) const FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Texel-grid workgroup side (8×8 invocations).
pub(crate) const TEXEL_WORKGROUP: u32 = 8;

/// Edge workgroup size (one invocation per edge).
pub(crate) const EDGE_WORKGROUP: u32 = 64;

/// Mapping from stroke-local pixels to raster texels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RasterTransform {
    /// Stroke-local point mapped to raster (0, 0).
    pub origin: Vec2,
    /// Raster texels per stroke-local pixel.
    pub scale: f32,
}

impl RasterTransform {
    /// The raster covers the square of side `bounds.square_extent()` at `bounds.min`.
    pub fn fit(bounds: Bounds, resolution: u32) -> Self {
        Self {
            origin: bounds.min,
            scale: resolution as f32 / bounds.square_extent(),
        }
    }

    #[inline]
    pub fn to_raster(&self, p: Vec2) -> Vec2 {
        (p - self.origin) * self.scale
    }
}

/// Uniform shared by the seed, flood and encode stages (32 bytes).
///
///  offset  0  size        [u32; 2]
///  offset  8  edge_count  u32
///  offset 12  step        u32      (flood passes only)
///  offset 16  origin      [f32; 2]
///  offset 24  scale       f32
///  offset 28  spread      f32
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct RasterParams {
    pub size: [u32; 2],
    pub edge_count: u32,
    pub step: u32,
    pub origin: [f32; 2],
    pub scale: f32,
    pub spread: f32,
}

/// One uniform buffer holding the base `RasterParams` in slot 0 and one slot per
/// flood pass, each aligned for dynamic offsets.
pub(crate) struct ParamsBuffer {
    pub buffer: TrackedBuffer,
    pub stride: u64,
    pub passes: u32,
}

impl ParamsBuffer {
    pub fn new(
        ctx: &StageCtx<'_>,
        transform: RasterTransform,
        edge_count: u32,
    ) -> Self {
        let device = ctx.gpu.device();
        let align = u64::from(device.limits().min_uniform_buffer_offset_alignment).max(1);
        let size = std::mem::size_of::<RasterParams>() as u64;
        let stride = size.div_ceil(align) * align;

        let base = RasterParams {
            size: [ctx.config.resolution; 2],
            edge_count,
            step: 0,
            origin: transform.origin.to_array(),
            scale: transform.scale,
            spread: ctx.config.distance_spread,
        };

        let passes = ctx.config.jfa_passes;
        let slots = std::iter::once(0).chain(jfa_steps(passes));
        let mut bytes = vec![0u8; (stride * (u64::from(passes) + 1)) as usize];
        for (i, step) in slots.enumerate() {
            let at = i * stride as usize;
            let params = RasterParams { step, ..base };
            bytes[at..at + size as usize].copy_from_slice(bytemuck::bytes_of(&params));
        }

        let buffer = ctx.tracker.buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("quill raster params"),
                contents: &bytes,
                usage: wgpu::BufferUsages::UNIFORM,
            },
        );

        Self { buffer, stride, passes }
    }

    /// Binding of a single slot (used with a dynamic offset for flood passes).
    pub fn slot_binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: crate::render::common::uniform_binding_size::<RasterParams>(),
        })
    }

    /// Dynamic offset of the flood pass `pass` (0-based).
    pub fn pass_offset(&self, pass: u32) -> u32 {
        ((u64::from(pass) + 1) * self.stride) as u32
    }
}

/// Everything a stage needs to record its pass.
pub(crate) struct StageCtx<'a> {
    pub gpu: &'a Gpu,
    pub programs: &'a ProgramCache,
    pub config: &'a SdfConfig,
    pub tracker: &'a Arc<ResourceTracker>,
}

impl StageCtx<'_> {
    pub fn device(&self) -> &wgpu::Device {
        self.gpu.device()
    }

    /// A `resolution`² texture in the field format.
    pub fn field_texture(&self, label: &str, usage: wgpu::TextureUsages) -> super::TrackedTexture {
        self.tracker.texture(
            self.device(),
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: crate::render::common::square_extent(self.config.resolution),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: FIELD_FORMAT,
                usage,
                view_formats: &[],
            },
        )
    }

    pub fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Workgroups covering the raster with `TEXEL_WORKGROUP`² tiles.
    pub fn texel_workgroups(&self) -> u32 {
        self.config.resolution.div_ceil(TEXEL_WORKGROUP)
    }

    pub fn submit(&self, commands: wgpu::CommandBuffer) {
        self.gpu.queue().submit(std::iter::once(commands));
    }

    /// Submits the commands closing a key stage (seed, flood, render) and blocks
    /// on completion when `wait_for_completion` is set.
    ///
    /// Without the wait, intermediates dropped right after submission are still
    /// safe to destroy: wgpu frees a destroyed resource only once the
    /// submissions using it have completed.
    pub fn submit_and_wait(&self, stage: &str, commands: wgpu::CommandBuffer) -> Result<(), SdfError> {
        self.submit(commands);
        if self.config.wait_for_completion {
            self.gpu.wait_idle()?;
            log::trace!("{stage} complete");
        }
        Ok(())
    }
}

/// Bind group layout entry for a non-filterable float texture read with `textureLoad`.
pub(crate) fn field_texture_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Bind group layout entry for a write-only field storage texture.
pub(crate) fn field_storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: FIELD_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
        count: None,
    }
}

/// Bind group layout entry for the read-only edge storage buffer.
pub(crate) fn edges_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Bind group layout entry for the `RasterParams` uniform.
pub(crate) fn params_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    dynamic: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: crate::render::common::uniform_binding_size::<RasterParams>(),
        },
        count: None,
    }
}

/// Shader module built from the shared WGSL prelude plus a stage body.
pub(crate) fn stage_module(device: &wgpu::Device, label: &str, body: &str) -> wgpu::ShaderModule {
    let source = format!("{}\n{}", include_str!("shaders/common.wgsl"), body);
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

/// Compute pipeline over a single bind group layout.
pub(crate) fn compute_pipeline(
    device: &wgpu::Device,
    label: &str,
    module: &wgpu::ShaderModule,
    layout: &wgpu::BindGroupLayout,
    entry_point: &str,
) -> wgpu::ComputePipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        module,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}

/// Fragment pipeline drawing the unit quad into a field-format target (no blending).
pub(crate) fn quad_field_pipeline(
    device: &wgpu::Device,
    label: &str,
    module: &wgpu::ShaderModule,
    layout: &wgpu::BindGroupLayout,
    fragment_entry: &str,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_quad"),
            compilation_options: Default::default(),
            buffers: &[crate::render::common::QuadVertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: FIELD_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Clear value of seed textures: edge index -1 marks "no seed".
pub(crate) const NO_SEED: wgpu::Color = wgpu::Color { r: 0.0, g: 0.0, b: -1.0, a: 0.0 };

/// Unit quad shared by every fragment-backend field pass.
pub(crate) struct QuadBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

impl QuadBuffers {
    pub fn get(ctx: &StageCtx<'_>) -> Result<Arc<Self>, SdfError> {
        ctx.programs.get_or_try_init(StageKey::Quad, || {
            let device = ctx.device();
            Ok(Self {
                vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("quill quad vbo"),
                    contents: bytemuck::cast_slice(&QUAD_VERTICES),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("quill quad ibo"),
                    contents: bytemuck::cast_slice(&QUAD_INDICES),
                    usage: wgpu::BufferUsages::INDEX,
                }),
            })
        })
    }

    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_vertex_buffer(0, self.vertices.slice(..));
        rpass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
    }
}

/// Render pass writing a whole field texture, cleared to `clear` first.
pub(crate) fn field_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
    clear: wgpu::Color,
) -> wgpu::RenderPass<'e> {
    encoder
        .begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(cleared_attachment(view, None, clear))],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_params_are_32_bytes() {
        assert_eq!(std::mem::size_of::<RasterParams>(), 32);
    }

    #[test]
    fn transform_fits_longer_side_to_resolution() {
        let t = RasterTransform::fit(Bounds::new(0.0, -50.0, 100.0, 50.0), 256);
        assert_eq!(t.scale, 2.56);
        let p = t.to_raster(Vec2::new(100.0, 0.0));
        assert!((p.x - 256.0).abs() < 1e-4);
        assert!((p.y - 128.0).abs() < 1e-4);
    }
}
