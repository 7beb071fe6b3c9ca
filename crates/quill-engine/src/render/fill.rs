use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::device::Gpu;
use crate::sdf::{guarded, ResourceTracker, SdfError, StrokeTexture};
use crate::stroke::{RenderSettings, StrokeGeometry, StrokeVertex};

use super::common::{cleared_attachment, square_extent, stroke_alpha_blend, uniform_binding_size};

/// Fill uniform (48 bytes).
///
///  offset  0  color    [f32; 4]  straight rgba
///  offset 16  origin   [f32; 2]
///  offset 24  extent   f32
///  offset 28  opacity  f32
///  offset 32  mode     u32
///  offset 36  _pad     [u32; 3]
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct FillParams {
    color: [f32; 4],
    origin: [f32; 2],
    extent: f32,
    opacity: f32,
    mode: u32,
    _pad: [u32; 3],
}

/// Direct polygon fill of the footprint mesh: no distance field, hard edges.
///
/// The legacy stroke path, kept as the fallback when the distance-field pipeline
/// is unavailable or rejects a stroke. Output placement matches
/// [`DistanceFieldPipeline`](crate::sdf::DistanceFieldPipeline): a
/// `resolution`² texture covering the stroke bounds' square.
pub struct PolygonFillRenderer {
    gpu: Arc<Gpu>,
    target_format: wgpu::TextureFormat,
    resolution: u32,
    tracker: Arc<ResourceTracker>,

    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
}

impl PolygonFillRenderer {
    pub fn new(gpu: Arc<Gpu>, target_format: wgpu::TextureFormat, resolution: u32) -> Self {
        Self {
            gpu,
            target_format,
            resolution,
            tracker: ResourceTracker::new(),
            pipeline: None,
            bind_group_layout: None,
        }
    }

    pub fn resources(&self) -> &Arc<ResourceTracker> {
        &self.tracker
    }

    pub fn is_available(&self) -> bool {
        !self.gpu.is_lost() && self.resolution > 0
    }

    /// Fills the stroke's mesh; `None` when the mesh is missing or empty, or
    /// when wgpu rejects the draw.
    pub fn render(&mut self, geometry: &StrokeGeometry<'_>, settings: &RenderSettings) -> Option<StrokeTexture> {
        let Some(vertices) = geometry.vertices else {
            log::debug!("PolygonFillRenderer: no vertex buffer");
            return None;
        };
        let needed = u64::from(geometry.vertex_count) * std::mem::size_of::<StrokeVertex>() as u64;
        if geometry.vertex_count == 0 || vertices.size() < needed || !settings.is_valid() || !self.is_available() {
            log::debug!("PolygonFillRenderer: stroke skipped");
            return None;
        }

        match guarded(|| self.fill(geometry, vertices, needed, settings)) {
            Ok(texture) => Some(texture),
            Err(err) => {
                log::warn!("polygon fill failed [{}]: {err}", err.class());
                None
            }
        }
    }

    fn fill(
        &mut self,
        geometry: &StrokeGeometry<'_>,
        vertices: &wgpu::Buffer,
        needed: u64,
        settings: &RenderSettings,
    ) -> Result<StrokeTexture, SdfError> {
        self.ensure_pipeline();
        let (Some(pipeline), Some(bind_group_layout)) = (self.pipeline.as_ref(), self.bind_group_layout.as_ref())
        else {
            return Err(SdfError::pipeline("fill pipeline was not built"));
        };
        let device = self.gpu.device();

        let bounds = geometry.bounds;
        let params = FillParams {
            color: settings.color.to_straight_array(),
            origin: bounds.min.to_array(),
            extent: bounds.square_extent(),
            opacity: settings.clamped_opacity(),
            mode: settings.mode.shader_code(),
            _pad: [0; 3],
        };
        let ubo = self.tracker.buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("quill fill ubo"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            },
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quill fill bind group"),
            layout: bind_group_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() }],
        });

        let output = self.tracker.texture(
            device,
            &wgpu::TextureDescriptor {
                label: Some("quill fill texture"),
                size: square_extent(self.resolution),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: self.target_format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            },
        );
        let view = output.view();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("quill fill encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quill fill pass"),
                color_attachments: &[Some(cleared_attachment(&view, None, wgpu::Color::TRANSPARENT))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.set_vertex_buffer(0, vertices.slice(..needed));
            rpass.draw(0..geometry.vertex_count, 0..1);
        }
        self.gpu.queue().submit(std::iter::once(encoder.finish()));

        Ok(StrokeTexture::new(output, bounds))
    }

    fn ensure_pipeline(&mut self) {
        if self.pipeline.is_some() {
            return;
        }
        let device = self.gpu.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quill fill shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/fill.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quill fill bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: uniform_binding_size::<FillParams>(),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quill fill pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quill fill pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[StrokeVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.target_format,
                    blend: Some(stroke_alpha_blend()),
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
        });

        log::debug!("PolygonFillRenderer: pipeline built for {:?}", self.target_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_params_are_48_bytes() {
        assert_eq!(std::mem::size_of::<FillParams>(), 48);
    }
}
