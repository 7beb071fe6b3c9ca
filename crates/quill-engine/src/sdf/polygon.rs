//! Stage 4: polygon rendering.
//!
//! Draws the stroke's footprint mesh into the output texture. The fragment stage
//! samples the distance field at the vertex UV and converts it to coverage with a
//! smoothstep band around the threshold.

use bytemuck::{Pod, Zeroable};

use crate::coords::Bounds;
use crate::render::common::{cleared_attachment, square_extent, stroke_alpha_blend, uniform_binding_size};
use crate::stroke::{RenderSettings, StrokeVertex};

use super::ctx::{field_texture_entry, RasterTransform, StageCtx};
use super::{SdfError, StageKey, TrackedTexture};

/// Render-stage uniform (48 bytes).
///
///  offset  0  color       [f32; 4]  straight rgba
///  offset 16  origin      [f32; 2]
///  offset 24  extent      f32
///  offset 28  opacity     f32
///  offset 32  threshold   f32
///  offset 36  band        f32
///  offset 40  half_width  f32       normalized distance units
///  offset 44  mode        u32
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct PolygonParams {
    pub color: [f32; 4],
    pub origin: [f32; 2],
    pub extent: f32,
    pub opacity: f32,
    pub threshold: f32,
    pub band: f32,
    pub half_width: f32,
    pub mode: u32,
}

impl PolygonParams {
    pub fn new(
        settings: &RenderSettings,
        bounds: Bounds,
        transform: RasterTransform,
        threshold: f32,
        band: f32,
        spread: f32,
    ) -> Self {
        Self {
            color: settings.color.to_straight_array(),
            origin: bounds.min.to_array(),
            extent: bounds.square_extent(),
            opacity: settings.clamped_opacity(),
            threshold,
            band,
            half_width: settings.size * 0.5 * transform.scale / spread,
            mode: settings.mode.shader_code(),
        }
    }
}

pub(crate) struct PolygonProgram {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
}

impl PolygonProgram {
    pub fn build(device: &wgpu::Device, format: wgpu::TextureFormat, sample_count: u32) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quill polygon shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/polygon.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quill polygon bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: uniform_binding_size::<PolygonParams>(),
                    },
                    count: None,
                },
                field_texture_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quill polygon pipeline layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quill polygon pipeline"),
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
                    format,
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
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        Self { layout, pipeline }
    }
}

pub(crate) fn prepare(ctx: &StageCtx<'_>, format: wgpu::TextureFormat) -> Result<(), SdfError> {
    ctx.programs.get_or_try_init(StageKey::Polygon, || {
        Ok(PolygonProgram::build(ctx.device(), format, ctx.config.sample_count))
    })?;
    Ok(())
}

/// Output texture of `format`, `resolution`² texels.
pub(crate) fn output_texture(ctx: &StageCtx<'_>, format: wgpu::TextureFormat, sample_count: u32) -> TrackedTexture {
    let label = if sample_count > 1 { "quill stroke msaa texture" } else { "quill stroke texture" };
    let usage = if sample_count > 1 {
        wgpu::TextureUsages::RENDER_ATTACHMENT
    } else {
        wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
    };
    ctx.tracker.texture(
        ctx.device(),
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: square_extent(ctx.config.resolution),
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        },
    )
}

/// Draws `vertex_count` vertices of the footprint mesh over a transparent target.
#[allow(clippy::too_many_arguments)]
pub(crate) fn render(
    ctx: &StageCtx<'_>,
    format: wgpu::TextureFormat,
    distance: &TrackedTexture,
    vertices: &wgpu::Buffer,
    vertex_count: u32,
    bounds: Bounds,
    transform: RasterTransform,
    settings: &RenderSettings,
) -> Result<TrackedTexture, SdfError> {
    let program = ctx.programs.get_or_try_init(StageKey::Polygon, || {
        Ok(PolygonProgram::build(ctx.device(), format, ctx.config.sample_count))
    })?;

    let params = PolygonParams::new(
        settings,
        bounds,
        transform,
        ctx.config.threshold,
        ctx.config.band,
        ctx.config.distance_spread,
    );
    let ubo = ctx.tracker.buffer_init(
        ctx.device(),
        &wgpu::util::BufferInitDescriptor {
            label: Some("quill polygon ubo"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        },
    );

    let output = output_texture(ctx, format, 1);
    let output_view = output.view();

    // Multisampled intermediate, resolved into `output` at the end of the pass.
    let msaa = (ctx.config.sample_count > 1).then(|| output_texture(ctx, format, ctx.config.sample_count));
    let msaa_view = msaa.as_ref().map(|t| t.view());

    let (view, resolve_target) = match msaa_view.as_ref() {
        Some(msaa_view) => (msaa_view, Some(&output_view)),
        None => (&output_view, None),
    };

    let distance_view = distance.view();
    let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("quill polygon bind group"),
        layout: &program.layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&distance_view),
            },
        ],
    });

    let mut encoder = ctx.encoder("quill polygon encoder");
    {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("quill polygon pass"),
            color_attachments: &[Some(cleared_attachment(view, resolve_target, wgpu::Color::TRANSPARENT))],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let vertex_bytes = u64::from(vertex_count) * std::mem::size_of::<StrokeVertex>() as u64;
        rpass.set_pipeline(&program.pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.set_vertex_buffer(0, vertices.slice(..vertex_bytes));
        rpass.draw(0..vertex_count, 0..1);
    }

    ctx.submit_and_wait("render", encoder.finish())?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;

    #[test]
    fn polygon_params_are_48_bytes() {
        assert_eq!(std::mem::size_of::<PolygonParams>(), 48);
    }

    #[test]
    fn half_width_is_normalized_by_spread() {
        let bounds = Bounds::new(0.0, -50.0, 100.0, 50.0);
        let transform = RasterTransform::fit(bounds, 256);
        let settings = RenderSettings::pen(10.0, 0x800000, 1.0);
        let p = PolygonParams::new(&settings, bounds, transform, 0.0, 0.03, 32.0);

        // 5 px * 2.56 texel/px / 32 texel/unit
        assert!((p.half_width - 0.4).abs() < 1e-6);
        assert_eq!(p.origin, Vec2::new(0.0, -50.0).to_array());
        assert_eq!(p.extent, 100.0);
        assert_eq!(p.mode, 0);
    }

    #[test]
    fn eraser_mode_code_reaches_the_uniform() {
        let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let transform = RasterTransform::fit(bounds, 64);
        let p = PolygonParams::new(&RenderSettings::eraser(2.0, 0.5), bounds, transform, 0.0, 0.03, 32.0);
        assert_eq!(p.mode, 1);
        assert_eq!(p.opacity, 0.5);
    }
}
