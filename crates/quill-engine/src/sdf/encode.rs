//! Stage 3: distance encoding.
//!
//! For each texel, the exact distance from its center to the segment of the edge
//! its resolved seed came from, signed by the edge's inside flag and divided by
//! `distance_spread`. Texels without a usable seed get a far sentinel.

use super::ctx::{
    compute_pipeline, edges_entry, field_pass, field_storage_entry, field_texture_entry, params_entry,
    quad_field_pipeline, stage_module, ParamsBuffer, QuadBuffers, StageCtx,
};
use super::{Backend, SdfError, StageKey, TrackedTexture};

const SHADER: &str = include_str!("shaders/encode.wgsl");

/// Normalized distance written where no edge resolves (matches `FAR_DISTANCE` in WGSL).
pub const FAR_DISTANCE: f32 = 1.0e4;

pub(crate) struct EncodeCompute {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl EncodeCompute {
    pub fn build(device: &wgpu::Device) -> Self {
        let module = stage_module(device, "quill encode shader", SHADER);
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quill encode bgl"),
            entries: &[
                params_entry(0, wgpu::ShaderStages::COMPUTE, false),
                edges_entry(1, wgpu::ShaderStages::COMPUTE),
                field_texture_entry(2, wgpu::ShaderStages::COMPUTE),
                field_storage_entry(3),
            ],
        });
        let pipeline = compute_pipeline(device, "quill encode pipeline", &module, &layout, "cs_encode");
        Self { layout, pipeline }
    }
}

pub(crate) struct EncodeFragment {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
}

impl EncodeFragment {
    pub fn build(device: &wgpu::Device) -> Self {
        let module = stage_module(device, "quill encode shader", SHADER);
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quill encode quad bgl"),
            entries: &[
                params_entry(0, wgpu::ShaderStages::FRAGMENT, false),
                edges_entry(1, wgpu::ShaderStages::FRAGMENT),
                field_texture_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let pipeline =
            quad_field_pipeline(device, "quill encode quad pipeline", &module, &layout, "fs_encode");
        Self { layout, pipeline }
    }
}

pub(crate) fn prepare(ctx: &StageCtx<'_>, backend: Backend) -> Result<(), SdfError> {
    match backend {
        Backend::Compute => {
            ctx.programs
                .get_or_try_init(StageKey::EncodeCompute, || Ok(EncodeCompute::build(ctx.device())))?;
        }
        Backend::Fragment => {
            ctx.programs
                .get_or_try_init(StageKey::EncodeFragment, || Ok(EncodeFragment::build(ctx.device())))?;
            QuadBuffers::get(ctx)?;
        }
    }
    Ok(())
}

/// Encodes the normalized signed distance of every texel of `nearest`.
pub(crate) fn encode(
    ctx: &StageCtx<'_>,
    params: &ParamsBuffer,
    nearest: &TrackedTexture,
    edges: &wgpu::Buffer,
) -> Result<TrackedTexture, SdfError> {
    let mut encoder = ctx.encoder("quill encode encoder");
    let nearest_view = nearest.view();

    let distance = match ctx.config.backend {
        Backend::Compute => {
            let program = ctx
                .programs
                .get_or_try_init(StageKey::EncodeCompute, || Ok(EncodeCompute::build(ctx.device())))?;
            let distance = ctx.field_texture(
                "quill distance texture",
                wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
            );
            let view = distance.view();

            let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("quill encode bind group"),
                layout: &program.layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: params.slot_binding() },
                    wgpu::BindGroupEntry { binding: 1, resource: edges.as_entire_binding() },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&nearest_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                ],
            });

            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("quill encode pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(&program.pipeline);
            cpass.set_bind_group(0, &bind_group, &[]);
            let groups = ctx.texel_workgroups();
            cpass.dispatch_workgroups(groups, groups, 1);
            drop(cpass);

            distance
        }
        Backend::Fragment => {
            let program = ctx
                .programs
                .get_or_try_init(StageKey::EncodeFragment, || Ok(EncodeFragment::build(ctx.device())))?;
            let quad = QuadBuffers::get(ctx)?;
            let distance = ctx.field_texture(
                "quill distance texture",
                wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
            );
            let view = distance.view();

            let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("quill encode quad bind group"),
                layout: &program.layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: params.slot_binding() },
                    wgpu::BindGroupEntry { binding: 1, resource: edges.as_entire_binding() },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&nearest_view),
                    },
                ],
            });

            let far = f64::from(FAR_DISTANCE);
            let clear = wgpu::Color { r: far, g: far, b: far, a: 1.0 };
            let mut rpass = field_pass(&mut encoder, "quill encode quad pass", &view, clear);
            rpass.set_pipeline(&program.pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            quad.draw(&mut rpass);
            drop(rpass);

            distance
        }
    };

    ctx.submit(encoder.finish());
    Ok(distance)
}
