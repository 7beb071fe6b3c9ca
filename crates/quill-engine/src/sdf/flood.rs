//! Stage 2: jump-flood propagation.
//!
//! `jfa_passes` passes with steps `2^(k-1)` down to 1. Each pass reads
//! [`PingPong::current`] and writes [`PingPong::other`], then the two swap; the
//! converged map ends up in `current`.

use super::ctx::{
    compute_pipeline, field_pass, field_storage_entry, field_texture_entry, params_entry,
    quad_field_pipeline, stage_module, ParamsBuffer, QuadBuffers, StageCtx, NO_SEED,
};
use super::{Backend, PingPong, SdfError, StageKey, TrackedTexture};

const SHADER: &str = include_str!("shaders/flood.wgsl");

pub(crate) struct FloodCompute {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl FloodCompute {
    pub fn build(device: &wgpu::Device) -> Self {
        let module = stage_module(device, "quill flood shader", SHADER);
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quill flood bgl"),
            entries: &[
                params_entry(0, wgpu::ShaderStages::COMPUTE, true),
                field_texture_entry(1, wgpu::ShaderStages::COMPUTE),
                field_storage_entry(2),
            ],
        });
        let pipeline = compute_pipeline(device, "quill flood pipeline", &module, &layout, "cs_flood");
        Self { layout, pipeline }
    }
}

pub(crate) struct FloodFragment {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
}

impl FloodFragment {
    pub fn build(device: &wgpu::Device) -> Self {
        let module = stage_module(device, "quill flood shader", SHADER);
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quill flood quad bgl"),
            entries: &[
                params_entry(0, wgpu::ShaderStages::FRAGMENT, true),
                field_texture_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let pipeline = quad_field_pipeline(device, "quill flood quad pipeline", &module, &layout, "fs_flood");
        Self { layout, pipeline }
    }
}

pub(crate) fn prepare(ctx: &StageCtx<'_>, backend: Backend) -> Result<(), SdfError> {
    match backend {
        Backend::Compute => {
            ctx.programs
                .get_or_try_init(StageKey::FloodCompute, || Ok(FloodCompute::build(ctx.device())))?;
        }
        Backend::Fragment => {
            ctx.programs
                .get_or_try_init(StageKey::FloodFragment, || Ok(FloodFragment::build(ctx.device())))?;
            QuadBuffers::get(ctx)?;
        }
    }
    Ok(())
}

/// Runs every flood pass over `seeds` and returns the converged nearest-seed map.
///
/// The seed texture becomes the first source buffer; the scratch buffer is
/// released before returning.
pub(crate) fn propagate(
    ctx: &StageCtx<'_>,
    params: &ParamsBuffer,
    seeds: TrackedTexture,
) -> Result<TrackedTexture, SdfError> {
    let mut encoder = ctx.encoder("quill flood encoder");

    let buffers = match ctx.config.backend {
        Backend::Compute => {
            let program = ctx
                .programs
                .get_or_try_init(StageKey::FloodCompute, || Ok(FloodCompute::build(ctx.device())))?;
            let scratch = ctx.field_texture(
                "quill flood texture",
                wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
            );
            let mut buffers = PingPong::new(seeds, scratch);
            let groups = ctx.texel_workgroups();

            for pass in 0..params.passes {
                let src = buffers.current().view();
                let dst = buffers.other().view();
                let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("quill flood bind group"),
                    layout: &program.layout,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: params.slot_binding() },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&src),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(&dst),
                        },
                    ],
                });

                let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("quill flood pass"),
                    timestamp_writes: None,
                });
                cpass.set_pipeline(&program.pipeline);
                cpass.set_bind_group(0, &bind_group, &[params.pass_offset(pass)]);
                cpass.dispatch_workgroups(groups, groups, 1);
                drop(cpass);

                buffers.swap();
            }
            buffers
        }
        Backend::Fragment => {
            let program = ctx
                .programs
                .get_or_try_init(StageKey::FloodFragment, || Ok(FloodFragment::build(ctx.device())))?;
            let quad = QuadBuffers::get(ctx)?;
            let scratch = ctx.field_texture(
                "quill flood texture",
                wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
            );
            let mut buffers = PingPong::new(seeds, scratch);

            for pass in 0..params.passes {
                let src = buffers.current().view();
                let dst = buffers.other().view();
                let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("quill flood quad bind group"),
                    layout: &program.layout,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: params.slot_binding() },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&src),
                        },
                    ],
                });

                let mut rpass = field_pass(&mut encoder, "quill flood quad pass", &dst, NO_SEED);
                rpass.set_pipeline(&program.pipeline);
                rpass.set_bind_group(0, &bind_group, &[params.pass_offset(pass)]);
                quad.draw(&mut rpass);
                drop(rpass);

                buffers.swap();
            }
            buffers
        }
    };

    ctx.submit_and_wait("flood", encoder.finish())?;
    log::trace!("flood: {} passes, {} swaps", params.passes, buffers.swaps());

    let (converged, _scratch) = buffers.into_parts();
    Ok(converged)
}
