//! Stage 1: seed initialization.
//!
//! Every edge contributes three seeds (start, midpoint, end) carrying their raw
//! raster coordinates and the edge's buffer index. Texels nobody writes keep the
//! "no seed" marker. Edges landing on the same texel race; any winner is a valid
//! seed for the flood stage.

use crate::stroke::Edge;

use super::ctx::{
    compute_pipeline, edges_entry, field_pass, field_storage_entry, params_entry, stage_module,
    ParamsBuffer, StageCtx, EDGE_WORKGROUP, FIELD_FORMAT, NO_SEED,
};
use super::{Backend, SdfError, StageKey, TrackedTexture};

const SHADER: &str = include_str!("shaders/seed.wgsl");

/// Clear + scatter kernels (compute backend).
pub(crate) struct SeedCompute {
    layout: wgpu::BindGroupLayout,
    clear: wgpu::ComputePipeline,
    scatter: wgpu::ComputePipeline,
}

impl SeedCompute {
    pub fn build(device: &wgpu::Device) -> Self {
        let module = stage_module(device, "quill seed shader", SHADER);
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quill seed bgl"),
            entries: &[
                params_entry(0, wgpu::ShaderStages::COMPUTE, false),
                edges_entry(1, wgpu::ShaderStages::COMPUTE),
                field_storage_entry(2),
            ],
        });
        let clear = compute_pipeline(device, "quill seed clear", &module, &layout, "cs_clear");
        let scatter = compute_pipeline(device, "quill seed scatter", &module, &layout, "cs_seed");
        Self { layout, clear, scatter }
    }
}

/// Seed points drawn as a point list, one instance per edge (fragment backend).
pub(crate) struct SeedFragment {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
}

impl SeedFragment {
    pub fn build(device: &wgpu::Device) -> Self {
        let module = stage_module(device, "quill seed shader", SHADER);
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quill seed points bgl"),
            entries: &[params_entry(0, wgpu::ShaderStages::VERTEX, false)],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quill seed points pipeline layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quill seed points pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_seed"),
                compilation_options: Default::default(),
                buffers: &[Edge::instance_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_seed"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: FIELD_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
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

        Self { layout, pipeline }
    }
}

/// Builds (or fetches) the seed program of `backend`.
pub(crate) fn prepare(ctx: &StageCtx<'_>, backend: Backend) -> Result<(), SdfError> {
    match backend {
        Backend::Compute => {
            ctx.programs
                .get_or_try_init(StageKey::SeedCompute, || Ok(SeedCompute::build(ctx.device())))?;
        }
        Backend::Fragment => {
            ctx.programs
                .get_or_try_init(StageKey::SeedFragment, || Ok(SeedFragment::build(ctx.device())))?;
        }
    }
    Ok(())
}

/// Writes the seeds of the first `edge_count` edges into a fresh seed texture.
pub(crate) fn seed_init(
    ctx: &StageCtx<'_>,
    params: &ParamsBuffer,
    edges: &wgpu::Buffer,
    edge_count: u32,
) -> Result<TrackedTexture, SdfError> {
    let mut encoder = ctx.encoder("quill seed encoder");

    let seeds = match ctx.config.backend {
        Backend::Compute => {
            let program = ctx
                .programs
                .get_or_try_init(StageKey::SeedCompute, || Ok(SeedCompute::build(ctx.device())))?;

            let seeds = ctx.field_texture(
                "quill seed texture",
                wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
            );
            let view = seeds.view();

            let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("quill seed bind group"),
                layout: &program.layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: params.slot_binding() },
                    wgpu::BindGroupEntry { binding: 1, resource: edges.as_entire_binding() },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                ],
            });

            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("quill seed pass"),
                timestamp_writes: None,
            });
            cpass.set_bind_group(0, &bind_group, &[]);

            let groups = ctx.texel_workgroups();
            cpass.set_pipeline(&program.clear);
            cpass.dispatch_workgroups(groups, groups, 1);

            cpass.set_pipeline(&program.scatter);
            cpass.dispatch_workgroups(edge_count.div_ceil(EDGE_WORKGROUP), 1, 1);
            drop(cpass);

            seeds
        }
        Backend::Fragment => {
            let program = ctx
                .programs
                .get_or_try_init(StageKey::SeedFragment, || Ok(SeedFragment::build(ctx.device())))?;

            let seeds = ctx.field_texture(
                "quill seed texture",
                wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
            );
            let view = seeds.view();

            let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("quill seed points bind group"),
                layout: &program.layout,
                entries: &[wgpu::BindGroupEntry { binding: 0, resource: params.slot_binding() }],
            });

            let edge_bytes = u64::from(edge_count) * std::mem::size_of::<Edge>() as u64;
            let mut rpass = field_pass(&mut encoder, "quill seed points pass", &view, NO_SEED);
            rpass.set_pipeline(&program.pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.set_vertex_buffer(0, edges.slice(..edge_bytes));
            rpass.draw(0..3, 0..edge_count);
            drop(rpass);

            seeds
        }
    };

    ctx.submit_and_wait("seed", encoder.finish())?;
    Ok(seeds)
}
