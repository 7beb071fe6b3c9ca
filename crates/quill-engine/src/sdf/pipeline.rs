use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crate::device::{readback, Gpu};
use crate::stroke::{Edge, RenderSettings, StrokeGeometry, StrokeVertex};

use super::ctx::{ParamsBuffer, RasterTransform, StageCtx, FIELD_FORMAT};
use super::{
    encode, flood, polygon, seed, Backend, DistanceField, ProgramCache, ResourceTracker, SdfConfig,
    SdfError, StrokeTexture,
};

enum State {
    Uninitialized,
    Ready {
        gpu: Arc<Gpu>,
        target_format: wgpu::TextureFormat,
    },
    Disposed,
}

/// Distance-field stroke rasterizer.
///
/// Construct once at application start, [`initialize`](Self::initialize) with
/// the shared [`Gpu`], then hand out `&DistanceFieldPipeline` to every stroke
/// producer. Each call allocates its own intermediate textures and buffers and
/// releases them before returning; only the compiled stage programs persist.
///
/// State machine: `Uninitialized → Ready → Disposed` (terminal).
pub struct DistanceFieldPipeline {
    config: SdfConfig,
    state: State,
    programs: ProgramCache,
    tracker: Arc<ResourceTracker>,
}

impl DistanceFieldPipeline {
    pub fn new(config: SdfConfig) -> Self {
        Self {
            config,
            state: State::Uninitialized,
            programs: ProgramCache::new(),
            tracker: ResourceTracker::new(),
        }
    }

    pub fn config(&self) -> &SdfConfig {
        &self.config
    }

    /// Counters for every texture/buffer this pipeline has allocated.
    pub fn resources(&self) -> &Arc<ResourceTracker> {
        &self.tracker
    }

    pub fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state, State::Disposed)
    }

    /// Validates the configuration against `gpu` and builds the seed program
    /// (every program with `eager_programs`).
    ///
    /// The flood, encode and render programs are otherwise built on first use.
    /// Re-initializing a ready pipeline rebinds it and drops its programs.
    pub fn initialize(&mut self, gpu: Arc<Gpu>, target_format: wgpu::TextureFormat) -> Result<(), SdfError> {
        if self.is_disposed() {
            return Err(SdfError::Disposed);
        }
        if gpu.is_lost() {
            return Err(SdfError::ContextLost);
        }
        self.config.validate()?;
        check_device(&gpu, &self.config, target_format)?;

        if self.config.is_jfa_truncated() {
            log::warn!(
                "jfa_passes = {} is below the {} passes a {}² raster needs; expect seams on sparse strokes",
                self.config.jfa_passes,
                self.config.required_jfa_passes(),
                self.config.resolution
            );
        }

        self.programs.clear();
        {
            let ctx = StageCtx {
                gpu: &gpu,
                programs: &self.programs,
                config: &self.config,
                tracker: &self.tracker,
            };
            guarded(|| {
                seed::prepare(&ctx, self.config.backend)?;
                if self.config.eager_programs {
                    flood::prepare(&ctx, self.config.backend)?;
                    encode::prepare(&ctx, self.config.backend)?;
                    polygon::prepare(&ctx, target_format)?;
                }
                Ok(())
            })?;
        }

        log::info!(
            "distance-field pipeline ready: {}² raster, {} jfa passes, {:?} backend, {:?} output, {}x msaa",
            self.config.resolution,
            self.config.jfa_passes,
            self.config.backend,
            target_format,
            self.config.sample_count
        );

        self.state = State::Ready { gpu, target_format };
        Ok(())
    }

    /// Renders one stroke; `None` on any failure.
    ///
    /// Failures are logged with their class and every resource allocated by the
    /// call is released first. Callers fall back to another renderer on `None`.
    pub fn generate_distance_field(
        &self,
        geometry: &StrokeGeometry<'_>,
        settings: &RenderSettings,
    ) -> Option<StrokeTexture> {
        match self.try_generate(geometry, settings) {
            Ok(texture) => Some(texture),
            Err(err) => {
                log::warn!("distance-field stroke rejected [{}]: {err}", err.class());
                None
            }
        }
    }

    /// [`generate_distance_field`](Self::generate_distance_field) with the reason for failure.
    pub fn try_generate(
        &self,
        geometry: &StrokeGeometry<'_>,
        settings: &RenderSettings,
    ) -> Result<StrokeTexture, SdfError> {
        let (gpu, target_format) = self.ready()?;
        let input = validate_stroke(geometry, settings, self.config.backend)?;
        let vertices = geometry
            .vertices
            .ok_or_else(|| SdfError::invalid("vertex buffer is missing"))?;
        if geometry.vertex_count == 0 {
            return Err(SdfError::invalid("vertex count is zero"));
        }
        check_buffer(
            vertices,
            geometry.vertex_count,
            std::mem::size_of::<StrokeVertex>(),
            "vertex",
            wgpu::BufferUsages::VERTEX,
        )?;

        let started = Instant::now();
        let ctx = self.stage_ctx(gpu);
        let transform = RasterTransform::fit(geometry.bounds, self.config.resolution);

        let output = guarded(|| {
            let params = ParamsBuffer::new(&ctx, transform, input.edge_count);
            let seeds = seed::seed_init(&ctx, &params, input.edges, input.edge_count)?;
            let nearest = flood::propagate(&ctx, &params, seeds)?;
            let distance = encode::encode(&ctx, &params, &nearest, input.edges)?;
            drop(nearest);

            polygon::render(
                &ctx,
                target_format,
                &distance,
                vertices,
                geometry.vertex_count,
                geometry.bounds,
                transform,
                settings,
            )
        })?;

        log::debug!(
            "stroke rendered: {} edges, {} vertices, {:.2?}",
            input.edge_count,
            geometry.vertex_count,
            started.elapsed()
        );
        Ok(StrokeTexture::new(output, geometry.bounds))
    }

    /// Runs the seed, flood and encode stages and reads the distance field back.
    ///
    /// Only the edge buffer is needed; vertex data is ignored.
    pub fn compute_distance_field(&self, geometry: &StrokeGeometry<'_>) -> Result<DistanceField, SdfError> {
        let (gpu, _) = self.ready()?;
        let input = validate_stroke(geometry, &RenderSettings::default(), self.config.backend)?;

        let ctx = self.stage_ctx(gpu);
        let transform = RasterTransform::fit(geometry.bounds, self.config.resolution);

        let bytes = guarded(|| {
            let params = ParamsBuffer::new(&ctx, transform, input.edge_count);
            let seeds = seed::seed_init(&ctx, &params, input.edges, input.edge_count)?;
            let nearest = flood::propagate(&ctx, &params, seeds)?;
            let distance = encode::encode(&ctx, &params, &nearest, input.edges)?;
            Ok(readback::read_texture(gpu, &distance)?)
        })?;

        DistanceField::from_rgba32f(self.config.resolution, &bytes)
            .ok_or_else(|| SdfError::pipeline("distance readback has an unexpected size"))
    }

    /// Drops every program and moves to the terminal disposed state.
    ///
    /// Textures already handed out stay valid until released.
    pub fn destroy(&mut self) {
        if !self.is_disposed() {
            log::debug!("distance-field pipeline destroyed ({} live resources)", self.tracker.live());
        }
        self.programs.clear();
        self.state = State::Disposed;
    }

    /// True when a call right now would reach the GPU stages.
    pub fn is_available(&self) -> bool {
        matches!(&self.state, State::Ready { gpu, .. } if !gpu.is_lost())
    }

    fn ready(&self) -> Result<(&Gpu, wgpu::TextureFormat), SdfError> {
        match &self.state {
            State::Uninitialized => Err(SdfError::NotInitialized),
            State::Disposed => Err(SdfError::Disposed),
            State::Ready { gpu, .. } if gpu.is_lost() => Err(SdfError::ContextLost),
            State::Ready { gpu, target_format } => Ok((gpu.as_ref(), *target_format)),
        }
    }

    fn stage_ctx<'a>(&'a self, gpu: &'a Gpu) -> StageCtx<'a> {
        StageCtx {
            gpu,
            programs: &self.programs,
            config: &self.config,
            tracker: &self.tracker,
        }
    }
}

impl Drop for DistanceFieldPipeline {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Validated edge input of one call.
struct EdgeInput<'a> {
    edges: &'a wgpu::Buffer,
    edge_count: u32,
}

fn validate_stroke<'a>(
    geometry: &StrokeGeometry<'a>,
    settings: &RenderSettings,
    backend: Backend,
) -> Result<EdgeInput<'a>, SdfError> {
    let edges = geometry
        .edges
        .ok_or_else(|| SdfError::invalid("edge buffer is missing"))?;
    if geometry.edge_count == 0 {
        return Err(SdfError::invalid("edge count is zero"));
    }
    if !geometry.bounds.is_finite() || geometry.bounds.is_inverted() {
        return Err(SdfError::invalid(format!("unusable bounds {:?}", geometry.bounds)));
    }
    if !settings.is_valid() {
        return Err(SdfError::invalid(format!("unusable render settings {settings:?}")));
    }

    let mut usage = wgpu::BufferUsages::STORAGE;
    if backend == Backend::Fragment {
        usage |= wgpu::BufferUsages::VERTEX;
    }
    check_buffer(edges, geometry.edge_count, std::mem::size_of::<Edge>(), "edge", usage)?;

    Ok(EdgeInput {
        edges,
        edge_count: geometry.edge_count,
    })
}

fn check_buffer(
    buffer: &wgpu::Buffer,
    count: u32,
    stride: usize,
    what: &str,
    usage: wgpu::BufferUsages,
) -> Result<(), SdfError> {
    let needed = u64::from(count) * stride as u64;
    if buffer.size() < needed {
        return Err(SdfError::invalid(format!(
            "{what} buffer holds {} bytes, {count} records need {needed}",
            buffer.size()
        )));
    }
    if !buffer.usage().contains(usage) {
        return Err(SdfError::invalid(format!(
            "{what} buffer usage {:?} lacks {usage:?}",
            buffer.usage()
        )));
    }
    Ok(())
}

/// Rejects configurations the device cannot run.
fn check_device(gpu: &Gpu, config: &SdfConfig, target_format: wgpu::TextureFormat) -> Result<(), SdfError> {
    let limits = gpu.device().limits();
    if config.resolution > limits.max_texture_dimension_2d {
        return Err(SdfError::config(format!(
            "resolution {} exceeds the device limit {}",
            config.resolution, limits.max_texture_dimension_2d
        )));
    }

    let field = gpu.adapter().get_texture_format_features(FIELD_FORMAT);
    let (field_usage, field_role) = match config.backend {
        Backend::Compute => (wgpu::TextureUsages::STORAGE_BINDING, "storage"),
        Backend::Fragment => (wgpu::TextureUsages::RENDER_ATTACHMENT, "render"),
    };
    if !field.allowed_usages.contains(field_usage) {
        return Err(SdfError::config(format!(
            "{FIELD_FORMAT:?} cannot be a {field_role} target for the {:?} backend on this adapter",
            config.backend
        )));
    }

    let features = gpu.adapter().get_texture_format_features(target_format);
    if !features.allowed_usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
        return Err(SdfError::config(format!("{target_format:?} is not renderable")));
    }
    if !features.flags.contains(wgpu::TextureFormatFeatureFlags::BLENDABLE) {
        return Err(SdfError::config(format!("{target_format:?} is not blendable")));
    }
    if config.sample_count > 1
        && !features
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_X4 | wgpu::TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE)
    {
        return Err(SdfError::config(format!(
            "{target_format:?} does not support {}x multisampling",
            config.sample_count
        )));
    }
    Ok(())
}

/// Runs `f`, turning a panic raised by wgpu validation into `SdfError::Pipeline`.
///
/// Resources created inside `f` are dropped during unwinding, so nothing
/// allocated by a failed call survives it.
pub(crate) fn guarded<T>(f: impl FnOnce() -> Result<T, SdfError>) -> Result<T, SdfError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| payload.downcast_ref::<&str>().copied())
                .unwrap_or("unknown panic");
            Err(SdfError::pipeline(msg.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Bounds;

    fn empty_geometry() -> StrokeGeometry<'static> {
        StrokeGeometry {
            edges: None,
            edge_count: 0,
            vertices: None,
            vertex_count: 0,
            bounds: Bounds::new(0.0, 0.0, 10.0, 10.0),
        }
    }

    #[test]
    fn uninitialized_pipeline_rejects_calls() {
        let pipeline = DistanceFieldPipeline::new(SdfConfig::default());
        let err = pipeline
            .try_generate(&empty_geometry(), &RenderSettings::default())
            .unwrap_err();
        assert_eq!(err, SdfError::NotInitialized);
        assert!(pipeline.generate_distance_field(&empty_geometry(), &RenderSettings::default()).is_none());
        assert_eq!(pipeline.resources().created(), 0);
    }

    #[test]
    fn destroyed_pipeline_stays_disposed() {
        let mut pipeline = DistanceFieldPipeline::new(SdfConfig::default());
        pipeline.destroy();
        assert!(pipeline.is_disposed());
        assert!(!pipeline.is_available());
        let err = pipeline
            .try_generate(&empty_geometry(), &RenderSettings::default())
            .unwrap_err();
        assert_eq!(err, SdfError::Disposed);
        assert_eq!(err.class(), "not-initialized");
    }

    #[test]
    fn guarded_converts_panics() {
        let err = guarded::<()>(|| panic!("validation failed")).unwrap_err();
        assert_eq!(err, SdfError::pipeline("validation failed"));
        assert_eq!(guarded(|| Ok(3)), Ok(3));
    }
}
