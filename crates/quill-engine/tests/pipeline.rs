//! GPU tests for the distance-field pipeline.
//!
//! Each test acquires its own device and returns early when none is available.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use quill_engine::coords::{Bounds, Vec2};
use quill_engine::device::{Gpu, GpuInit};
use quill_engine::logging::{init_logging, LoggingConfig};
use quill_engine::render::{PolygonFillRenderer, RendererChain};
use quill_engine::sdf::{
    reference, Backend, DistanceField, DistanceFieldPipeline, RasterTransform, SdfConfig, SdfError,
    StageKey,
};
use quill_engine::stroke::{polyline_edges, Edge, GpuStroke, RenderSettings, StrokeGeometry, StrokeVertex};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn gpu() -> Option<Arc<Gpu>> {
    init_logging(LoggingConfig::default());
    match Gpu::new_blocking(GpuInit::default()) {
        Ok(gpu) => Some(Arc::new(gpu)),
        Err(err) => {
            eprintln!("no gpu adapter, skipping: {err:#}");
            None
        }
    }
}

fn pipeline(gpu: &Arc<Gpu>, config: SdfConfig) -> DistanceFieldPipeline {
    supported_pipeline(gpu, config).expect("compute backend unsupported by this adapter")
}

/// Initialized pipeline, or `None` when the adapter cannot run the configured backend.
fn supported_pipeline(gpu: &Arc<Gpu>, config: SdfConfig) -> Option<DistanceFieldPipeline> {
    let backend = config.backend;
    let mut pipeline = DistanceFieldPipeline::new(config);
    match pipeline.initialize(Arc::clone(gpu), FORMAT) {
        Ok(()) => Some(pipeline),
        Err(SdfError::Config(msg)) => {
            eprintln!("{backend:?} backend unsupported, skipping: {msg}");
            None
        }
        Err(err) => panic!("initialize failed: {err}"),
    }
}

/// Quad vertex buffer over `bounds`, already destroyed.
fn destroyed_vertices(gpu: &Gpu, bounds: Bounds) -> wgpu::Buffer {
    let buffer = gpu.device().create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("destroyed stroke vertices"),
        contents: bytemuck::cast_slice(&StrokeVertex::quad(bounds, bounds)),
        usage: wgpu::BufferUsages::VERTEX,
    });
    buffer.destroy();
    buffer
}

/// Stroke whose mesh is one quad over its whole bounds.
fn stroke(gpu: &Gpu, edges: &[Edge], bounds: Bounds) -> GpuStroke {
    GpuStroke::upload(gpu, edges, &StrokeVertex::quad(bounds, bounds), bounds)
}

/// The horizontal (0,0)–(100,0) stroke, bounds padded to a 100×100 square.
fn horizontal(gpu: &Gpu) -> GpuStroke {
    let edges = polyline_edges(&[Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)]);
    stroke(gpu, &edges, Bounds::new(0.0, -50.0, 100.0, 50.0))
}

/// Short, well-separated segments in a 64×64 stroke-local box (scale 1 at 64²).
fn scattered(gpu: &Gpu) -> (Vec<Edge>, GpuStroke) {
    let edges = vec![
        Edge::new(0, Vec2::new(10.0, 10.0), Vec2::new(13.0, 11.0)),
        Edge::new(1, Vec2::new(40.0, 8.0), Vec2::new(42.0, 11.0)),
        Edge::new(2, Vec2::new(25.0, 35.0), Vec2::new(28.5, 35.0)),
        Edge::new(3, Vec2::new(50.0, 50.0), Vec2::new(51.0, 53.0)),
        Edge::new(4, Vec2::new(8.0, 50.0), Vec2::new(10.0, 48.0)),
    ];
    let s = stroke(gpu, &edges, Bounds::new(0.0, 0.0, 64.0, 64.0));
    (edges, s)
}

/// Texels whose values differ by more than `tol`.
fn mismatched(a: &DistanceField, b: &DistanceField, tol: f32) -> usize {
    a.values().iter().zip(b.values()).filter(|(x, y)| (*x - *y).abs() > tol).count()
}

fn alpha_at(pixels: &[u8], width: u32, x: u32, y: u32) -> u8 {
    pixels[((y * width + x) * 4 + 3) as usize]
}

#[test]
fn invalid_input_allocates_nothing() {
    let Some(gpu) = gpu() else { return };
    let pipeline = pipeline(&gpu, SdfConfig::with_resolution(64));
    let valid = horizontal(&gpu);
    let settings = RenderSettings::pen(10.0, 0x800000, 1.0);

    let no_edges = StrokeGeometry { edge_count: 0, ..valid.geometry() };
    let no_vertices = StrokeGeometry { vertex_count: 0, ..valid.geometry() };
    let null_vertices = StrokeGeometry { vertices: None, ..valid.geometry() };
    let null_edges = StrokeGeometry { edges: None, ..valid.geometry() };
    let inverted = StrokeGeometry {
        bounds: Bounds::new(100.0, 50.0, 0.0, -50.0),
        ..valid.geometry()
    };

    for geometry in [no_edges, no_vertices, null_vertices, null_edges, inverted] {
        assert!(pipeline.generate_distance_field(&geometry, &settings).is_none());
        assert!(matches!(
            pipeline.try_generate(&geometry, &settings),
            Err(SdfError::InvalidInput(_))
        ));
    }
    assert_eq!(pipeline.resources().created(), 0);
}

#[test]
fn output_has_the_configured_resolution() {
    let Some(gpu) = gpu() else { return };
    for resolution in [32, 100, 256] {
        let pipeline = pipeline(&gpu, SdfConfig::with_resolution(resolution));
        let s = horizontal(&gpu);
        let texture = pipeline
            .generate_distance_field(&s.geometry(), &RenderSettings::pen(10.0, 0x800000, 1.0))
            .unwrap();
        assert_eq!((texture.width(), texture.height()), (resolution, resolution));
        assert_eq!(texture.origin(), Vec2::new(0.0, -50.0));
        assert_eq!(texture.extent(), 100.0);
    }
}

#[test]
fn resources_return_to_zero_after_release() {
    let Some(gpu) = gpu() else { return };
    let pipeline = pipeline(&gpu, SdfConfig::with_resolution(64));
    let s = horizontal(&gpu);
    let settings = RenderSettings::pen(10.0, 0x800000, 1.0);
    let broken = StrokeGeometry { edge_count: 0, ..s.geometry() };

    let mut outputs = Vec::new();
    for i in 0..6 {
        let geometry = if i % 2 == 0 { s.geometry() } else { broken };
        outputs.extend(pipeline.generate_distance_field(&geometry, &settings));
    }
    assert_eq!(outputs.len(), 3);
    assert_eq!(pipeline.resources().live(), outputs.len());

    for texture in outputs {
        texture.release();
    }
    assert_eq!(pipeline.resources().live(), 0);
    assert!(pipeline.resources().created() > 3);
}

#[test]
fn failed_submission_releases_allocated_resources() {
    let Some(gpu) = gpu() else { return };
    let pipeline = pipeline(&gpu, SdfConfig::with_resolution(64));
    let s = horizontal(&gpu);
    let vertices = destroyed_vertices(&gpu, s.bounds());
    let geometry = StrokeGeometry { vertices: Some(&vertices), ..s.geometry() };

    let err = pipeline
        .try_generate(&geometry, &RenderSettings::pen(10.0, 0x800000, 1.0))
        .unwrap_err();
    assert!(matches!(err, SdfError::Pipeline(_)), "{err}");
    assert!(pipeline.resources().created() > 0);
    assert_eq!(pipeline.resources().live(), 0);
}

#[test]
fn unwaited_render_matches_waited_render() {
    let Some(gpu) = gpu() else { return };
    let s = horizontal(&gpu);
    let settings = RenderSettings::pen(10.0, 0x800000, 1.0);

    let mut renders = Vec::new();
    for wait in [true, false] {
        let mut config = SdfConfig::with_resolution(128);
        config.wait_for_completion = wait;
        let pipeline = pipeline(&gpu, config);
        let texture = pipeline.generate_distance_field(&s.geometry(), &settings).unwrap();
        assert_eq!(pipeline.resources().live(), 1, "wait = {wait}");
        renders.push(texture.read_pixels(&gpu).unwrap());

        drop(texture);
        assert_eq!(pipeline.resources().live(), 0, "wait = {wait}");
    }
    assert_eq!(renders[0], renders[1]);
}

#[test]
fn repeated_calls_are_pixel_identical() {
    let Some(gpu) = gpu() else { return };
    for backend in [Backend::Compute, Backend::Fragment] {
        let Some(pipeline) = supported_pipeline(&gpu, SdfConfig::with_resolution(128).with_backend(backend)) else {
            continue;
        };
        let s = horizontal(&gpu);
        let settings = RenderSettings::pen(10.0, 0x800000, 1.0);

        let a = pipeline.generate_distance_field(&s.geometry(), &settings).unwrap();
        let b = pipeline.generate_distance_field(&s.geometry(), &settings).unwrap();
        assert_eq!(a.read_pixels(&gpu).unwrap(), b.read_pixels(&gpu).unwrap(), "{backend:?}");
    }
}

#[test]
fn gpu_field_matches_cpu_reference() {
    let Some(gpu) = gpu() else { return };
    let config = SdfConfig::with_resolution(64);
    let (edges, s) = scattered(&gpu);
    let transform = RasterTransform::fit(s.bounds(), config.resolution);

    let reference = reference::distance_field(
        &edges,
        transform,
        config.resolution,
        config.jfa_passes,
        config.distance_spread,
    );
    let exact = reference::brute_force(&edges, transform, config.resolution, config.distance_spread);

    for backend in [Backend::Compute, Backend::Fragment] {
        let Some(pipeline) = supported_pipeline(&gpu, config.clone().with_backend(backend)) else {
            continue;
        };
        let field = pipeline.compute_distance_field(&s.geometry()).unwrap();

        // equidistant seeds may resolve differently on the gpu; allow a few texels
        let differing = mismatched(&field, &reference, 1e-4);
        assert!(differing <= 40, "{backend:?}: {differing} texels differ");

        // within one texel of the analytic field
        let vs_exact = field.max_difference(&exact, f32::INFINITY).unwrap();
        assert!(vs_exact < 1.0 / config.distance_spread, "{backend:?}: {vs_exact}");
    }
}

#[test]
fn backends_agree() {
    let Some(gpu) = gpu() else { return };
    let (_, s) = scattered(&gpu);
    let compute = pipeline(&gpu, SdfConfig::with_resolution(64));
    let Some(fragment) = supported_pipeline(&gpu, SdfConfig::with_resolution(64).with_backend(Backend::Fragment))
    else {
        return;
    };

    let a = compute.compute_distance_field(&s.geometry()).unwrap();
    let b = fragment.compute_distance_field(&s.geometry()).unwrap();
    assert!(mismatched(&a, &b, 1e-4) <= 40);
    assert!(a.max_difference(&b, f32::INFINITY).unwrap() < 2.0 / compute.config().distance_spread);
}

#[test]
fn fragment_backend_is_ready_or_rejected_as_config() {
    let Some(gpu) = gpu() else { return };
    let mut pipeline = DistanceFieldPipeline::new(SdfConfig::with_resolution(32).with_backend(Backend::Fragment));
    match pipeline.initialize(Arc::clone(&gpu), FORMAT) {
        Ok(()) => assert!(pipeline.is_initialized()),
        Err(err) => {
            assert!(matches!(err, SdfError::Config(_)), "{err}");
            assert!(!pipeline.is_initialized());
        }
    }
    assert_eq!(pipeline.resources().created(), 0);
}

#[test]
fn producer_edge_ids_do_not_change_the_field() {
    let Some(gpu) = gpu() else { return };
    let pipeline = pipeline(&gpu, SdfConfig::with_resolution(64));
    let (edges, s) = scattered(&gpu);
    let renumbered: Vec<Edge> = edges
        .iter()
        .enumerate()
        .map(|(i, e)| Edge { edge_id: 9000 - i as u32 * 17, ..*e })
        .collect();
    let other = stroke(&gpu, &renumbered, s.bounds());

    let a = pipeline.compute_distance_field(&s.geometry()).unwrap();
    let b = pipeline.compute_distance_field(&other.geometry()).unwrap();
    assert_eq!(a.max_difference(&b, f32::INFINITY), Some(0.0));
}

#[test]
fn single_edge_distance_is_analytic() {
    let Some(gpu) = gpu() else { return };
    let pipeline = pipeline(&gpu, SdfConfig::with_resolution(64));
    let edges = [Edge::new(0, Vec2::new(16.0, 32.0), Vec2::new(48.0, 32.0))];
    let s = stroke(&gpu, &edges, Bounds::new(0.0, 0.0, 64.0, 64.0));
    let field = pipeline.compute_distance_field(&s.geometry()).unwrap();
    let spread = pipeline.config().distance_spread;

    // above the segment: perpendicular distance
    assert!((field.at(30, 20) - 11.5 / spread).abs() < 1e-5);
    // left of the start point: distance to the endpoint, not to a seed
    let d = ((16.0f32 - 4.5).powi(2) + (32.0f32 - 32.5).powi(2)).sqrt();
    assert!((field.at(4, 32) - d / spread).abs() < 1e-5);
}

#[test]
fn flipping_inside_flags_negates_distances() {
    let Some(gpu) = gpu() else { return };
    let pipeline = pipeline(&gpu, SdfConfig::with_resolution(64));
    // corners left open so no two edges seed the same texel
    let square = vec![
        Edge::new(0, Vec2::new(18.0, 16.0), Vec2::new(46.0, 16.0)),
        Edge::new(1, Vec2::new(48.0, 18.0), Vec2::new(48.0, 46.0)),
        Edge::new(2, Vec2::new(46.0, 48.0), Vec2::new(18.0, 48.0)),
        Edge::new(3, Vec2::new(16.0, 46.0), Vec2::new(16.0, 18.0)),
    ];
    let flipped: Vec<Edge> = square.iter().map(|e| e.flipped()).collect();
    let bounds = Bounds::new(0.0, 0.0, 64.0, 64.0);

    let a = pipeline.compute_distance_field(&stroke(&gpu, &square, bounds).geometry()).unwrap();
    let b = pipeline.compute_distance_field(&stroke(&gpu, &flipped, bounds).geometry()).unwrap();

    for y in 17..48 {
        for x in 17..48 {
            assert_eq!(a.at(x, y), -b.at(x, y), "texel ({x}, {y})");
            assert!(a.at(x, y) > 0.0);
        }
    }
}

#[test]
fn horizontal_stroke_renders_an_antialiased_band() {
    let Some(gpu) = gpu() else { return };
    let pipeline = pipeline(&gpu, SdfConfig::default());
    let s = horizontal(&gpu);
    let texture = pipeline
        .generate_distance_field(&s.geometry(), &RenderSettings::pen(10.0, 0x800000, 1.0))
        .unwrap();
    let width = texture.width();
    let pixels = texture.read_pixels(&gpu).unwrap();

    // raster row 128 is stroke-local y = 0
    let x = 128;
    let center = ((128 * width + x) * 4) as usize;
    assert_eq!(&pixels[center..center + 4], &[128, 0, 0, 255]);

    let column: Vec<u8> = (0..width).map(|y| alpha_at(&pixels, width, x, y)).collect();
    let covered = column.iter().filter(|&&a| a > 127).count();
    // 10 px wide at 2.56 texels per px
    assert!((24..=28).contains(&covered), "covered rows: {covered}");
    assert!(column[..100].iter().all(|&a| a == 0));
    assert!(column[156..].iter().all(|&a| a == 0));

    let soft_top = column[110..118].iter().any(|&a| a > 0 && a < 255);
    let soft_bottom = column[138..146].iter().any(|&a| a > 0 && a < 255);
    assert!(soft_top && soft_bottom, "edges are not antialiased");
}

#[test]
fn eraser_emits_coverage_without_color() {
    let Some(gpu) = gpu() else { return };
    let pipeline = pipeline(&gpu, SdfConfig::with_resolution(128));
    let s = horizontal(&gpu);
    let texture = pipeline
        .generate_distance_field(&s.geometry(), &RenderSettings::eraser(10.0, 1.0))
        .unwrap();
    let pixels = texture.read_pixels(&gpu).unwrap();
    let center = ((64 * 128 + 64) * 4) as usize;
    assert_eq!(&pixels[center..center + 4], &[0, 0, 0, 255]);
}

#[test]
fn multisampled_render_resolves_into_output() {
    let Some(gpu) = gpu() else { return };
    let pipeline = pipeline(&gpu, SdfConfig::with_resolution(128).with_sample_count(4));
    let s = horizontal(&gpu);
    let texture = pipeline
        .generate_distance_field(&s.geometry(), &RenderSettings::pen(10.0, 0x800000, 1.0))
        .unwrap();
    let pixels = texture.read_pixels(&gpu).unwrap();
    assert_eq!(alpha_at(&pixels, 128, 64, 64), 255);
    assert_eq!(alpha_at(&pixels, 128, 64, 10), 0);

    drop(texture);
    assert_eq!(pipeline.resources().live(), 0);
}

#[test]
fn programs_are_built_lazily_unless_eager() {
    let Some(gpu) = gpu() else { return };
    let lazy = pipeline(&gpu, SdfConfig::with_resolution(32));
    assert!(lazy.programs().contains(StageKey::SeedCompute));
    assert!(!lazy.programs().contains(StageKey::FloodCompute));
    assert!(!lazy.programs().contains(StageKey::Polygon));

    let s = horizontal(&gpu);
    lazy.generate_distance_field(&s.geometry(), &RenderSettings::default())
        .unwrap();
    assert!(lazy.programs().contains(StageKey::Polygon));

    let mut config = SdfConfig::with_resolution(32).with_backend(Backend::Fragment);
    config.eager_programs = true;
    let Some(eager) = supported_pipeline(&gpu, config) else { return };
    for key in [
        StageKey::SeedFragment,
        StageKey::FloodFragment,
        StageKey::EncodeFragment,
        StageKey::Polygon,
        StageKey::Quad,
    ] {
        assert!(eager.programs().contains(key), "{}", key.name());
    }
}

#[test]
fn destroyed_pipeline_rejects_strokes() {
    let Some(gpu) = gpu() else { return };
    let mut pipeline = pipeline(&gpu, SdfConfig::with_resolution(32));
    let s = horizontal(&gpu);
    pipeline.destroy();
    assert_eq!(
        pipeline.try_generate(&s.geometry(), &RenderSettings::default()).unwrap_err(),
        SdfError::Disposed
    );
    assert!(pipeline.initialize(Arc::clone(&gpu), FORMAT).is_err());
    assert_eq!(pipeline.resources().created(), 0);
}

#[test]
fn invalid_config_is_rejected_at_initialize() {
    let Some(gpu) = gpu() else { return };
    let mut pipeline = DistanceFieldPipeline::new(SdfConfig::with_resolution(64).with_jfa_passes(0));
    assert!(matches!(pipeline.initialize(Arc::clone(&gpu), FORMAT), Err(SdfError::Config(_))));
    assert!(!pipeline.is_initialized());
}

#[test]
fn chain_falls_back_to_polygon_fill() {
    let Some(gpu) = gpu() else { return };
    let s = horizontal(&gpu);
    let settings = RenderSettings::pen(10.0, 0x800000, 1.0);

    // uninitialized: skipped without being tried
    let mut chain = RendererChain::new()
        .with(DistanceFieldPipeline::new(SdfConfig::with_resolution(64)))
        .with(PolygonFillRenderer::new(Arc::clone(&gpu), FORMAT, 64));
    let (name, texture) = chain.render(&s.geometry(), &settings).unwrap();
    assert_eq!(name, "polygon-fill");
    assert_eq!(texture.width(), 64);

    // initialized but rejecting the stroke: the fill takes over
    let mut chain = RendererChain::new()
        .with(pipeline(&gpu, SdfConfig::with_resolution(64)))
        .with(PolygonFillRenderer::new(Arc::clone(&gpu), FORMAT, 64));
    let no_edges = StrokeGeometry { edge_count: 0, ..s.geometry() };
    let (name, _) = chain.render(&no_edges, &settings).unwrap();
    assert_eq!(name, "polygon-fill");

    let (name, _) = chain.render(&s.geometry(), &settings).unwrap();
    assert_eq!(name, "distance-field");
}

#[test]
fn polygon_fill_covers_the_whole_mesh() {
    let Some(gpu) = gpu() else { return };
    let mut fill = PolygonFillRenderer::new(Arc::clone(&gpu), FORMAT, 32);
    let s = horizontal(&gpu);
    let texture = fill
        .render(&s.geometry(), &RenderSettings::pen(10.0, 0x800000, 0.5))
        .unwrap();
    let pixels = texture.read_pixels(&gpu).unwrap();
    // straight alpha 0.5 blended over transparent: 0.5 * 0.5
    let a = alpha_at(&pixels, 32, 3, 3);
    assert!((62..=66).contains(&a), "alpha {a}");

    drop(texture);
    assert_eq!(fill.resources().live(), 0);
}

#[test]
fn rejected_fill_draw_returns_none() {
    let Some(gpu) = gpu() else { return };
    let s = horizontal(&gpu);
    let vertices = destroyed_vertices(&gpu, s.bounds());
    let geometry = StrokeGeometry { vertices: Some(&vertices), ..s.geometry() };
    let settings = RenderSettings::pen(10.0, 0x800000, 1.0);

    let mut fill = PolygonFillRenderer::new(Arc::clone(&gpu), FORMAT, 32);
    assert!(fill.render(&geometry, &settings).is_none());
    assert_eq!(fill.resources().live(), 0);

    let mut chain = RendererChain::new().with(PolygonFillRenderer::new(Arc::clone(&gpu), FORMAT, 32));
    assert!(chain.render(&geometry, &settings).is_none());
}
