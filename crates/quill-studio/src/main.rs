//! Headless quill demo.
//!
//! Renders a pen stroke and an eraser stroke through the renderer chain and
//! writes each result as a PNG.
//!
//! Usage: `quill-studio [OUT_DIR] [--fragment] [--msaa]`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use quill_engine::coords::{Bounds, Vec2};
use quill_engine::device::{Gpu, GpuInit};
use quill_engine::logging::{init_logging, LoggingConfig};
use quill_engine::render::{PolygonFillRenderer, RendererChain};
use quill_engine::sdf::{Backend, DistanceFieldPipeline, SdfConfig, StrokeTexture};
use quill_engine::stroke::{polyline_edges, GpuStroke, RenderSettings, StrokeVertex};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut out_dir = PathBuf::from(".");
    let mut config = SdfConfig::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--fragment" => config = config.with_backend(Backend::Fragment),
            "--msaa" => config = config.with_sample_count(4),
            _ => out_dir = PathBuf::from(arg),
        }
    }

    let gpu = Arc::new(Gpu::new_blocking(GpuInit::default())?);

    let mut pipeline = DistanceFieldPipeline::new(config.clone());
    pipeline
        .initialize(Arc::clone(&gpu), FORMAT)
        .context("distance-field pipeline rejected its configuration")?;

    let mut chain = RendererChain::new()
        .with(pipeline)
        .with(PolygonFillRenderer::new(Arc::clone(&gpu), FORMAT, config.resolution));

    // ── pen: horizontal line, 10 px wide ──────────────────────────────────
    let bounds = Bounds::new(0.0, -50.0, 100.0, 50.0);
    let edges = polyline_edges(&[Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)]);
    let pen = GpuStroke::upload(&gpu, &edges, &StrokeVertex::quad(bounds, bounds), bounds);
    let settings = RenderSettings::pen_hex(10.0, "#800000", 1.0)?;
    render_to_png(&gpu, &mut chain, &pen, &settings, out_dir.join("quill-pen.png"))?;

    // ── eraser: zig-zag polyline ──────────────────────────────────────────
    let points = [
        Vec2::new(10.0, 10.0),
        Vec2::new(40.0, 70.0),
        Vec2::new(70.0, 20.0),
        Vec2::new(110.0, 80.0),
    ];
    let bounds = Bounds::from_points(points)
        .context("zig-zag has no points")?
        .inflated(8.0);
    let edges = polyline_edges(&points);
    let eraser = GpuStroke::upload(&gpu, &edges, &StrokeVertex::quad(bounds, bounds), bounds);
    let settings = RenderSettings::eraser(6.0, 0.8);
    render_to_png(&gpu, &mut chain, &eraser, &settings, out_dir.join("quill-eraser.png"))?;

    Ok(())
}

fn render_to_png(
    gpu: &Gpu,
    chain: &mut RendererChain,
    stroke: &GpuStroke,
    settings: &RenderSettings,
    path: PathBuf,
) -> Result<()> {
    let (renderer, texture) = chain
        .render(&stroke.geometry(), settings)
        .context("every stroke renderer failed")?;
    write_png(gpu, &texture, &path)?;
    log::info!(
        "{}: {}x{} via {renderer}, covers {:.1} px from {:?}",
        path.display(),
        texture.width(),
        texture.height(),
        texture.extent(),
        texture.origin()
    );
    texture.release();
    Ok(())
}

fn write_png(gpu: &Gpu, texture: &StrokeTexture, path: &Path) -> Result<()> {
    let pixels = texture.read_pixels(gpu)?;
    let image = image::RgbaImage::from_raw(texture.width(), texture.height(), pixels)
        .context("readback size does not match the texture")?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
