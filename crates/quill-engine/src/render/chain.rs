use crate::sdf::{DistanceFieldPipeline, StrokeTexture};
use crate::stroke::{RenderSettings, StrokeGeometry};

use super::PolygonFillRenderer;

/// A way of turning one stroke into a texture.
pub trait StrokeRenderer {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the strategy can run at all right now (initialized, device alive).
    fn is_available(&self) -> bool;

    /// Renders the stroke, or `None` when this strategy cannot handle it.
    fn render(&mut self, geometry: &StrokeGeometry<'_>, settings: &RenderSettings) -> Option<StrokeTexture>;
}

impl StrokeRenderer for DistanceFieldPipeline {
    fn name(&self) -> &'static str {
        "distance-field"
    }

    fn is_available(&self) -> bool {
        DistanceFieldPipeline::is_available(self)
    }

    fn render(&mut self, geometry: &StrokeGeometry<'_>, settings: &RenderSettings) -> Option<StrokeTexture> {
        self.generate_distance_field(geometry, settings)
    }
}

impl StrokeRenderer for PolygonFillRenderer {
    fn name(&self) -> &'static str {
        "polygon-fill"
    }

    fn is_available(&self) -> bool {
        PolygonFillRenderer::is_available(self)
    }

    fn render(&mut self, geometry: &StrokeGeometry<'_>, settings: &RenderSettings) -> Option<StrokeTexture> {
        PolygonFillRenderer::render(self, geometry, settings)
    }
}

/// Ordered list of stroke renderers, tried until one produces a texture.
///
/// Strategies that report themselves unavailable are skipped without being
/// called.
#[derive(Default)]
pub struct RendererChain {
    renderers: Vec<Box<dyn StrokeRenderer>>,
}

impl RendererChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `renderer` after the existing ones.
    pub fn with(mut self, renderer: impl StrokeRenderer + 'static) -> Self {
        self.push(Box::new(renderer));
        self
    }

    pub fn push(&mut self, renderer: Box<dyn StrokeRenderer>) {
        self.renderers.push(renderer);
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    /// Names of the strategies, in the order they are tried.
    pub fn names(&self) -> Vec<&'static str> {
        self.renderers.iter().map(|r| r.name()).collect()
    }

    /// Renders with the first strategy that succeeds, returning its name too.
    pub fn render(
        &mut self,
        geometry: &StrokeGeometry<'_>,
        settings: &RenderSettings,
    ) -> Option<(&'static str, StrokeTexture)> {
        for renderer in &mut self.renderers {
            if !renderer.is_available() {
                log::trace!("{} unavailable, skipped", renderer.name());
                continue;
            }
            if let Some(texture) = renderer.render(geometry, settings) {
                return Some((renderer.name(), texture));
            }
            log::debug!("{} declined the stroke, falling back", renderer.name());
        }
        log::warn!("no stroke renderer produced a texture");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Bounds;

    struct Scripted {
        name: &'static str,
        available: bool,
        calls: std::rc::Rc<std::cell::Cell<u32>>,
    }

    impl StrokeRenderer for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn render(&mut self, _: &StrokeGeometry<'_>, _: &RenderSettings) -> Option<StrokeTexture> {
            self.calls.set(self.calls.get() + 1);
            None
        }
    }

    fn geometry() -> StrokeGeometry<'static> {
        StrokeGeometry {
            edges: None,
            edge_count: 0,
            vertices: None,
            vertex_count: 0,
            bounds: Bounds::new(0.0, 0.0, 1.0, 1.0),
        }
    }

    #[test]
    fn unavailable_strategies_are_not_called() {
        let skipped = std::rc::Rc::new(std::cell::Cell::new(0));
        let tried = std::rc::Rc::new(std::cell::Cell::new(0));
        let mut chain = RendererChain::new()
            .with(Scripted { name: "off", available: false, calls: skipped.clone() })
            .with(Scripted { name: "on", available: true, calls: tried.clone() });

        assert_eq!(chain.names(), ["off", "on"]);
        assert!(chain.render(&geometry(), &RenderSettings::default()).is_none());
        assert_eq!(skipped.get(), 0);
        assert_eq!(tried.get(), 1);
    }

    #[test]
    fn uninitialized_pipeline_reports_unavailable() {
        let pipeline = crate::sdf::DistanceFieldPipeline::new(crate::sdf::SdfConfig::default());
        let chain = RendererChain::new().with(pipeline);
        assert_eq!(chain.len(), 1);
        assert!(!chain.renderers[0].is_available());
    }
}
