/// Initialization parameters for the GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Backends wgpu may pick from.
    pub backends: wgpu::Backends,

    /// Adapter power preference.
    ///
    /// Stroke rasterization is short and bursty; the high-performance adapter is
    /// preferred when a choice exists.
    pub power_preference: wgpu::PowerPreference,

    /// Force a software/fallback adapter (useful on headless CI machines).
    pub force_fallback_adapter: bool,

    /// Required wgpu features.
    ///
    /// The distance-field pipeline needs none; favor an empty set for portability.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}
