use super::SdfError;

/// Which GPU realization runs the seed, flood and encode stages.
///
/// Both produce the same field; the render stage is shared.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Backend {
    /// Compute kernels writing storage textures.
    #[default]
    Compute,
    /// Fragment passes: seeds as a point list, flood/encode over a fixed quad.
    Fragment,
}

/// Largest accepted pass count; step `2^(passes-1)` must stay far inside `u32`.
pub const MAX_JFA_PASSES: u32 = 16;

/// Number of halvings after which jump flooding converges on a `resolution`² grid:
/// `ceil(log2(resolution))`, at least one.
pub fn jfa_passes_for(resolution: u32) -> u32 {
    if resolution <= 2 {
        return 1;
    }
    u32::BITS - (resolution - 1).leading_zeros()
}

/// Step sizes `2^(passes-1), …, 2, 1`.
pub fn jfa_steps(passes: u32) -> impl Iterator<Item = u32> {
    (0..passes).rev().map(|k| 1u32 << k)
}

/// Distance-field pipeline configuration.
///
/// The raster resolution and the flood pass count are tied: [`SdfConfig::with_resolution`]
/// keeps them in sync, [`SdfConfig::with_jfa_passes`] overrides the count explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct SdfConfig {
    /// Side of the square seed/flood/distance/output textures, in texels.
    pub resolution: u32,

    /// Number of jump-flood passes.
    pub jfa_passes: u32,

    pub backend: Backend,

    /// Render-stage sample count (1, or 4 to render via a resolved MSAA target).
    pub sample_count: u32,

    /// Block on GPU completion after seeding, after flooding and after rendering.
    pub wait_for_completion: bool,

    /// Raster texels per normalized distance unit.
    pub distance_spread: f32,

    /// Coverage threshold applied to the stroke depth (normalized units).
    pub threshold: f32,

    /// Half width of the smoothstep band around `threshold` (normalized units).
    pub band: f32,

    /// Build every stage program in `initialize` instead of on first use.
    pub eager_programs: bool,
}

impl Default for SdfConfig {
    fn default() -> Self {
        Self::with_resolution(256)
    }
}

impl SdfConfig {
    /// Default configuration for a `resolution`² raster.
    pub fn with_resolution(resolution: u32) -> Self {
        Self {
            resolution,
            jfa_passes: jfa_passes_for(resolution),
            backend: Backend::Compute,
            sample_count: 1,
            wait_for_completion: true,
            distance_spread: 32.0,
            threshold: 0.0,
            band: 0.03,
            eager_programs: false,
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Overrides the flood pass count. Fewer passes than
    /// [`required_jfa_passes`](Self::required_jfa_passes) trade accuracy for speed.
    pub fn with_jfa_passes(mut self, passes: u32) -> Self {
        self.jfa_passes = passes;
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Pass count needed for convergence at the configured resolution.
    pub fn required_jfa_passes(&self) -> u32 {
        jfa_passes_for(self.resolution)
    }

    /// True when the pass count is below the convergent count (possible seams).
    pub fn is_jfa_truncated(&self) -> bool {
        self.jfa_passes < self.required_jfa_passes()
    }

    pub fn validate(&self) -> Result<(), SdfError> {
        if self.resolution == 0 {
            return Err(SdfError::config("resolution must be non-zero"));
        }
        if self.jfa_passes == 0 || self.jfa_passes > MAX_JFA_PASSES {
            return Err(SdfError::config(format!(
                "jfa_passes must be in 1..={MAX_JFA_PASSES}, got {}",
                self.jfa_passes
            )));
        }
        if !matches!(self.sample_count, 1 | 4) {
            return Err(SdfError::config(format!(
                "sample_count must be 1 or 4, got {}",
                self.sample_count
            )));
        }
        if !(self.distance_spread.is_finite() && self.distance_spread > 0.0) {
            return Err(SdfError::config("distance_spread must be positive"));
        }
        if !(self.band.is_finite() && self.band > 0.0) {
            return Err(SdfError::config("band must be positive"));
        }
        if !self.threshold.is_finite() {
            return Err(SdfError::config("threshold must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_passes_match_log2_of_resolution() {
        let cfg = SdfConfig::default();
        assert_eq!(cfg.resolution, 256);
        assert_eq!(cfg.jfa_passes, 8);
        assert_eq!(cfg.jfa_passes, (cfg.resolution as f32).log2().ceil() as u32);
        assert!(!cfg.is_jfa_truncated());
    }

    #[test]
    fn passes_round_up_for_non_powers_of_two() {
        assert_eq!(jfa_passes_for(1), 1);
        assert_eq!(jfa_passes_for(2), 1);
        assert_eq!(jfa_passes_for(3), 2);
        assert_eq!(jfa_passes_for(200), 8);
        assert_eq!(jfa_passes_for(257), 9);
        assert_eq!(jfa_passes_for(1024), 10);
    }

    #[test]
    fn resolution_change_keeps_passes_in_sync() {
        assert_eq!(SdfConfig::with_resolution(512).jfa_passes, 9);
        assert_eq!(SdfConfig::with_resolution(64).jfa_passes, 6);
    }

    #[test]
    fn steps_halve_down_to_one() {
        let steps: Vec<u32> = jfa_steps(4).collect();
        assert_eq!(steps, vec![8, 4, 2, 1]);
        assert_eq!(jfa_steps(8).next(), Some(128));
    }

    #[test]
    fn fixed_smaller_pass_count_is_flagged() {
        let cfg = SdfConfig::default().with_jfa_passes(4);
        assert!(cfg.is_jfa_truncated());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(SdfConfig::with_resolution(0).validate().is_err());
        assert!(SdfConfig::default().with_jfa_passes(0).validate().is_err());
        assert!(SdfConfig::default().with_jfa_passes(17).validate().is_err());
        assert!(SdfConfig::default().with_sample_count(2).validate().is_err());
        assert!(SdfConfig { band: 0.0, ..SdfConfig::default() }.validate().is_err());
        assert!(SdfConfig { distance_spread: f32::NAN, ..SdfConfig::default() }.validate().is_err());
        assert!(SdfConfig::default().with_sample_count(4).validate().is_ok());
    }
}
