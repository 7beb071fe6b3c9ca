use crate::paint::{Color, ColorParseError};

/// How the polygon renderer composites the stroke.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum StrokeMode {
    /// Brush color at `coverage * opacity`.
    #[default]
    Pen,
    /// Coverage only (black, alpha = coverage). The consumer composites it with a
    /// destination-subtractive blend.
    Eraser,
}

impl StrokeMode {
    /// Parses the `"pen"` / `"eraser"` tokens used by tool settings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pen" => Some(Self::Pen),
            "eraser" => Some(Self::Eraser),
            _ => None,
        }
    }

    pub(crate) fn shader_code(self) -> u32 {
        match self {
            Self::Pen => 0,
            Self::Eraser => 1,
        }
    }
}

/// Per-stroke render settings. Immutable for the duration of one call.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderSettings {
    /// Stroke width in stroke-local pixels.
    pub size: f32,
    /// Brush color (opaque; opacity is separate).
    pub color: Color,
    /// Overall opacity in [0, 1].
    pub opacity: f32,
    pub mode: StrokeMode,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            size: 4.0,
            color: Color::black(),
            opacity: 1.0,
            mode: StrokeMode::Pen,
        }
    }
}

impl RenderSettings {
    pub fn pen(size: f32, rgb: u32, opacity: f32) -> Self {
        Self {
            size,
            color: Color::from_rgb_u32(rgb),
            opacity,
            mode: StrokeMode::Pen,
        }
    }

    pub fn eraser(size: f32, opacity: f32) -> Self {
        Self {
            size,
            color: Color::black(),
            opacity,
            mode: StrokeMode::Eraser,
        }
    }

    /// Pen settings with the color given as a hex string (`"#800000"`).
    pub fn pen_hex(size: f32, color: &str, opacity: f32) -> Result<Self, ColorParseError> {
        Ok(Self {
            size,
            color: Color::parse_hex(color)?,
            opacity,
            mode: StrokeMode::Pen,
        })
    }

    /// True when every numeric field is usable by the shaders.
    pub fn is_valid(&self) -> bool {
        self.size.is_finite() && self.size >= 0.0 && self.opacity.is_finite() && self.color.is_finite()
    }

    /// Opacity clamped to [0, 1].
    pub fn clamped_opacity(&self) -> f32 {
        self.opacity.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_tokens_parse_case_insensitively() {
        assert_eq!(StrokeMode::parse("pen"), Some(StrokeMode::Pen));
        assert_eq!(StrokeMode::parse(" Eraser "), Some(StrokeMode::Eraser));
        assert_eq!(StrokeMode::parse("marker"), None);
    }

    #[test]
    fn hex_and_integer_colors_agree() {
        let a = RenderSettings::pen(10.0, 0x800000, 1.0);
        let b = RenderSettings::pen_hex(10.0, "#800000", 1.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn nan_size_is_invalid() {
        let s = RenderSettings { size: f32::NAN, ..RenderSettings::default() };
        assert!(!s.is_valid());
        assert!(RenderSettings::default().is_valid());
    }

    #[test]
    fn opacity_is_clamped() {
        assert_eq!(RenderSettings::pen(1.0, 0, 3.0).clamped_opacity(), 1.0);
        assert_eq!(RenderSettings::pen(1.0, 0, -1.0).clamped_opacity(), 0.0);
    }
}
