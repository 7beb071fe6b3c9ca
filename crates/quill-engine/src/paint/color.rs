use std::fmt;

/// Linear premultiplied RGBA color.
///
/// Invariant:
/// - `rgb` components are expected to be multiplied by `a` (premultiplied alpha).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32, // premultiplied
    pub g: f32, // premultiplied
    pub b: f32, // premultiplied
    pub a: f32,
}

impl Color {
    #[inline]
    pub const fn transparent() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 }
    }

    #[inline]
    pub const fn black() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0, a: 1.0 }
    }

    /// Creates a premultiplied color from straight sRGB bytes (`0`–`255`).
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_straight(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }

    /// Creates an opaque color from a packed `0xRRGGBB` value.
    ///
    /// Bits above the low 24 are ignored.
    #[inline]
    pub fn from_rgb_u32(rgb: u32) -> Self {
        let [_, r, g, b] = rgb.to_be_bytes();
        Self::from_srgb_u8(r, g, b, 255)
    }

    /// Parses `#rrggbb`, `#rgb`, `0xrrggbb` or a bare `rrggbb` hex string.
    pub fn parse_hex(s: &str) -> Result<Self, ColorParseError> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError::new(s));
        }

        let value = u32::from_str_radix(digits, 16).map_err(|_| ColorParseError::new(s))?;
        match digits.len() {
            6 => Ok(Self::from_rgb_u32(value)),
            3 => {
                // #rgb expands each nibble: #f80 == #ff8800.
                let r = ((value >> 8) & 0xf) as u8;
                let g = ((value >> 4) & 0xf) as u8;
                let b = (value & 0xf) as u8;
                Ok(Self::from_srgb_u8(r * 17, g * 17, b * 17, 255))
            }
            _ => Err(ColorParseError::new(s)),
        }
    }

    /// Creates a premultiplied color from premultiplied components.
    #[inline]
    pub const fn from_premul(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a premultiplied color from straight alpha components.
    #[inline]
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        let a = a.clamp(0.0, 1.0);
        Self {
            r: (r.clamp(0.0, 1.0)) * a,
            g: (g.clamp(0.0, 1.0)) * a,
            b: (b.clamp(0.0, 1.0)) * a,
            a,
        }
    }

    /// Returns a straight-alpha representation.
    ///
    /// For `a == 0`, RGB is returned as 0.
    #[inline]
    pub fn to_straight(self) -> (f32, f32, f32, f32) {
        if self.a <= 0.0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let inv = 1.0 / self.a;
            (self.r * inv, self.g * inv, self.b * inv, self.a)
        }
    }

    /// Straight RGB + alpha as a shader-ready array.
    #[inline]
    pub fn to_straight_array(self) -> [f32; 4] {
        let (r, g, b, a) = self.to_straight();
        [r, g, b, a]
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}

/// A color string that is not a recognised hex form.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorParseError {
    pub input: String,
}

impl ColorParseError {
    fn new(input: &str) -> Self {
        Self { input: input.to_string() }
    }
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color {:?}: expected #rrggbb or #rgb", self.input)
    }
}

impl std::error::Error for ColorParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn rgb_u32_unpacks_channels() {
        let c = Color::from_rgb_u32(0x800000);
        assert!(close(c.r, 128.0 / 255.0));
        assert_eq!(c.g, 0.0);
        assert_eq!(c.b, 0.0);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn parse_accepts_hash_and_0x_prefixes() {
        let expected = Color::from_rgb_u32(0x12ab34);
        assert_eq!(Color::parse_hex("#12ab34").unwrap(), expected);
        assert_eq!(Color::parse_hex("0x12AB34").unwrap(), expected);
        assert_eq!(Color::parse_hex(" 12ab34 ").unwrap(), expected);
    }

    #[test]
    fn parse_short_form_expands_nibbles() {
        assert_eq!(Color::parse_hex("#f80").unwrap(), Color::from_rgb_u32(0xff8800));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Color::parse_hex("#12345").is_err());
        assert!(Color::parse_hex("#zzzzzz").is_err());
        assert!(Color::parse_hex("").is_err());
        assert!(Color::parse_hex("#+12345").is_err());
    }

    #[test]
    fn straight_round_trip_for_translucent_color() {
        let c = Color::from_straight(0.5, 0.25, 1.0, 0.5);
        assert!(close(c.r, 0.25));
        let (r, g, b, a) = c.to_straight();
        assert!(close(r, 0.5) && close(g, 0.25) && close(b, 1.0) && close(a, 0.5));
    }

    #[test]
    fn transparent_to_straight_is_zero() {
        assert_eq!(Color::transparent().to_straight(), (0.0, 0.0, 0.0, 0.0));
    }
}
