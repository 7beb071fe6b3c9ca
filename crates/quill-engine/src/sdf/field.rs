/// Normalized signed distances read back from the distance stage.
///
/// Row-major, `size`² values; `value = inside_flag * distance_texels / distance_spread`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceField {
    size: u32,
    values: Vec<f32>,
}

impl DistanceField {
    /// Wraps `values`; `None` when the length is not `size`².
    pub fn new(size: u32, values: Vec<f32>) -> Option<Self> {
        (values.len() == (size as usize) * (size as usize)).then_some(Self { size, values })
    }

    /// Decodes `Rgba32Float` texels, keeping the red channel.
    pub(crate) fn from_rgba32f(size: u32, bytes: &[u8]) -> Option<Self> {
        let values = bytes
            .chunks_exact(16)
            .map(|texel| f32::from_le_bytes([texel[0], texel[1], texel[2], texel[3]]))
            .collect();
        Self::new(size, values)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Value at texel (`x`, `y`).
    ///
    /// # Panics
    /// When the texel is outside the field.
    pub fn at(&self, x: u32, y: u32) -> f32 {
        assert!(x < self.size && y < self.size, "texel ({x}, {y}) outside {0}x{0} field", self.size);
        self.values[(y * self.size + x) as usize]
    }

    /// Largest absolute per-texel difference, ignoring texels where either side
    /// is at or beyond `ignore_above` in magnitude.
    pub fn max_difference(&self, other: &DistanceField, ignore_above: f32) -> Option<f32> {
        if self.size != other.size {
            return None;
        }
        let max = self
            .values
            .iter()
            .zip(&other.values)
            .filter(|(a, b)| a.abs() < ignore_above && b.abs() < ignore_above)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        Some(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(DistanceField::new(2, vec![0.0; 3]).is_none());
        assert!(DistanceField::new(2, vec![0.0; 4]).is_some());
    }

    #[test]
    fn decodes_red_channel_row_major() {
        let mut bytes = Vec::new();
        for v in [1.0f32, 2.0, 3.0, 4.0] {
            for c in [v, v, v, 1.0] {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
        }
        let field = DistanceField::from_rgba32f(2, &bytes).unwrap();
        assert_eq!(field.at(1, 0), 2.0);
        assert_eq!(field.at(0, 1), 3.0);
    }

    #[test]
    fn difference_skips_sentinels() {
        let a = DistanceField::new(1, vec![1.0e4]).unwrap();
        let b = DistanceField::new(1, vec![0.0]).unwrap();
        assert_eq!(a.max_difference(&b, 100.0), Some(0.0));
        assert_eq!(a.max_difference(&b, f32::INFINITY), Some(1.0e4));
    }
}
