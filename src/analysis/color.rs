use serde::Serialize;

use crate::pixel::PixelBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorStats {
    pub mean_rgb: [u8; 3],
}

impl ColorStats {
    /// Mean of each color channel, rounded; alpha is ignored.
    pub fn compute(image: &PixelBuffer) -> Self {
        if image.is_empty() {
            return Self { mean_rgb: [0; 3] };
        }

        let mut sums = [0u64; 3];
        for p in image.pixels() {
            for c in 0..3 {
                sums[c] += p[c] as u64;
            }
        }

        let n = image.pixel_count() as f64;
        Self {
            mean_rgb: sums.map(|s| (s as f64 / n).round() as u8),
        }
    }

    pub fn all_below(&self, cutoff: u8) -> bool {
        self.mean_rgb.iter().all(|&v| v < cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_rounds_and_ignores_alpha() {
        let buf = PixelBuffer::new(2, 1, vec![10, 0, 255, 0, 11, 3, 0, 255]).unwrap();
        let stats = ColorStats::compute(&buf);
        // 10.5 rounds up, 1.5 rounds up, 127.5 rounds up.
        assert_eq!(stats.mean_rgb, [11, 2, 128]);
    }

    #[test]
    fn test_all_below() {
        let stats = ColorStats { mean_rgb: [39, 10, 0] };
        assert!(stats.all_below(40));
        assert!(!ColorStats { mean_rgb: [39, 40, 0] }.all_below(40));
    }
}
