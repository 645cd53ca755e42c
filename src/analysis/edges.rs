use ndarray::Array2;

use crate::{
    error::Result,
    image_utils::luminance_grid,
    pixel::{CHANNELS, PixelBuffer},
};

const SOBEL_X: [[f64; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_Y: [[f64; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

pub struct EdgeDetector;

impl EdgeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Sobel magnitude map. The 1px border stays fully zero, alpha included.
    pub fn analyze(&self, image: &PixelBuffer) -> Result<PixelBuffer> {
        let gray = luminance_grid(image);
        let (width, height) = image.dimensions();
        let mut samples = vec![0u8; image.pixel_count() * CHANNELS];

        for y in 1..(height as usize).saturating_sub(1) {
            for x in 1..(width as usize).saturating_sub(1) {
                let gx = Self::convolve(&gray, x, y, &SOBEL_X);
                let gy = Self::convolve(&gray, x, y, &SOBEL_Y);

                let magnitude = (gx * gx + gy * gy).sqrt().min(255.0).round_ties_even() as u8;

                let i = (y * width as usize + x) * CHANNELS;
                samples[i..i + CHANNELS].copy_from_slice(&[magnitude, magnitude, magnitude, 255]);
            }
        }

        PixelBuffer::new(width, height, samples)
    }

    fn convolve(gray: &Array2<f64>, x: usize, y: usize, kernel: &[[f64; 3]; 3]) -> f64 {
        let mut sum = 0.0;
        for (ky, row) in kernel.iter().enumerate() {
            for (kx, k) in row.iter().enumerate() {
                sum += k * gray[[y + ky - 1, x + kx - 1]];
            }
        }
        sum
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(width: u32, height: u32, boundary: u32) -> PixelBuffer {
        let mut samples = Vec::new();
        for _ in 0..height {
            for x in 0..width {
                let v = if x < boundary { 0 } else { 100 };
                samples.extend([v, v, v, 255]);
            }
        }
        PixelBuffer::new(width, height, samples).unwrap()
    }

    #[test]
    fn test_flat_image_has_no_edges() {
        let buf = PixelBuffer::new(5, 5, [90, 90, 90, 255].repeat(25)).unwrap();
        let edges = EdgeDetector::new().analyze(&buf).unwrap();
        assert_eq!(edges.pixel(2, 2), [0, 0, 0, 255]);
    }

    #[test]
    fn test_vertical_step() {
        let edges = EdgeDetector::new().analyze(&split(6, 5, 3)).unwrap();
        // Gx = (1 + 2 + 1) * 100 next to the step, clamped to 255.
        assert_eq!(edges.pixel(2, 2), [255, 255, 255, 255]);
        assert_eq!(edges.pixel(3, 2), [255, 255, 255, 255]);
        assert_eq!(edges.pixel(1, 2), [0, 0, 0, 255]);
    }

    #[test]
    fn test_unclamped_magnitude() {
        let mut samples = Vec::new();
        for _ in 0..3 {
            for x in 0..3 {
                let v = if x == 2 { 10 } else { 0 };
                samples.extend([v, v, v, 255]);
            }
        }
        let edges = EdgeDetector::new()
            .analyze(&PixelBuffer::new(3, 3, samples).unwrap())
            .unwrap();
        assert_eq!(edges.pixel(1, 1)[0], 40);
    }

    #[test]
    fn test_border_ring_is_zero() {
        let edges = EdgeDetector::new().analyze(&split(6, 5, 3)).unwrap();
        for x in 0..6 {
            assert_eq!(edges.pixel(x, 0), [0, 0, 0, 0]);
            assert_eq!(edges.pixel(x, 4), [0, 0, 0, 0]);
        }
        assert_eq!(edges.pixel(0, 2), [0, 0, 0, 0]);
        assert_eq!(edges.pixel(5, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn test_tiny_images() {
        let buf = PixelBuffer::new(2, 1, vec![0; 8]).unwrap();
        let edges = EdgeDetector::new().analyze(&buf).unwrap();
        assert!(edges.samples().iter().all(|&v| v == 0));
    }
}
