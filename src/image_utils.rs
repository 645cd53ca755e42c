use ndarray::Array2;

use crate::{error::Result, pixel::PixelBuffer};

pub fn luminance(pixel: &[u8]) -> f64 {
    0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64
}

/// Luminance plane indexed `[[y, x]]`, unrounded.
pub fn luminance_grid(buf: &PixelBuffer) -> Array2<f64> {
    let (width, height) = buf.dimensions();
    let mut arr = Array2::zeros((height as usize, width as usize));

    for (i, pixel) in buf.pixels().enumerate() {
        let (y, x) = (i / width as usize, i % width as usize);
        arr[[y, x]] = luminance(pixel);
    }

    arr
}

/// Box (area-average) resample. Each output pixel averages the source pixels
/// its footprint covers, weighted by fractional coverage.
pub fn area_resample(buf: &PixelBuffer, width: u32, height: u32) -> Result<PixelBuffer> {
    let (src_w, src_h) = buf.dimensions();
    if (src_w, src_h) == (width, height) {
        return Ok(buf.clone());
    }
    if buf.is_empty() || width == 0 || height == 0 {
        return PixelBuffer::new(width, height, vec![0; width as usize * height as usize * 4]);
    }

    let x_weights = axis_weights(src_w, width);
    let y_weights = axis_weights(src_h, height);
    let src = buf.samples();
    let stride = src_w as usize * 4;

    let mut out = Vec::with_capacity(width as usize * height as usize * 4);
    for ys in &y_weights {
        for xs in &x_weights {
            let mut acc = [0.0f64; 4];
            let mut total = 0.0;

            for &(sy, wy) in ys {
                for &(sx, wx) in xs {
                    let w = wy * wx;
                    let i = sy * stride + sx * 4;
                    for c in 0..4 {
                        acc[c] += src[i + c] as f64 * w;
                    }
                    total += w;
                }
            }

            for value in acc {
                out.push((value / total).round().clamp(0.0, 255.0) as u8);
            }
        }
    }

    PixelBuffer::new(width, height, out)
}

/// Scales to `width`, recomputing the height from the buffer's own aspect
/// ratio.
pub fn resample_to_width(buf: &PixelBuffer, width: u32) -> Result<PixelBuffer> {
    let height = if buf.width() == 0 {
        0
    } else {
        ((buf.height() as f64 * width as f64 / buf.width() as f64).round() as u32).max(1)
    };
    area_resample(buf, width, height)
}

fn axis_weights(src_len: u32, dst_len: u32) -> Vec<Vec<(usize, f64)>> {
    let scale = src_len as f64 / dst_len as f64;

    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len as usize);

            (first..last)
                .filter_map(|s| {
                    let w = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (w > 0.0).then_some((s, w))
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> PixelBuffer {
        let samples = rgba.repeat(width as usize * height as usize);
        PixelBuffer::new(width, height, samples).unwrap()
    }

    #[test]
    fn test_luminance_weights() {
        assert!((luminance(&[255, 255, 255, 255]) - 255.0).abs() < 1e-9);
        assert!((luminance(&[100, 0, 0, 255]) - 29.9).abs() < 1e-9);
    }

    #[test]
    fn test_area_resample_preserves_solid_color() {
        let buf = solid(30, 20, [10, 120, 240, 255]);
        let small = area_resample(&buf, 8, 8).unwrap();
        assert_eq!(small.dimensions(), (8, 8));
        assert!(small.pixels().all(|p| p == [10, 120, 240, 255]));
    }

    #[test]
    fn test_area_resample_averages_halves() {
        // Left column black, right column white, collapsed to one pixel.
        let buf = PixelBuffer::new(2, 1, vec![0, 0, 0, 255, 255, 255, 255, 255]).unwrap();
        let one = area_resample(&buf, 1, 1).unwrap();
        assert_eq!(one.pixel(0, 0), [128, 128, 128, 255]);
    }

    #[test]
    fn test_resample_to_width_keeps_aspect() {
        let buf = solid(100, 50, [0, 0, 0, 255]);
        let out = resample_to_width(&buf, 40).unwrap();
        assert_eq!(out.dimensions(), (40, 20));
    }

    #[test]
    fn test_luminance_grid_layout() {
        let buf = PixelBuffer::new(2, 1, vec![0, 0, 0, 255, 255, 255, 255, 255]).unwrap();
        let grid = luminance_grid(&buf);
        assert_eq!(grid.dim(), (1, 2));
        assert!((grid[[0, 1]] - 255.0).abs() < 1e-9);
    }
}
