use image::{Rgba, RgbaImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{analysis::hotspot::HotspotBox, pixel::PixelBuffer};

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub color: Rgba<u8>,
    pub min_thickness: u32,
    /// One extra pixel of outline per this many pixels of image width.
    pub width_per_thickness: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            color: Rgba([255, 0, 0, 255]),
            min_thickness: 2,
            width_per_thickness: 300,
        }
    }
}

pub struct Visualizer {
    config: OverlayConfig,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            config: OverlayConfig::default(),
        }
    }

    pub fn with_config(config: OverlayConfig) -> Self {
        Self { config }
    }

    pub fn thickness(&self, width: u32) -> u32 {
        let scaled = (width as f64 / self.config.width_per_thickness.max(1) as f64).round() as u32;
        scaled.max(self.config.min_thickness)
    }

    /// Outlines hotspot boxes on `image`. Boxes are in the coordinates of a
    /// `working` sized map and get scaled to the image per axis.
    pub fn draw_hotspots(
        &self,
        image: &PixelBuffer,
        boxes: &[HotspotBox],
        working: (u32, u32),
    ) -> RgbaImage {
        let mut canvas = image.to_rgba_image();
        let (width, height) = image.dimensions();
        if working.0 == 0 || working.1 == 0 {
            return canvas;
        }

        let scale_x = width as f64 / working.0 as f64;
        let scale_y = height as f64 / working.1 as f64;
        let thickness = self.thickness(width);

        for b in boxes {
            let x = (b.x as f64 * scale_x).round() as i32;
            let y = (b.y as f64 * scale_y).round() as i32;
            let w = (b.w as f64 * scale_x).round() as u32;
            let h = (b.h as f64 * scale_y).round() as u32;

            for t in 0..thickness {
                let inner_w = w.saturating_sub(2 * t);
                let inner_h = h.saturating_sub(2 * t);
                if inner_w == 0 || inner_h == 0 {
                    break;
                }
                let rect = Rect::at(x + t as i32, y + t as i32).of_size(inner_w, inner_h);
                draw_hollow_rect_mut(&mut canvas, rect, self.config.color);
            }
        }

        canvas
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
