//! Grid hotspot detection over an ELA difference map.
//!
//! The map is cut into `grid_size` square cells; a cell is hot when its mean
//! level reaches the threshold. Hot cells are grouped by 8-connectivity and
//! each group is reported as the bounding box of its cells, in pixel units.
//! Groups with ragged outlines still produce a single rectangle.

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ForensicsError, Result},
    pixel::PixelBuffer,
};

pub const DEFAULT_THRESHOLD: f64 = 30.0;
pub const DEFAULT_GRID_SIZE: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotspotBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl HotspotBox {
    pub fn overlaps(&self, x: u32, y: u32, w: u32, h: u32) -> bool {
        self.x < x + w && x < self.x + self.w && self.y < y + h && y < self.y + self.h
    }
}

pub struct HotspotDetector {
    threshold: f64,
    grid_size: u32,
    parallel: bool,
}

impl HotspotDetector {
    pub fn new(threshold: f64, grid_size: u32) -> Result<Self> {
        if grid_size == 0 {
            return Err(ForensicsError::InvalidParameter(
                "Grid size must be at least 1".into(),
            ));
        }
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ForensicsError::InvalidParameter(format!(
                "Hotspot threshold must be a non-negative number, got {threshold}"
            )));
        }

        Ok(Self {
            threshold,
            grid_size,
            parallel: true,
        })
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub fn detect(&self, diff_map: &PixelBuffer) -> Vec<HotspotBox> {
        let cells = self.hot_cells(diff_map);
        merge_cells(&cells, self.grid_size)
    }

    /// Hot-cell grid indexed `[[cell_y, cell_x]]`, shape
    /// `(ceil(h / grid), ceil(w / grid))`.
    pub fn hot_cells(&self, diff_map: &PixelBuffer) -> Array2<bool> {
        let (width, height) = diff_map.dimensions();
        let gw = width.div_ceil(self.grid_size) as usize;
        let gh = height.div_ceil(self.grid_size) as usize;

        let hot = |idx: usize| -> bool {
            let (cx, cy) = ((idx % gw) as u32, (idx / gw) as u32);
            self.cell_mean(diff_map, cx, cy) >= self.threshold
        };

        let flags = if self.parallel {
            (0..gw * gh).into_par_iter().map(hot).collect::<Vec<_>>()
        } else {
            (0..gw * gh).map(hot).collect()
        };

        Array2::from_shape_vec((gh, gw), flags)
            .unwrap_or_else(|_| Array2::from_elem((gh, gw), false))
    }

    fn cell_mean(&self, diff_map: &PixelBuffer, cx: u32, cy: u32) -> f64 {
        let (width, height) = diff_map.dimensions();
        let x0 = cx * self.grid_size;
        let y0 = cy * self.grid_size;
        let x1 = (x0 + self.grid_size).min(width);
        let y1 = (y0 + self.grid_size).min(height);

        let mut sum = 0u64;
        let mut count = 0u64;
        for y in y0..y1 {
            for x in x0..x1 {
                sum += diff_map.pixel(x, y)[0] as u64;
                count += 1;
            }
        }

        sum as f64 / count.max(1) as f64
    }
}

impl Default for HotspotDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            grid_size: DEFAULT_GRID_SIZE,
            parallel: true,
        }
    }
}

/// Groups hot cells by 8-connectivity. Seeds are taken in row-major order,
/// so boxes come out in discovery order.
pub fn merge_cells(cells: &Array2<bool>, grid_size: u32) -> Vec<HotspotBox> {
    let (gh, gw) = cells.dim();
    let mut visited = Array2::from_elem((gh, gw), false);
    let mut boxes = Vec::new();

    for gy in 0..gh {
        for gx in 0..gw {
            if !cells[[gy, gx]] || visited[[gy, gx]] {
                continue;
            }

            let (mut min_x, mut min_y, mut max_x, mut max_y) = (gx, gy, gx, gy);
            let mut stack = vec![(gx, gy)];
            visited[[gy, gx]] = true;

            while let Some((cx, cy)) = stack.pop() {
                min_x = min_x.min(cx);
                min_y = min_y.min(cy);
                max_x = max_x.max(cx);
                max_y = max_y.max(cy);

                for ny in cy.saturating_sub(1)..=(cy + 1).min(gh - 1) {
                    for nx in cx.saturating_sub(1)..=(cx + 1).min(gw - 1) {
                        if cells[[ny, nx]] && !visited[[ny, nx]] {
                            visited[[ny, nx]] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            boxes.push(HotspotBox {
                x: min_x as u32 * grid_size,
                y: min_y as u32 * grid_size,
                w: (max_x - min_x + 1) as u32 * grid_size,
                h: (max_y - min_y + 1) as u32 * grid_size,
            });
        }
    }

    boxes
}
