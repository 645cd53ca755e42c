use log::debug;
use rayon::prelude::*;

use crate::{
    codec::Reencoder,
    error::{ForensicsError, Result},
    image_utils::luminance,
    pixel::{CHANNELS, PixelBuffer},
};

pub const DEFAULT_QUALITY: u8 = 90;
pub const DEFAULT_AMPLIFICATION: f64 = 4.0;
pub const DEFAULT_BRIGHT_CUTOFF: u8 = 50;

#[derive(Debug, Clone)]
pub struct ElaResult {
    /// Amplified luminance divergence, grayscale-as-RGBA.
    pub map: PixelBuffer,
    /// Share of pixels with any channel above the bright cutoff, 0..=100.
    pub bright_percent: u8,
    pub max_level: u8,
    pub mean_level: f64,
}

pub struct ElaAnalyzer {
    quality: u8,
    amplification: f64,
    bright_cutoff: u8,
    parallel: bool,
}

impl ElaAnalyzer {
    pub fn new(quality: u8) -> Self {
        Self {
            quality,
            amplification: DEFAULT_AMPLIFICATION,
            bright_cutoff: DEFAULT_BRIGHT_CUTOFF,
            parallel: true,
        }
    }

    pub fn with_amplification(mut self, amp: f64) -> Self {
        self.amplification = amp;
        self
    }

    pub fn with_bright_cutoff(mut self, cutoff: u8) -> Self {
        self.bright_cutoff = cutoff;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn analyze(&self, image: &PixelBuffer, reencoder: &dyn Reencoder) -> Result<ElaResult> {
        let map = self.error_map(image, reencoder)?;
        let levels = map.magnitudes();

        let bright_percent = bright_percent(&map, self.bright_cutoff);
        let max_level = levels.iter().copied().max().unwrap_or(0);
        let mean_level = if levels.is_empty() {
            0.0
        } else {
            levels.iter().map(|&v| v as f64).sum::<f64>() / levels.len() as f64
        };

        debug!(
            "ELA q={} amp={}: bright={}% max={} mean={:.2}",
            self.quality, self.amplification, bright_percent, max_level, mean_level
        );

        Ok(ElaResult {
            map,
            bright_percent,
            max_level,
            mean_level,
        })
    }

    /// Round-trips `image` through the lossy codec and maps the amplified
    /// luminance divergence.
    pub fn error_map(&self, image: &PixelBuffer, reencoder: &dyn Reencoder) -> Result<PixelBuffer> {
        let recompressed = reencoder.reencode(image, self.quality)?;
        if recompressed.dimensions() != image.dimensions() {
            return Err(ForensicsError::Codec(format!(
                "re-encoder returned {:?} for a {:?} image",
                recompressed.dimensions(),
                image.dimensions()
            )));
        }

        self.difference_map(image, &recompressed)
    }

    pub fn difference_map(
        &self,
        original: &PixelBuffer,
        recompressed: &PixelBuffer,
    ) -> Result<PixelBuffer> {
        let amp = self.amplification;
        let level = |(a, b): (&[u8], &[u8])| -> u8 {
            ((luminance(a) - luminance(b)).abs() * amp).round().min(255.0) as u8
        };

        let levels = if self.parallel {
            original
                .samples()
                .par_chunks_exact(CHANNELS)
                .zip(recompressed.samples().par_chunks_exact(CHANNELS))
                .map(level)
                .collect::<Vec<_>>()
        } else {
            original.pixels().zip(recompressed.pixels()).map(level).collect()
        };

        PixelBuffer::from_magnitudes(original.width(), original.height(), &levels)
    }
}

impl Default for ElaAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

/// Percentage of pixels where any of R, G, B exceeds `cutoff`, rounded.
pub fn bright_percent(map: &PixelBuffer, cutoff: u8) -> u8 {
    if map.is_empty() {
        return 0;
    }
    let bright = map
        .pixels()
        .filter(|p| p[0] > cutoff || p[1] > cutoff || p[2] > cutoff)
        .count();
    (bright as f64 / map.pixel_count() as f64 * 100.0).round() as u8
}
