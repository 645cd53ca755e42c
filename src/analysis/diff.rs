//! Pixel-level comparison between two images aligned to a common width.

use crate::{error::Result, image_utils::luminance, pixel::PixelBuffer};

pub const ELA_DIFF_GAIN: u16 = 2;

/// Mean absolute luminance difference as a rounded percentage of full scale.
///
/// Only pixel indices present in both buffers contribute; if the heights
/// differ the comparison stops at the shorter one.
pub fn pixel_diff_percent(trusted: &PixelBuffer, suspect: &PixelBuffer) -> u8 {
    let shared = trusted.pixel_count().min(suspect.pixel_count());
    if shared == 0 {
        return 0;
    }

    let total = trusted
        .pixels()
        .zip(suspect.pixels())
        .map(|(t, s)| (luminance(t) - luminance(s)).abs())
        .sum::<f64>();

    (total / (shared as f64 * 255.0) * 100.0).round() as u8
}

/// `min(255, max(0, suspect - trusted) * 2)` over the red channel of two ELA
/// maps. Only error levels higher in the suspect count.
///
/// The result has the suspect's dimensions; pixels past the end of the
/// trusted map read as zero.
pub fn ela_diff_map(trusted_ela: &PixelBuffer, suspect_ela: &PixelBuffer) -> Result<PixelBuffer> {
    let trusted = trusted_ela.magnitudes();

    let levels = suspect_ela
        .pixels()
        .enumerate()
        .map(|(i, s)| match trusted.get(i) {
            Some(&t) => {
                let d = s[0].saturating_sub(t) as u16;
                (d * ELA_DIFF_GAIN).min(255) as u8
            }
            None => 0,
        })
        .collect::<Vec<_>>();

    PixelBuffer::from_magnitudes(suspect_ela.width(), suspect_ela.height(), &levels)
}
