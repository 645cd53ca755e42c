//! 64-bit average hash (aHash) over an 8x8 area downsample.

use std::fmt;

use log::debug;

use crate::{
    error::Result,
    image_utils::{area_resample, luminance},
    pixel::PixelBuffer,
};

pub const HASH_SIDE: u32 = 8;
pub const HASH_BITS: u32 = HASH_SIDE * HASH_SIDE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Bit `i` (row-major, most significant first) is set iff the rounded
    /// luminance of downsampled pixel `i` is `>=` the mean. A flat image
    /// therefore hashes to all ones.
    pub fn compute(buf: &PixelBuffer) -> Result<Self> {
        let small = area_resample(buf, HASH_SIDE, HASH_SIDE)?;
        let values = small
            .pixels()
            .map(|p| luminance(p).round())
            .collect::<Vec<_>>();
        let mean = values.iter().sum::<f64>() / values.len() as f64;

        let bits = values
            .iter()
            .fold(0u64, |acc, &v| (acc << 1) | u64::from(v >= mean));

        Ok(Self(bits))
    }

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Accepts 1 to 16 hex digits, either case.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.is_empty() || hex.len() > 16 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(hex, 16).ok().map(Self)
    }

    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    pub fn hamming(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Hamming distance between two serialized fingerprints.
///
/// Strings that do not parse as 64-bit hex are compared character by
/// character after left-padding with `'0'`; an empty side counts as the
/// maximum distance.
pub fn hamming_hex(a: &str, b: &str) -> u32 {
    if let (Some(fa), Some(fb)) = (Fingerprint::from_hex(a), Fingerprint::from_hex(b)) {
        return fa.hamming(&fb);
    }

    debug!("fingerprint parse failed, falling back to character compare");
    if a.is_empty() || b.is_empty() {
        return HASH_BITS;
    }

    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();
    let len = a.len().max(b.len());
    let padded = |s: &[char]| {
        std::iter::repeat_n('0', len - s.len())
            .chain(s.iter().copied())
            .collect::<Vec<_>>()
    };

    padded(&a)
        .iter()
        .zip(padded(&b).iter())
        .filter(|(x, y)| x != y)
        .count() as u32
}

/// `round((1 - min(d, 64) / 64) * 100)`.
pub fn similarity_percent(distance: u32) -> u8 {
    let d = distance.min(HASH_BITS) as f64;
    ((1.0 - d / HASH_BITS as f64) * 100.0).round() as u8
}
