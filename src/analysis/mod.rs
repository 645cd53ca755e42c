pub mod color;
pub mod diff;
pub mod edges;
pub mod ela;
pub mod fingerprint;
pub mod hotspot;
pub mod text;
