//! AudioStitcher: decode per-turn audio, insert fixed inter-turn silence,
//! and re-encode the concatenated stream as one MP3 (§4.7).

pub mod decode;
pub mod encode;
pub mod silence;
pub mod stitcher;

pub use stitcher::{AudioStitcher, StitchOutcome};
