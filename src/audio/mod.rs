//! # Audio Handling
//!
//! Normalization of uploaded answer audio into the canonical waveform the
//! recognizer expects: mono, 16 kHz, 16-bit PCM. Anything else (WebM from
//! browsers, MP3, odd WAVs) is transcoded by an external `ffmpeg`
//! subprocess; inputs that already match the target format skip the
//! subprocess entirely.

pub mod normalize;

pub use normalize::AudioNormalizer;

/// Sample rate of the canonical waveform.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;
