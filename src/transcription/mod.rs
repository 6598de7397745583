//! # Transcription Module
//!
//! Speech-to-text over Whisper models via the Candle framework (pure Rust,
//! no whisper.cpp FFI). The model itself lives in [`model`]; [`engine`]
//! wraps it in the `SpeechRecognizer` service object the orchestrator
//! depends on, with thread-safe one-time lazy loading.

pub mod engine;
pub mod model;

pub use engine::{RecognizerStatus, SpeechRecognizer, WhisperRecognizer};
pub use model::ModelSize;
