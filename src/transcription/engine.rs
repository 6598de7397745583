//! The speech recognition service object.
//!
//! `WhisperRecognizer` is constructed once at startup and shared; the
//! underlying model is heavy, so it is loaded lazily behind a
//! `tokio::sync::OnceCell` — exactly one loader runs no matter how many
//! submissions race, and every later call reuses the loaded model. There is
//! no global mutable handle anywhere.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use candle_core::Device;
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};

use crate::transcription::model::{ModelSize, WhisperModel};

/// Best-effort waveform-to-text. Failures are surfaced as errors and it is
/// the caller's policy whether to degrade or abort.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, waveform: &[f32]) -> Result<String>;

    /// For health reporting.
    fn status(&self) -> RecognizerStatus;
}

#[derive(Debug, Clone, Serialize)]
pub struct RecognizerStatus {
    pub model: String,
    pub loaded: bool,
}

pub struct WhisperRecognizer {
    size: ModelSize,
    language: String,
    device: Device,
    // Decoding needs &mut (KV cache), so the loaded model sits behind an
    // async Mutex; transcriptions for concurrent submissions serialize here.
    model: OnceCell<Mutex<WhisperModel>>,
}

impl WhisperRecognizer {
    pub fn new(size: ModelSize, language: &str) -> Self {
        Self {
            size,
            language: language.to_string(),
            device: Device::Cpu,
            model: OnceCell::new(),
        }
    }

    async fn model(&self) -> Result<&Mutex<WhisperModel>> {
        self.model
            .get_or_try_init(|| async {
                let model = WhisperModel::load(self.size, self.device.clone()).await?;
                Ok(Mutex::new(model))
            })
            .await
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperRecognizer {
    async fn recognize(&self, waveform: &[f32]) -> Result<String> {
        if waveform.is_empty() {
            return Err(anyhow!("No audio samples to recognize"));
        }
        let model = self.model().await?;
        let mut guard = model.lock().await;
        guard.transcribe(waveform, Some(&self.language)).await
    }

    fn status(&self) -> RecognizerStatus {
        RecognizerStatus {
            model: self.size.to_string(),
            loaded: self.model.get().is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_before_first_use() {
        let recognizer = WhisperRecognizer::new(ModelSize::Tiny, "en");
        let status = recognizer.status();
        assert_eq!(status.model, "tiny");
        assert!(!status.loaded);
    }
}
