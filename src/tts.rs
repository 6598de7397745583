//! # Speech Synthesis Adapter
//!
//! Turns question text into MP3 audio. The default implementation calls the
//! Google Translate TTS endpoint (the same service gTTS wraps); callers are
//! expected to cache the result on disk, so each candidate/question pair is
//! synthesized at most once.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` to MP3 bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

const TRANSLATE_TTS_URL: &str = "https://translate.google.com/translate_tts";

pub struct GoogleTranslateTts {
    client: reqwest::Client,
    language: String,
}

impl GoogleTranslateTts {
    pub fn new(language: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build TTS HTTP client")?;

        Ok(Self {
            client,
            language: language.to_string(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        // The endpoint caps query length well above any interview question,
        // but refuse pathological input before it turns into a 400.
        if text.is_empty() {
            return Err(anyhow!("Cannot synthesize empty text"));
        }
        if text.len() > 200 {
            return Err(anyhow!("Text too long for single TTS request"));
        }

        let response = self
            .client
            .get(TRANSLATE_TTS_URL)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.language.as_str()),
                ("q", text),
            ])
            .send()
            .await
            .context("TTS request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("TTS request failed with {}", response.status()));
        }

        let bytes = response.bytes().await.context("TTS body read failed")?;
        if bytes.is_empty() {
            return Err(anyhow!("TTS returned an empty body"));
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_empty_and_oversized_text() {
        let tts = GoogleTranslateTts::new("en").unwrap();
        assert!(tts.synthesize("").await.is_err());
        assert!(tts.synthesize(&"x".repeat(500)).await.is_err());
    }
}
