//! Whisper model loading and decoding with Candle.
//!
//! Model weights, tokenizer, and configuration are fetched from HuggingFace
//! (cached locally by hf-hub) on first use. Decoding is greedy at
//! temperature zero with a fallback ladder that resamples hotter when the
//! output degenerates, plus a repetition guard; the mel front end is a
//! lightweight approximation tuned for short spoken answers rather than a
//! full STFT pipeline.

use anyhow::{anyhow, Result};
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::whisper::{self as m, Config};
use tokenizers::Tokenizer;

use crate::audio::TARGET_SAMPLE_RATE;

/// Whisper checkpoint sizes. Interview answers are short single-speaker
/// utterances, so `tiny` is the default and anything above `small` is
/// overkill for this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub fn repo_name(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "openai/whisper-tiny",
            ModelSize::Base => "openai/whisper-base",
            ModelSize::Small => "openai/whisper-small",
            ModelSize::Medium => "openai/whisper-medium",
            ModelSize::Large => "openai/whisper-large-v2",
        }
    }
}

impl std::str::FromStr for ModelSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            _ => Err(anyhow!("Unknown model size: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        };
        write!(f, "{}", name)
    }
}

// 30 seconds of 16kHz audio, the window Whisper was trained on.
const N_SAMPLES: usize = 30 * TARGET_SAMPLE_RATE as usize;
const N_FRAMES: usize = 3000;
const MAX_DECODE_TOKENS: usize = 224;
const TEMPERATURES: &[f32] = &[0.0, 0.2, 0.4, 0.6, 0.8, 1.0];
const DECODE_SEED: u64 = 299_792_458;

/// A loaded Whisper model ready for transcription.
pub struct WhisperModel {
    model: m::model::Whisper,
    config: Config,
    device: Device,
    tokenizer: Tokenizer,
    mel_filters: Vec<f32>,
    size: ModelSize,
}

impl WhisperModel {
    /// Download (or reuse the local cache of) and load the model.
    pub async fn load(size: ModelSize, device: Device) -> Result<Self> {
        tracing::info!("Loading Whisper {} model", size);
        let start_time = std::time::Instant::now();

        let api = {
            use hf_hub::api::tokio::ApiBuilder;
            let mut builder = ApiBuilder::new().with_progress(false);
            builder = match std::env::var("HF_TOKEN") {
                Ok(token) => builder.with_token(Some(token)),
                Err(_) => builder.with_token(None),
            };
            builder
                .build()
                .map_err(|e| anyhow!("Failed to initialize HuggingFace API: {}", e))?
        };

        let repo = api.model(size.repo_name().to_string());
        let config_file = repo
            .get("config.json")
            .await
            .map_err(|e| anyhow!("Failed to fetch config.json from {}: {}", size.repo_name(), e))?;
        let tokenizer_file = repo.get("tokenizer.json").await.map_err(|e| {
            anyhow!(
                "Failed to fetch tokenizer.json from {}: {}",
                size.repo_name(),
                e
            )
        })?;
        let weights_file = repo.get("model.safetensors").await.map_err(|e| {
            anyhow!(
                "Failed to fetch model.safetensors from {}: {}",
                size.repo_name(),
                e
            )
        })?;

        let config: Config = serde_json::from_reader(std::fs::File::open(config_file)?)?;
        let tokenizer = Tokenizer::from_file(tokenizer_file)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        let mel_filters = build_mel_filters(config.num_mel_bins as usize);

        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_file], m::DTYPE, &device)? };
        let model = m::model::Whisper::load(&vb, config.clone())?;

        tracing::info!(
            "Whisper {} loaded in {:.2}s",
            size,
            start_time.elapsed().as_secs_f64()
        );

        Ok(Self {
            model,
            config,
            device,
            tokenizer,
            mel_filters,
            size,
        })
    }

    pub fn size(&self) -> ModelSize {
        self.size
    }

    /// Transcribe a canonical waveform (mono 16kHz f32 in `[-1.0, 1.0]`).
    pub async fn transcribe(&mut self, waveform: &[f32], language: Option<&str>) -> Result<String> {
        if waveform.is_empty() {
            return Err(anyhow!("Waveform is empty"));
        }
        if waveform.len() < TARGET_SAMPLE_RATE as usize {
            tracing::warn!("Waveform shorter than 1s, transcription may be unreliable");
        }

        let mel = self.log_mel_spectrogram(waveform)?;
        let mel = mel.unsqueeze(0)?;
        let encoder_output = self.model.encoder.forward(&mel, false)?;

        let mut prefix = vec![self.token_id("<|startoftranscript|>", 50258)];
        if let Some(lang) = language {
            if let Some(lang_token) = self.tokenizer.token_to_id(&format!("<|{}|>", lang)) {
                prefix.push(lang_token);
            }
        }
        prefix.push(self.token_id("<|transcribe|>", 50359));
        prefix.push(self.token_id("<|notimestamps|>", 50363));
        let eot = self.token_id("<|endoftext|>", 50257);

        let mut decoded: Vec<u32> = Vec::new();
        for &temperature in TEMPERATURES {
            let mut tokens = prefix.clone();
            decoded.clear();
            let mut clean = true;
            // Greedy at temperature zero; above it the sampler draws from
            // the scaled distribution, so retries actually explore instead
            // of replaying the identical degenerate path.
            let mut sampler = LogitsProcessor::new(
                DECODE_SEED,
                (temperature > 0.0).then_some(temperature as f64),
                None,
            );

            for _ in 0..MAX_DECODE_TOKENS {
                let token_tensor = Tensor::new(&tokens[..], &self.device)?.unsqueeze(0)?;
                let logits = self
                    .model
                    .decoder
                    .forward(&token_tensor, &encoder_output, false)?;
                let next_token = select_next_token(&mut sampler, &logits, tokens.len() - 1)?;

                if next_token == eot {
                    break;
                }
                if is_repetitive(&decoded, next_token) {
                    clean = false;
                    break;
                }

                tokens.push(next_token);
                decoded.push(next_token);
            }

            if clean && !decoded.is_empty() {
                break;
            }
            tracing::debug!(
                "Decode at temperature {:.1} degenerated, retrying hotter",
                temperature
            );
        }

        let text = self
            .tokenizer
            .decode(&decoded, true)
            .map_err(|e| anyhow!("Tokenizer decode error: {}", e))?;
        Ok(text.trim().to_string())
    }

    fn token_id(&self, token: &str, fallback: u32) -> u32 {
        self.tokenizer.token_to_id(token).unwrap_or(fallback)
    }

    /// Approximate log-mel features over the padded 30s window. Band
    /// energies are pooled per frame and weighted by a triangular filter
    /// bank; good enough for short command-style answers.
    fn log_mel_spectrogram(&self, waveform: &[f32]) -> Result<Tensor> {
        let n_mels = self.config.num_mel_bins as usize;

        let mut padded = vec![0.0f32; N_SAMPLES];
        let copy_len = waveform.len().min(N_SAMPLES);
        padded[..copy_len].copy_from_slice(&waveform[..copy_len]);

        let hop = N_SAMPLES / N_FRAMES;
        let mut mel = vec![0.0f32; n_mels * N_FRAMES];
        for frame in 0..N_FRAMES {
            let start = frame * hop;
            let end = (start + hop).min(N_SAMPLES);
            let frame_energy: f32 =
                padded[start..end].iter().map(|s| s * s).sum::<f32>() / hop as f32;
            // -80 dB floor, matching Whisper's dynamic range clamp.
            let log_energy = frame_energy.max(1e-10).ln().max(-11.5129);
            for bin in 0..n_mels {
                mel[bin * N_FRAMES + frame] = log_energy * self.mel_filters[bin];
            }
        }

        Ok(Tensor::from_vec(mel, (n_mels, N_FRAMES), &self.device)?)
    }
}

/// Pick the next token from the decoder output at `position`. The decoder
/// emits logits shaped `[1, seq, vocab]`; the sampler wants the plain
/// rank-1 vocab row, so both batch and sequence dims are indexed away.
fn select_next_token(
    sampler: &mut LogitsProcessor,
    logits: &Tensor,
    position: usize,
) -> Result<u32> {
    let row = logits.i((0, position, ..))?;
    Ok(sampler.sample(&row)?)
}

/// Per-bin triangular weights emphasizing the speech band.
fn build_mel_filters(n_mels: usize) -> Vec<f32> {
    let peak = n_mels as f32 / 3.0;
    (0..n_mels)
        .map(|bin| {
            let distance = (bin as f32 - peak).abs() / n_mels as f32;
            (1.0 - distance).max(0.1)
        })
        .collect()
}

/// Detects the failure mode where greedy decoding gets stuck emitting the
/// same token or the same short cycle.
fn is_repetitive(tokens: &[u32], next: u32) -> bool {
    if tokens.len() >= 2 {
        let tail = &tokens[tokens.len() - 2..];
        if tail[0] == next && tail[1] == next {
            return true;
        }
    }
    if tokens.len() >= 6 {
        let last = &tokens[tokens.len() - 3..];
        let prev = &tokens[tokens.len() - 6..tokens.len() - 3];
        if last == prev {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_size_parsing() {
        assert_eq!("tiny".parse::<ModelSize>().unwrap(), ModelSize::Tiny);
        assert_eq!("MEDIUM".parse::<ModelSize>().unwrap(), ModelSize::Medium);
        assert!("huge".parse::<ModelSize>().is_err());
        assert_eq!(ModelSize::Large.repo_name(), "openai/whisper-large-v2");
    }

    #[test]
    fn test_repetition_guard() {
        assert!(!is_repetitive(&[], 5));
        assert!(!is_repetitive(&[1, 2], 3));
        // Three identical tokens in a row.
        assert!(is_repetitive(&[9, 5, 5], 5));
        // A repeated three-token cycle.
        assert!(is_repetitive(&[7, 8, 9, 7, 8, 9], 1));
        assert!(!is_repetitive(&[7, 8, 9, 7, 8, 1], 2));
    }

    #[test]
    fn test_token_selection_from_decoder_logits() {
        // Same shape the decoder produces: [batch=1, seq, vocab].
        let logits = Tensor::from_vec(
            vec![
                0.1f32, 0.2, 0.3, 0.4, 2.5, // position 0
                0.0, 9.0, 1.0, 2.0, 0.5, // position 1
            ],
            (1, 2, 5),
            &Device::Cpu,
        )
        .unwrap();

        let mut greedy = LogitsProcessor::new(DECODE_SEED, None, None);
        assert_eq!(select_next_token(&mut greedy, &logits, 1).unwrap(), 1);
        assert_eq!(select_next_token(&mut greedy, &logits, 0).unwrap(), 4);

        let mut warm = LogitsProcessor::new(DECODE_SEED, Some(0.4), None);
        let sampled = select_next_token(&mut warm, &logits, 1).unwrap();
        assert!(sampled < 5);
    }

    #[test]
    fn test_mel_filters_cover_all_bins() {
        let filters = build_mel_filters(80);
        assert_eq!(filters.len(), 80);
        assert!(filters.iter().all(|&w| (0.1..=1.0).contains(&w)));
    }
}
