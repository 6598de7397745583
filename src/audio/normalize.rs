//! Audio normalization via an external ffmpeg subprocess.
//!
//! The recognizer consumes 32-bit float samples in `[-1.0, 1.0]` at 16 kHz
//! mono. Uploaded answers arrive in whatever container the browser recorded
//! (usually WebM/Opus), so the normalizer decodes through ffmpeg with raw
//! s16le on stdout and converts the PCM in process. A fast path handles
//! inputs that are already canonical WAV files without spawning anything.
//!
//! ffmpeg is resolved from the `FFMPEG_PATH` environment variable, falling
//! back to `ffmpeg` on `PATH`. Conversion failure is fatal for the request:
//! without a waveform there is nothing to recognize or retry against.

use anyhow::{anyhow, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use std::path::Path;
use tokio::process::Command;

use super::TARGET_SAMPLE_RATE;

pub struct AudioNormalizer {
    ffmpeg_path: String,
}

impl AudioNormalizer {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// Resolve the ffmpeg binary from the environment.
    pub fn from_env() -> Self {
        let path = std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string());
        Self::new(path)
    }

    /// Decode `input` into the canonical waveform.
    pub async fn to_waveform(&self, input: &Path) -> Result<Vec<f32>> {
        if Self::is_canonical_wav(input) {
            tracing::debug!("Input already mono 16kHz s16 WAV, skipping ffmpeg");
            return Self::wav_to_waveform(input);
        }

        let output = Command::new(&self.ffmpeg_path)
            .arg("-nostdin")
            .args(["-threads", "0"])
            .arg("-i")
            .arg(input)
            .args(["-f", "s16le"])
            .args(["-ac", "1"])
            .args(["-acodec", "pcm_s16le"])
            .args(["-ar", &TARGET_SAMPLE_RATE.to_string()])
            .arg("-")
            .output()
            .await
            .with_context(|| format!("Failed to spawn ffmpeg at {:?}", self.ffmpeg_path))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "ffmpeg conversion failed ({}): {}",
                output.status,
                stderr.trim()
            ));
        }

        let samples = Self::pcm_bytes_to_waveform(&output.stdout)?;
        tracing::debug!(
            "Normalized {:?} to {:.2}s of audio",
            input.file_name().unwrap_or_default(),
            samples.len() as f64 / TARGET_SAMPLE_RATE as f64
        );
        Ok(samples)
    }

    /// True when the file is a WAV already matching the target format.
    fn is_canonical_wav(path: &Path) -> bool {
        match hound::WavReader::open(path) {
            Ok(reader) => {
                let spec = reader.spec();
                spec.channels == 1
                    && spec.sample_rate == TARGET_SAMPLE_RATE
                    && spec.bits_per_sample == 16
                    && spec.sample_format == hound::SampleFormat::Int
            }
            Err(_) => false,
        }
    }

    fn wav_to_waveform(path: &Path) -> Result<Vec<f32>> {
        let mut reader =
            hound::WavReader::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0).map_err(Into::into))
            .collect()
    }

    /// Raw little-endian s16 PCM to floats in `[-1.0, 1.0]`.
    fn pcm_bytes_to_waveform(bytes: &[u8]) -> Result<Vec<f32>> {
        if bytes.len() % 2 != 0 {
            return Err(anyhow!("PCM byte stream length must be even"));
        }
        let mut cursor = Cursor::new(bytes);
        let mut samples = Vec::with_capacity(bytes.len() / 2);
        while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
            samples.push(sample as f32 / 32768.0);
        }
        if samples.is_empty() {
            return Err(anyhow!("ffmpeg produced no audio samples"));
        }
        Ok(samples)
    }
}
