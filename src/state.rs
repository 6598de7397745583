//! # Application State Management
//!
//! Shared state handed to every HTTP request handler. Configuration and
//! metrics live behind `Arc<RwLock<T>>` so many requests can read
//! concurrently while updates take an exclusive lock; the orchestrator is
//! internally synchronized and only needs the `Arc`.

use crate::audio::AudioNormalizer;
use crate::blobstore::{BlobStore, LocalBlobStore, SupabaseBlobStore};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::orchestrator::Orchestrator;
use crate::store::{CandidateDirectory, MemoryStore, SessionStore, SupabaseStore, TranscriptStore};
use crate::transcription::{ModelSize, RecognizerStatus, SpeechRecognizer, WhisperRecognizer};
use crate::tts::GoogleTranslateTts;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime).
    pub config: Arc<RwLock<AppConfig>>,

    /// Counters updated by middleware and handlers.
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started. `Instant` is `Copy`, no lock needed.
    pub start_time: Instant,

    pub orchestrator: Arc<Orchestrator>,

    recognizer: Arc<dyn SpeechRecognizer>,
}

/// Counters collected across all HTTP requests plus the interview workflow.
#[derive(Debug, Default)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,
    pub interviews_started: u64,
    pub interviews_finished: u64,
    /// Answers where recognition produced text and the session advanced.
    pub answers_transcribed: u64,
    /// Answers recorded with a sentinel because recognition degraded.
    pub answers_degraded: u64,
    /// Per-endpoint statistics, keyed as "METHOD /path".
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Request/error counts and cumulative latency for one endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        orchestrator: Arc<Orchestrator>,
        recognizer: Arc<dyn SpeechRecognizer>,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            orchestrator,
            recognizer,
        }
    }

    /// Wire up the full adapter set from configuration: the store backend
    /// (in-memory or Supabase), blob storage, TTS, and the recognizer.
    pub fn build(config: AppConfig) -> AppResult<Self> {
        let (directory, sessions, transcripts, blobs): (
            Arc<dyn CandidateDirectory>,
            Arc<dyn SessionStore>,
            Arc<dyn TranscriptStore>,
            Arc<dyn BlobStore>,
        ) = match config.storage.backend.as_str() {
            "supabase" => {
                let store = Arc::new(SupabaseStore::new(
                    &config.storage.supabase_url,
                    &config.storage.supabase_key,
                )?);
                let blobs = Arc::new(SupabaseBlobStore::new(
                    &config.storage.supabase_url,
                    &config.storage.supabase_key,
                    &config.storage.bucket,
                )?);
                (store.clone(), store.clone(), store, blobs)
            }
            "memory" => {
                let store = Arc::new(MemoryStore::new());
                let blobs = Arc::new(LocalBlobStore::new(&config.interview.static_dir));
                (store.clone(), store.clone(), store, blobs)
            }
            other => {
                return Err(AppError::Config(format!("Unknown storage backend: {}", other)));
            }
        };

        let size: ModelSize = config
            .models
            .whisper_model
            .parse()
            .map_err(|e| AppError::Config(format!("{}", e)))?;
        let recognizer: Arc<dyn SpeechRecognizer> =
            Arc::new(WhisperRecognizer::new(size, &config.models.language));

        let synthesizer = Arc::new(GoogleTranslateTts::new(&config.models.language)?);

        let welcome = if config.interview.welcome_message.trim().is_empty() {
            None
        } else {
            Some(config.interview.welcome_message.clone())
        };

        let orchestrator = Arc::new(Orchestrator::new(
            directory,
            sessions,
            transcripts,
            blobs,
            synthesizer,
            recognizer.clone(),
            AudioNormalizer::from_env(),
            &config.interview.static_dir,
            welcome,
        ));

        Ok(Self::new(config, orchestrator, recognizer))
    }

    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    pub fn recognizer_status(&self) -> RecognizerStatus {
        self.recognizer.status()
    }

    pub fn increment_request_count(&self) {
        self.metrics.write().unwrap().request_count += 1;
    }

    pub fn increment_error_count(&self) {
        self.metrics.write().unwrap().error_count += 1;
    }

    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        let endpoint_metric = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    pub fn record_interview_started(&self) {
        self.metrics.write().unwrap().interviews_started += 1;
    }

    pub fn record_interview_finished(&self) {
        self.metrics.write().unwrap().interviews_finished += 1;
    }

    pub fn record_answer(&self, degraded: bool) {
        let mut metrics = self.metrics.write().unwrap();
        if degraded {
            metrics.answers_degraded += 1;
        } else {
            metrics.answers_transcribed += 1;
        }
    }

    /// Snapshot under a read lock so serialization doesn't hold it.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            interviews_started: metrics.interviews_started,
            interviews_finished: metrics.interviews_finished,
            answers_transcribed: metrics.answers_transcribed,
            answers_degraded: metrics.answers_degraded,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_metrics_accumulate() {
        let state = AppState::build(AppConfig::default()).unwrap();
        state.record_endpoint_request("POST /api/start_interview", 20, false);
        state.record_endpoint_request("POST /api/start_interview", 40, true);
        state.record_endpoint_request("GET /health", 1, false);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["POST /api/start_interview"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.total_duration_ms, 60);
        assert_eq!(metric.error_count, 1);
        assert!((metric.average_duration_ms() - 30.0).abs() < f64::EPSILON);
        assert!((metric.error_rate() - 0.5).abs() < f64::EPSILON);
        assert_eq!(snapshot.endpoint_metrics["GET /health"].error_count, 0);
    }
}
