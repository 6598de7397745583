//! # Interview Orchestrator
//!
//! The control layer composing the adapters and the authoritative store into
//! the interview workflow: start → ask → answer → finish, plus reporting and
//! answer correction. Handlers stay thin; every business rule lives here.
//!
//! Adapter failure policy (applied uniformly):
//! - **Fatal**: audio normalization and store reads/writes. Without a
//!   waveform there is nothing to transcribe, and the store is the source of
//!   truth — these abort the request.
//! - **Degraded**: speech recognition, synthesis, and blob upload. The
//!   request completes with a sentinel answer or a missing audio URL, the
//!   failure is logged, and — for recognition — the session index does not
//!   advance so the client can retry the same question.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::audio::AudioNormalizer;
use crate::blobstore::BlobStore;
use crate::error::{AppError, AppResult};
use crate::questions::QuestionSet;
use crate::session::{Session, TransitionError};
use crate::store::{CandidateDirectory, SessionStore, TranscriptEntry, TranscriptStore};
use crate::store::Candidate;
use crate::transcription::SpeechRecognizer;
use crate::tts::SpeechSynthesizer;

/// Answer recorded when recognition ran but heard nothing.
pub const NO_SPEECH_SENTINEL: &str = "(Could not detect speech)";
/// Answer recorded when recognition itself failed.
pub const TRANSCRIPTION_FAILED_SENTINEL: &str = "(Transcription failed)";

/// Outcome of starting (or restarting) an interview.
#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub candidate: Candidate,
    pub total_questions: usize,
    pub welcome_audio_url: Option<String>,
}

/// Outcome of asking for the current question.
#[derive(Debug, Clone)]
pub enum NextQuestion {
    Done,
    Question {
        question_index: usize,
        question: String,
        audio_url: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    /// Recognition produced text; the session advanced.
    Ok,
    /// Recognition degraded; the answer holds a sentinel and the session
    /// did not advance.
    Error,
}

impl AnswerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStatus::Ok => "ok",
            AnswerStatus::Error => "error",
        }
    }
}

/// Outcome of an answer submission.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub question_index: usize,
    pub answer_text: String,
    pub status: AnswerStatus,
    pub audio_url: Option<String>,
}

/// A candidate's accumulated transcript, plus the flattened alternating
/// `Q:`/`A:` lines the reporting UI renders.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptReport {
    pub candidate_id: String,
    pub entries: Vec<TranscriptEntry>,
    pub transcript: Vec<String>,
}

pub struct Orchestrator {
    directory: Arc<dyn CandidateDirectory>,
    sessions: Arc<dyn SessionStore>,
    transcripts: Arc<dyn TranscriptStore>,
    blobs: Arc<dyn BlobStore>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    recognizer: Arc<dyn SpeechRecognizer>,
    normalizer: AudioNormalizer,
    questions: QuestionSet,
    static_dir: PathBuf,
    welcome_message: Option<String>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        directory: Arc<dyn CandidateDirectory>,
        sessions: Arc<dyn SessionStore>,
        transcripts: Arc<dyn TranscriptStore>,
        blobs: Arc<dyn BlobStore>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        recognizer: Arc<dyn SpeechRecognizer>,
        normalizer: AudioNormalizer,
        static_dir: impl Into<PathBuf>,
        welcome_message: Option<String>,
    ) -> Self {
        Self {
            directory,
            sessions,
            transcripts,
            blobs,
            synthesizer,
            recognizer,
            normalizer,
            questions: QuestionSet::new(),
            static_dir: static_dir.into(),
            welcome_message,
        }
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Start (or restart) an interview. The candidate must already exist in
    /// the directory; registration happens elsewhere. Any prior session is
    /// replaced by a fresh one at question zero.
    pub async fn start(
        &self,
        candidate_id: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<StartOutcome> {
        let candidate = self.resolve_candidate(candidate_id, email).await?;

        let session = Session::start(candidate.candidate_id.clone());
        self.sessions
            .save(&session)
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        info!(candidate_id = %candidate.candidate_id, "Interview started");

        let welcome_audio_url = match &self.welcome_message {
            Some(message) => {
                self.speech_for(
                    &format!("welcome_{}.mp3", candidate.candidate_id),
                    &format!("{}/welcome.mp3", candidate.candidate_id),
                    message,
                )
                .await
            }
            None => None,
        };

        Ok(StartOutcome {
            candidate,
            total_questions: self.questions.len(),
            welcome_audio_url,
        })
    }

    /// The question the candidate is currently on. Pure read: the index only
    /// moves on accepted answers, so polling this is safe and `Done` repeats
    /// forever once the last answer landed.
    pub async fn next_question(&self, candidate_id: &str) -> AppResult<NextQuestion> {
        let session = self.active_session(candidate_id).await?;

        let index = session.question_index;
        let Some(question) = self.questions.get(index) else {
            return Ok(NextQuestion::Done);
        };

        let audio_url = self
            .speech_for(
                &format!("q_{}_{}.mp3", candidate_id, index),
                &format!("{}/bot_q_{}.mp3", candidate_id, index),
                question,
            )
            .await;

        Ok(NextQuestion::Question {
            question_index: index,
            question: question.to_string(),
            audio_url,
        })
    }

    /// Ingest a recorded answer. `upload_path` is the raw uploaded file on
    /// local disk (a temp file the handler owns and removes), `upload_ext`
    /// its original extension including the dot, or empty.
    pub async fn submit_answer(
        &self,
        candidate_id: &str,
        question_index: usize,
        upload_path: &Path,
        upload_ext: &str,
    ) -> AppResult<AnswerOutcome> {
        let mut session = self.active_session(candidate_id).await?;

        let Some(question) = self.questions.get(question_index) else {
            return Err(AppError::ValidationError(format!(
                "Question index {} out of range (0..{})",
                question_index,
                self.questions.len()
            )));
        };

        // Checked up front: once every question is answered an accepted
        // answer could not advance, and nothing may be persisted for a
        // request that is going to fail.
        if session.is_done(self.questions.len()) {
            return Err(TransitionError::PastEnd.into());
        }

        // Fatal: a waveform is the precondition for everything below.
        let waveform = self
            .normalizer
            .to_waveform(upload_path)
            .await
            .map_err(|e| AppError::Adapter(format!("Audio normalization failed: {}", e)))?;

        let (answer_text, status) = match self.recognizer.recognize(&waveform).await {
            Ok(text) if !text.trim().is_empty() => (text.trim().to_string(), AnswerStatus::Ok),
            Ok(_) => (NO_SPEECH_SENTINEL.to_string(), AnswerStatus::Error),
            Err(e) => {
                warn!(candidate_id, question_index, error = %e, "Recognition failed");
                (TRANSCRIPTION_FAILED_SENTINEL.to_string(), AnswerStatus::Error)
            }
        };

        // The original upload is archived, not the normalized waveform, so
        // a re-transcription later starts from the source material.
        let audio_url = self
            .archive_answer_audio(candidate_id, upload_path, upload_ext)
            .await;

        let entry = TranscriptEntry {
            question_index,
            question: question.to_string(),
            answer: answer_text.clone(),
            audio_url: audio_url.clone(),
            status: status.as_str().to_string(),
            recorded_at: chrono::Utc::now(),
        };
        self.transcripts
            .append(candidate_id, entry)
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

        if status == AnswerStatus::Ok {
            session.advance(self.questions.len())?;
            self.sessions
                .save(&session)
                .await
                .map_err(|e| AppError::Store(e.to_string()))?;
            info!(
                candidate_id,
                question_index,
                next_index = session.question_index,
                "Answer accepted"
            );
        } else {
            info!(candidate_id, question_index, "Answer degraded, index not advanced");
        }

        Ok(AnswerOutcome {
            question_index,
            answer_text,
            status,
            audio_url,
        })
    }

    /// Close the interview and hand back the transcript. The session row is
    /// marked finished (kept, not deleted); finishing twice is a 400.
    pub async fn finish(&self, candidate_id: &str) -> AppResult<TranscriptReport> {
        let mut session = self
            .sessions
            .load(candidate_id)
            .await
            .map_err(|e| AppError::Store(e.to_string()))?
            .ok_or_else(|| {
                AppError::NotFound(format!("No session for candidate {}", candidate_id))
            })?;

        session.finish()?;
        self.sessions
            .save(&session)
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        info!(candidate_id, answered = session.question_index, "Interview finished");

        self.report(candidate_id).await
    }

    /// The transcript as stored, without touching the session.
    pub async fn report(&self, candidate_id: &str) -> AppResult<TranscriptReport> {
        let entries = self
            .transcripts
            .list(candidate_id)
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

        let mut transcript = Vec::with_capacity(entries.len() * 2);
        for entry in &entries {
            transcript.push(format!("Q: {}", entry.question));
            transcript.push(format!("A: {}", entry.answer));
        }

        Ok(TranscriptReport {
            candidate_id: candidate_id.to_string(),
            entries,
            transcript,
        })
    }

    /// Replace a recorded answer in place. Entries are addressed by question
    /// index, so duplicate question text cannot corrupt the match.
    pub async fn update_answer(
        &self,
        candidate_id: &str,
        question_index: usize,
        new_answer: &str,
    ) -> AppResult<()> {
        if self.questions.get(question_index).is_none() {
            return Err(AppError::ValidationError(format!(
                "Question index {} out of range (0..{})",
                question_index,
                self.questions.len()
            )));
        }

        let updated = self
            .transcripts
            .update_answer(candidate_id, question_index, new_answer)
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        if !updated {
            return Err(AppError::NotFound(format!(
                "No recorded answer for candidate {} at question {}",
                candidate_id, question_index
            )));
        }
        Ok(())
    }

    async fn resolve_candidate(
        &self,
        candidate_id: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<Candidate> {
        let lookup = if let Some(id) = candidate_id.map(str::trim).filter(|s| !s.is_empty()) {
            self.directory.find_by_id(id).await
        } else if let Some(email) = email.map(str::trim).filter(|s| !s.is_empty()) {
            self.directory.find_by_email(email).await
        } else {
            return Err(AppError::BadRequest(
                "Either candidate_id or email is required".to_string(),
            ));
        };

        lookup
            .map_err(|e| AppError::Store(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Candidate not found".to_string()))
    }

    async fn active_session(&self, candidate_id: &str) -> AppResult<Session> {
        let session = self
            .sessions
            .load(candidate_id)
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        match session {
            Some(session) if session.is_active() => Ok(session),
            _ => Err(AppError::NotFound(format!(
                "No active session for candidate {}",
                candidate_id
            ))),
        }
    }

    /// Synthesize `text`, caching the MP3 under the static dir by
    /// `cache_name` (so repeated asks reuse the local file), upload it under
    /// `blob_key`, and return the public address. Degraded on any failure.
    async fn speech_for(&self, cache_name: &str, blob_key: &str, text: &str) -> Option<String> {
        let cache_path = self.static_dir.join(cache_name);

        let bytes = if tokio::fs::try_exists(&cache_path).await.unwrap_or(false) {
            match tokio::fs::read(&cache_path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = ?cache_path, error = %e, "Failed to read cached speech");
                    return None;
                }
            }
        } else {
            let bytes = match self.synthesizer.synthesize(text).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "Speech synthesis failed");
                    return None;
                }
            };
            if let Err(e) = tokio::fs::create_dir_all(&self.static_dir).await {
                warn!(dir = ?self.static_dir, error = %e, "Failed to create static dir");
            } else if let Err(e) = tokio::fs::write(&cache_path, &bytes).await {
                warn!(path = ?cache_path, error = %e, "Failed to cache speech file");
            }
            bytes
        };

        match self.blobs.upload(blob_key, bytes, "audio/mpeg", true).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(blob_key, error = %e, "Speech upload failed");
                None
            }
        }
    }

    /// Upload the original answer recording under a fresh random key scoped
    /// to the candidate. Degraded on failure: the transcript entry simply
    /// carries no audio URL.
    async fn archive_answer_audio(
        &self,
        candidate_id: &str,
        upload_path: &Path,
        upload_ext: &str,
    ) -> Option<String> {
        let bytes = match tokio::fs::read(upload_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(candidate_id, error = %e, "Failed to read uploaded audio");
                return None;
            }
        };

        let key = format!(
            "{}/{}{}",
            candidate_id,
            uuid::Uuid::new_v4().simple(),
            upload_ext
        );
        match self
            .blobs
            .upload(&key, bytes, "application/octet-stream", false)
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(candidate_id, key, error = %e, "Answer audio upload failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::TARGET_SAMPLE_RATE;
    use crate::blobstore::LocalBlobStore;
    use crate::store::MemoryStore;
    use crate::transcription::RecognizerStatus;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Recognizer that replays a script of results, then falls back to a
    /// fixed phrase.
    struct ScriptedRecognizer {
        script: StdMutex<VecDeque<Result<String, String>>>,
    }

    impl ScriptedRecognizer {
        fn new(script: Vec<Result<String, String>>) -> Self {
            Self {
                script: StdMutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl SpeechRecognizer for ScriptedRecognizer {
        async fn recognize(&self, _waveform: &[f32]) -> anyhow::Result<String> {
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(msg)) => Err(anyhow!(msg)),
                None => Ok("five years".to_string()),
            }
        }

        fn status(&self) -> RecognizerStatus {
            RecognizerStatus {
                model: "scripted".to_string(),
                loaded: true,
            }
        }
    }

    struct FixedSynthesizer;

    #[async_trait]
    impl crate::tts::SpeechSynthesizer for FixedSynthesizer {
        async fn synthesize(&self, _text: &str) -> anyhow::Result<Vec<u8>> {
            Ok(vec![0xFF, 0xFB, 0x00, 0x00])
        }
    }

    struct FailingSynthesizer;

    #[async_trait]
    impl crate::tts::SpeechSynthesizer for FailingSynthesizer {
        async fn synthesize(&self, _text: &str) -> anyhow::Result<Vec<u8>> {
            Err(anyhow!("tts offline"))
        }
    }

    struct Fixture {
        orchestrator: Orchestrator,
        _static_dir: tempfile::TempDir,
        upload_dir: tempfile::TempDir,
    }

    fn fixture_with(recognizer: Arc<dyn SpeechRecognizer>, tts_ok: bool) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store.add_candidate(Candidate {
            candidate_id: "C1".to_string(),
            name: Some("Ada".to_string()),
            email: "a@x.com".to_string(),
        });

        let static_dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(LocalBlobStore::new(static_dir.path()));
        let synthesizer: Arc<dyn crate::tts::SpeechSynthesizer> = if tts_ok {
            Arc::new(FixedSynthesizer)
        } else {
            Arc::new(FailingSynthesizer)
        };

        let orchestrator = Orchestrator::new(
            store.clone(),
            store.clone(),
            store,
            blobs,
            synthesizer,
            recognizer,
            // Uploads in these tests are canonical WAVs, so the fast path
            // keeps ffmpeg out of the picture entirely.
            AudioNormalizer::new("/nonexistent/ffmpeg"),
            static_dir.path(),
            Some("Welcome to your interview.".to_string()),
        );

        Fixture {
            orchestrator,
            _static_dir: static_dir,
            upload_dir: tempfile::tempdir().unwrap(),
        }
    }

    fn fixture(script: Vec<Result<String, String>>) -> Fixture {
        fixture_with(Arc::new(ScriptedRecognizer::new(script)), true)
    }

    /// A half-second canonical WAV with a tone on it.
    fn answer_wav(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: TARGET_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..TARGET_SAMPLE_RATE / 2 {
            writer
                .write_sample(((i as f32 * 0.08).sin() * 12000.0) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[tokio::test]
    async fn test_full_happy_path() {
        let f = fixture(vec![Ok("five years".to_string())]);

        let started = f.orchestrator.start(None, Some("a@x.com")).await.unwrap();
        assert_eq!(started.candidate.candidate_id, "C1");
        assert_eq!(started.total_questions, 6);
        assert!(started.welcome_audio_url.is_some());

        match f.orchestrator.next_question("C1").await.unwrap() {
            NextQuestion::Question {
                question_index,
                question,
                audio_url,
            } => {
                assert_eq!(question_index, 0);
                assert_eq!(question, "How many years of experience do you have?");
                assert_eq!(audio_url.as_deref(), Some("/static/C1/bot_q_0.mp3"));
            }
            NextQuestion::Done => panic!("expected a question"),
        }

        let wav = answer_wav(f.upload_dir.path(), "a0.wav");
        let outcome = f
            .orchestrator
            .submit_answer("C1", 0, &wav, ".wav")
            .await
            .unwrap();
        assert_eq!(outcome.status, AnswerStatus::Ok);
        assert_eq!(outcome.answer_text, "five years");
        assert!(outcome.audio_url.is_some());

        match f.orchestrator.next_question("C1").await.unwrap() {
            NextQuestion::Question { question_index, .. } => assert_eq!(question_index, 1),
            NextQuestion::Done => panic!("expected question 1"),
        }
    }

    #[tokio::test]
    async fn test_degraded_recognition_does_not_advance() {
        let f = fixture(vec![Ok(String::new()), Ok("five years".to_string())]);
        f.orchestrator.start(Some("C1"), None).await.unwrap();

        let wav = answer_wav(f.upload_dir.path(), "a0.wav");
        let degraded = f
            .orchestrator
            .submit_answer("C1", 0, &wav, ".wav")
            .await
            .unwrap();
        assert_eq!(degraded.status, AnswerStatus::Error);
        assert_eq!(degraded.answer_text, NO_SPEECH_SENTINEL);

        // Index unchanged: the same question is still up.
        match f.orchestrator.next_question("C1").await.unwrap() {
            NextQuestion::Question { question_index, .. } => assert_eq!(question_index, 0),
            NextQuestion::Done => panic!("index must not have advanced"),
        }

        // A clearer retry at the same index succeeds and advances.
        let retry = f
            .orchestrator
            .submit_answer("C1", 0, &wav, ".wav")
            .await
            .unwrap();
        assert_eq!(retry.status, AnswerStatus::Ok);

        let report = f.orchestrator.report("C1").await.unwrap();
        assert_eq!(report.entries.len(), 2);

        match f.orchestrator.next_question("C1").await.unwrap() {
            NextQuestion::Question { question_index, .. } => assert_eq!(question_index, 1),
            NextQuestion::Done => panic!("expected question 1"),
        }
    }

    #[tokio::test]
    async fn test_recognizer_error_becomes_sentinel() {
        let f = fixture(vec![Err("model exploded".to_string())]);
        f.orchestrator.start(Some("C1"), None).await.unwrap();

        let wav = answer_wav(f.upload_dir.path(), "a0.wav");
        let outcome = f
            .orchestrator
            .submit_answer("C1", 0, &wav, ".wav")
            .await
            .unwrap();
        assert_eq!(outcome.status, AnswerStatus::Error);
        assert_eq!(outcome.answer_text, TRANSCRIPTION_FAILED_SENTINEL);
    }

    #[tokio::test]
    async fn test_done_is_idempotent() {
        let f = fixture(vec![]);
        f.orchestrator.start(Some("C1"), None).await.unwrap();

        let wav = answer_wav(f.upload_dir.path(), "a.wav");
        for index in 0..6 {
            let outcome = f
                .orchestrator
                .submit_answer("C1", index, &wav, ".wav")
                .await
                .unwrap();
            assert_eq!(outcome.status, AnswerStatus::Ok);
        }

        for _ in 0..3 {
            assert!(matches!(
                f.orchestrator.next_question("C1").await.unwrap(),
                NextQuestion::Done
            ));
        }
    }

    #[tokio::test]
    async fn test_resubmission_after_last_answer_is_rejected() {
        let f = fixture(vec![]);
        f.orchestrator.start(Some("C1"), None).await.unwrap();
        let wav = answer_wav(f.upload_dir.path(), "a.wav");
        for index in 0..6 {
            f.orchestrator
                .submit_answer("C1", index, &wav, ".wav")
                .await
                .unwrap();
        }

        assert!(matches!(
            f.orchestrator.submit_answer("C1", 5, &wav, ".wav").await,
            Err(AppError::ValidationError(_))
        ));

        // The rejected request left no trace in the transcript.
        let report = f.orchestrator.report("C1").await.unwrap();
        assert_eq!(report.entries.len(), 6);
    }

    #[tokio::test]
    async fn test_restart_resets_progress() {
        let f = fixture(vec![]);
        f.orchestrator.start(Some("C1"), None).await.unwrap();
        let wav = answer_wav(f.upload_dir.path(), "a.wav");
        f.orchestrator
            .submit_answer("C1", 0, &wav, ".wav")
            .await
            .unwrap();

        f.orchestrator.start(Some("C1"), None).await.unwrap();
        match f.orchestrator.next_question("C1").await.unwrap() {
            NextQuestion::Question { question_index, .. } => assert_eq!(question_index, 0),
            NextQuestion::Done => panic!("restart must reset the index"),
        }
    }

    #[tokio::test]
    async fn test_finish_marks_and_rejects_double_finish() {
        let f = fixture(vec![]);
        f.orchestrator.start(Some("C1"), None).await.unwrap();
        let wav = answer_wav(f.upload_dir.path(), "a.wav");
        f.orchestrator
            .submit_answer("C1", 0, &wav, ".wav")
            .await
            .unwrap();

        let report = f.orchestrator.finish("C1").await.unwrap();
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.transcript.len(), 2);
        assert!(report.transcript[0].starts_with("Q: "));
        assert_eq!(report.transcript[1], "A: five years");

        match f.orchestrator.finish("C1").await {
            Err(AppError::ValidationError(msg)) => assert!(msg.contains("already finished")),
            other => panic!("double finish must be rejected, got {:?}", other.map(|_| ())),
        }

        // A finished session no longer serves questions.
        assert!(matches!(
            f.orchestrator.next_question("C1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_candidate_is_not_found() {
        let f = fixture(vec![]);
        assert!(matches!(
            f.orchestrator.start(Some("ghost"), None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.orchestrator.start(None, Some("ghost@x.com")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.orchestrator.start(None, None).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            f.orchestrator.next_question("ghost").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_answer_by_index() {
        let f = fixture(vec![]);
        f.orchestrator.start(Some("C1"), None).await.unwrap();
        let wav = answer_wav(f.upload_dir.path(), "a.wav");
        f.orchestrator
            .submit_answer("C1", 0, &wav, ".wav")
            .await
            .unwrap();

        f.orchestrator
            .update_answer("C1", 0, "six years")
            .await
            .unwrap();
        let report = f.orchestrator.report("C1").await.unwrap();
        assert_eq!(report.entries[0].answer, "six years");
        assert_eq!(report.entries[0].status, "updated");

        assert!(matches!(
            f.orchestrator.update_answer("C1", 42, "x").await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            f.orchestrator.update_answer("C1", 3, "x").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_synthesis_failure_degrades_to_text_only() {
        let f = fixture_with(Arc::new(ScriptedRecognizer::new(vec![])), false);
        let started = f.orchestrator.start(Some("C1"), None).await.unwrap();
        assert!(started.welcome_audio_url.is_none());

        match f.orchestrator.next_question("C1").await.unwrap() {
            NextQuestion::Question {
                question, audio_url, ..
            } => {
                assert!(!question.is_empty());
                assert!(audio_url.is_none());
            }
            NextQuestion::Done => panic!("expected a question"),
        }
    }

    #[tokio::test]
    async fn test_bad_question_index_is_validation_error() {
        let f = fixture(vec![]);
        f.orchestrator.start(Some("C1"), None).await.unwrap();
        let wav = answer_wav(f.upload_dir.path(), "a.wav");
        assert!(matches!(
            f.orchestrator.submit_answer("C1", 99, &wav, ".wav").await,
            Err(AppError::ValidationError(_))
        ));
    }
}
