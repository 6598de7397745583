//! # Authoritative Store
//!
//! One store owns all persisted interview state: the candidate directory
//! (read-only here, populated by an external registration process), the
//! session rows, and the per-candidate transcript. The earlier dual-write
//! design (sessions in one database, transcripts in another) is collapsed
//! behind these traits so every deployment has exactly one source of truth.
//!
//! Two backends:
//! - [`memory::MemoryStore`] — in-process maps, for development and tests.
//! - [`supabase::SupabaseStore`] — Supabase PostgREST tables `candidates`,
//!   `sessions`, `transcripts`.

pub mod memory;
pub mod supabase;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Session;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

/// A person being interviewed. Stable identifier plus profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
}

/// One question/answer pair in a candidate's transcript. Entries are
/// appended in question order and never deleted; `status` starts as "ok" or
/// "error" (degraded recognition) and becomes "updated" after a manual
/// correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub question_index: usize,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    pub status: String,
    pub recorded_at: DateTime<Utc>,
}

/// Lookup keyed by candidate id or email. Pre-populated elsewhere; this
/// service never writes it.
#[async_trait]
pub trait CandidateDirectory: Send + Sync {
    async fn find_by_id(&self, candidate_id: &str) -> Result<Option<Candidate>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Candidate>>;
}

/// Interview progress rows, at most one per candidate. `save` is an upsert:
/// starting an interview replaces any prior session outright.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, candidate_id: &str) -> Result<Option<Session>>;
    async fn save(&self, session: &Session) -> Result<()>;
}

/// Append-only per-candidate answer log.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append(&self, candidate_id: &str, entry: TranscriptEntry) -> Result<()>;

    /// All entries for the candidate, in question order.
    async fn list(&self, candidate_id: &str) -> Result<Vec<TranscriptEntry>>;

    /// Replace the answer text of the entry at `question_index` and mark it
    /// "updated". Returns `false` when no entry matches.
    async fn update_answer(
        &self,
        candidate_id: &str,
        question_index: usize,
        new_answer: &str,
    ) -> Result<bool>;
}
