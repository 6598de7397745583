//! Supabase (PostgREST) store backend.
//!
//! Tables:
//! - `candidates (candidate_id, name, email)` — read-only here
//! - `sessions (candidate_id unique, q_index, status)`
//! - `transcripts (candidate_id, question_index, question, answer,
//!    audio_url, status, recorded_at)`
//!
//! Every call is a plain REST request authenticated with the service-role
//! key; `save` relies on PostgREST upsert (`on_conflict=candidate_id` with
//! merge-duplicates) so starting an interview replaces any prior session in
//! a single round trip.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Candidate, CandidateDirectory, SessionStore, TranscriptEntry, TranscriptStore};
use crate::session::{Session, SessionStatus};

pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Wire shape of a `sessions` row. Kept separate from the domain `Session`
/// so the column names (`q_index`) stay a storage detail.
#[derive(Debug, Serialize, Deserialize)]
struct SessionRow {
    candidate_id: String,
    q_index: i64,
    status: String,
}

impl SessionRow {
    fn from_session(session: &Session) -> Self {
        Self {
            candidate_id: session.candidate_id.clone(),
            q_index: session.question_index as i64,
            status: match session.status {
                SessionStatus::Active => "active".to_string(),
                SessionStatus::Finished => "finished".to_string(),
            },
        }
    }

    fn into_session(self) -> Result<Session> {
        let status = match self.status.as_str() {
            "active" => SessionStatus::Active,
            "finished" => SessionStatus::Finished,
            other => return Err(anyhow!("Unknown session status in store: {}", other)),
        };
        Ok(Session {
            candidate_id: self.candidate_id,
            question_index: self.q_index.max(0) as usize,
            status,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TranscriptRow {
    candidate_id: String,
    question_index: i64,
    question: String,
    answer: String,
    #[serde(default)]
    audio_url: Option<String>,
    status: String,
    recorded_at: chrono::DateTime<chrono::Utc>,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build Supabase HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Supabase {} failed: {} - {}", what, status, body));
        }
        Ok(response)
    }

    async fn select_candidates(&self, column: &str, value: &str) -> Result<Option<Candidate>> {
        let response = self
            .authed(self.client.get(self.table_url("candidates")))
            .query(&[(column, format!("eq.{}", value)), ("select", "*".to_string())])
            .send()
            .await?;
        let mut rows: Vec<Candidate> = Self::check(response, "candidate lookup")
            .await?
            .json()
            .await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }
}

#[async_trait]
impl CandidateDirectory for SupabaseStore {
    async fn find_by_id(&self, candidate_id: &str) -> Result<Option<Candidate>> {
        self.select_candidates("candidate_id", candidate_id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Candidate>> {
        self.select_candidates("email", email).await
    }
}

#[async_trait]
impl SessionStore for SupabaseStore {
    async fn load(&self, candidate_id: &str) -> Result<Option<Session>> {
        let response = self
            .authed(self.client.get(self.table_url("sessions")))
            .query(&[
                ("candidate_id", format!("eq.{}", candidate_id)),
                ("select", "*".to_string()),
            ])
            .send()
            .await?;
        let mut rows: Vec<SessionRow> = Self::check(response, "session load").await?.json().await?;
        if rows.is_empty() {
            return Ok(None);
        }
        rows.remove(0).into_session().map(Some)
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let row = SessionRow::from_session(session);
        let response = self
            .authed(self.client.post(self.table_url("sessions")))
            .query(&[("on_conflict", "candidate_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&row)
            .send()
            .await?;
        Self::check(response, "session save").await?;
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for SupabaseStore {
    async fn append(&self, candidate_id: &str, entry: TranscriptEntry) -> Result<()> {
        let row = TranscriptRow {
            candidate_id: candidate_id.to_string(),
            question_index: entry.question_index as i64,
            question: entry.question,
            answer: entry.answer,
            audio_url: entry.audio_url,
            status: entry.status,
            recorded_at: entry.recorded_at,
        };
        let response = self
            .authed(self.client.post(self.table_url("transcripts")))
            .json(&row)
            .send()
            .await?;
        Self::check(response, "transcript append").await?;
        Ok(())
    }

    async fn list(&self, candidate_id: &str) -> Result<Vec<TranscriptEntry>> {
        let response = self
            .authed(self.client.get(self.table_url("transcripts")))
            .query(&[
                ("candidate_id", format!("eq.{}", candidate_id)),
                ("select", "*".to_string()),
                ("order", "question_index.asc,recorded_at.asc".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<TranscriptRow> = Self::check(response, "transcript list")
            .await?
            .json()
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| TranscriptEntry {
                question_index: row.question_index.max(0) as usize,
                question: row.question,
                answer: row.answer,
                audio_url: row.audio_url,
                status: row.status,
                recorded_at: row.recorded_at,
            })
            .collect())
    }

    async fn update_answer(
        &self,
        candidate_id: &str,
        question_index: usize,
        new_answer: &str,
    ) -> Result<bool> {
        let response = self
            .authed(self.client.patch(self.table_url("transcripts")))
            .query(&[
                ("candidate_id", format!("eq.{}", candidate_id)),
                ("question_index", format!("eq.{}", question_index)),
            ])
            .header("Prefer", "return=representation")
            .json(&json!({ "answer": new_answer, "status": "updated" }))
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = Self::check(response, "transcript update")
            .await?
            .json()
            .await?;
        Ok(!rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_row_round_trip() {
        let mut session = Session::start("c1");
        session.advance(6).unwrap();
        let row = SessionRow::from_session(&session);
        assert_eq!(row.q_index, 1);
        assert_eq!(row.status, "active");
        assert_eq!(row.into_session().unwrap(), session);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let row = SessionRow {
            candidate_id: "c1".to_string(),
            q_index: 0,
            status: "paused".to_string(),
        };
        assert!(row.into_session().is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let store = SupabaseStore::new("https://example.supabase.co/", "key").unwrap();
        assert_eq!(
            store.table_url("sessions"),
            "https://example.supabase.co/rest/v1/sessions"
        );
    }
}
