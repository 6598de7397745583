//! In-process store backend. Sessions, transcripts, and the candidate
//! directory live in `RwLock`'d maps; blobs are handled separately by the
//! local blob store. Used for the `memory` storage backend and throughout
//! the test suite.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{Candidate, CandidateDirectory, SessionStore, TranscriptEntry, TranscriptStore};
use crate::session::Session;

#[derive(Debug, Default)]
pub struct MemoryStore {
    candidates: RwLock<HashMap<String, Candidate>>,
    sessions: RwLock<HashMap<String, Session>>,
    transcripts: RwLock<HashMap<String, Vec<TranscriptEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the directory. Registration happens outside this service, so
    /// this is the stand-in used by local development and tests.
    pub fn add_candidate(&self, candidate: Candidate) {
        self.candidates
            .write()
            .unwrap()
            .insert(candidate.candidate_id.clone(), candidate);
    }
}

#[async_trait]
impl CandidateDirectory for MemoryStore {
    async fn find_by_id(&self, candidate_id: &str) -> Result<Option<Candidate>> {
        Ok(self.candidates.read().unwrap().get(candidate_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Candidate>> {
        Ok(self
            .candidates
            .read()
            .unwrap()
            .values()
            .find(|c| c.email == email)
            .cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, candidate_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().unwrap().get(candidate_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .unwrap()
            .insert(session.candidate_id.clone(), session.clone());
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for MemoryStore {
    async fn append(&self, candidate_id: &str, entry: TranscriptEntry) -> Result<()> {
        self.transcripts
            .write()
            .unwrap()
            .entry(candidate_id.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn list(&self, candidate_id: &str) -> Result<Vec<TranscriptEntry>> {
        let mut entries = self
            .transcripts
            .read()
            .unwrap()
            .get(candidate_id)
            .cloned()
            .unwrap_or_default();
        entries.sort_by_key(|e| e.question_index);
        Ok(entries)
    }

    async fn update_answer(
        &self,
        candidate_id: &str,
        question_index: usize,
        new_answer: &str,
    ) -> Result<bool> {
        let mut transcripts = self.transcripts.write().unwrap();
        let Some(entries) = transcripts.get_mut(candidate_id) else {
            return Ok(false);
        };
        match entries
            .iter_mut()
            .find(|e| e.question_index == question_index)
        {
            Some(entry) => {
                entry.answer = new_answer.to_string();
                entry.status = "updated".to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(index: usize) -> TranscriptEntry {
        TranscriptEntry {
            question_index: index,
            question: format!("Q{}", index),
            answer: format!("A{}", index),
            audio_url: None,
            status: "ok".to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_candidate_lookup() {
        let store = MemoryStore::new();
        store.add_candidate(Candidate {
            candidate_id: "c1".into(),
            name: Some("Ada".into()),
            email: "a@x.com".into(),
        });

        assert!(store.find_by_id("c1").await.unwrap().is_some());
        assert!(store.find_by_id("c2").await.unwrap().is_none());
        let by_email = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.candidate_id, "c1");
    }

    #[tokio::test]
    async fn test_session_save_is_upsert() {
        let store = MemoryStore::new();
        let mut session = Session::start("c1");
        store.save(&session).await.unwrap();

        session.advance(6).unwrap();
        store.save(&session).await.unwrap();

        let loaded = store.load("c1").await.unwrap().unwrap();
        assert_eq!(loaded.question_index, 1);
    }

    #[tokio::test]
    async fn test_transcript_listed_in_question_order() {
        let store = MemoryStore::new();
        store.append("c1", entry(1)).await.unwrap();
        store.append("c1", entry(0)).await.unwrap();

        let entries = store.list("c1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].question_index, 0);
        assert_eq!(entries[1].question_index, 1);
    }

    #[tokio::test]
    async fn test_update_answer_by_index() {
        let store = MemoryStore::new();
        store.append("c1", entry(0)).await.unwrap();

        assert!(store.update_answer("c1", 0, "corrected").await.unwrap());
        assert!(!store.update_answer("c1", 3, "nope").await.unwrap());

        let entries = store.list("c1").await.unwrap();
        assert_eq!(entries[0].answer, "corrected");
        assert_eq!(entries[0].status, "updated");
    }
}
