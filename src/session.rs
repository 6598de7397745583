//! # Interview Session State Machine
//!
//! A session tracks one candidate's progress through the question set:
//! `absent → active → finished`. The session row is the only mutable state
//! this service owns, so the legal transitions are enumerated here rather
//! than scattered across handlers:
//!
//! - **start** creates (or replaces) a session at `question_index = 0`.
//! - **advance** moves the index forward by exactly one, and only while the
//!   session is active and the index is still inside the question set. The
//!   caller invokes it only after a successful transcription, so silent or
//!   failed recognition never advances progress.
//! - **finish** moves an active session to `Finished`. Finishing twice is an
//!   error, not a silent no-op.
//!
//! Invariant: `question_index` is always in `[0, total_questions]` and is
//! monotonically non-decreasing while the session is active.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a session. Absence of a session row represents the
/// implicit third state ("no interview in progress").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Finished,
}

/// A rejected session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// `advance` or `finish` on a session that is already finished.
    AlreadyFinished,
    /// `advance` when the index already equals the question count.
    PastEnd,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::AlreadyFinished => write!(f, "interview already finished"),
            TransitionError::PastEnd => write!(f, "all questions already answered"),
        }
    }
}

impl std::error::Error for TransitionError {}

/// One candidate's interview progress record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub candidate_id: String,
    pub question_index: usize,
    pub status: SessionStatus,
}

impl Session {
    /// A fresh session at the first question. Starting an interview always
    /// goes through here, so a restart resets any prior progress to zero.
    pub fn start(candidate_id: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            question_index: 0,
            status: SessionStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Whether all questions have been answered (`done` from the client's
    /// point of view). Valid for active and finished sessions alike.
    pub fn is_done(&self, total_questions: usize) -> bool {
        self.question_index >= total_questions
    }

    /// Advance to the next question after an accepted answer.
    pub fn advance(&mut self, total_questions: usize) -> Result<(), TransitionError> {
        if self.status == SessionStatus::Finished {
            return Err(TransitionError::AlreadyFinished);
        }
        if self.question_index >= total_questions {
            return Err(TransitionError::PastEnd);
        }
        self.question_index += 1;
        Ok(())
    }

    /// Close out the interview. The row is kept (marked, not deleted) so the
    /// transcript stays addressable and a double-finish is detectable.
    pub fn finish(&mut self) -> Result<(), TransitionError> {
        if self.status == SessionStatus::Finished {
            return Err(TransitionError::AlreadyFinished);
        }
        self.status = SessionStatus::Finished;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOTAL: usize = 6;

    #[test]
    fn test_start_resets_to_first_question() {
        let session = Session::start("cand-1");
        assert_eq!(session.question_index, 0);
        assert_eq!(session.status, SessionStatus::Active);
        assert!(!session.is_done(TOTAL));
    }

    #[test]
    fn test_advance_walks_to_done() {
        let mut session = Session::start("cand-1");
        for expected in 1..=TOTAL {
            session.advance(TOTAL).unwrap();
            assert_eq!(session.question_index, expected);
            assert!(session.question_index <= TOTAL);
        }
        assert!(session.is_done(TOTAL));
        // Past the end the advance is rejected, the index never overshoots.
        assert_eq!(session.advance(TOTAL), Err(TransitionError::PastEnd));
        assert_eq!(session.question_index, TOTAL);
    }

    #[test]
    fn test_finish_is_not_idempotent() {
        let mut session = Session::start("cand-1");
        session.finish().unwrap();
        assert_eq!(session.status, SessionStatus::Finished);
        assert_eq!(session.finish(), Err(TransitionError::AlreadyFinished));
    }

    #[test]
    fn test_finished_session_rejects_advance() {
        let mut session = Session::start("cand-1");
        session.advance(TOTAL).unwrap();
        session.finish().unwrap();
        assert_eq!(session.advance(TOTAL), Err(TransitionError::AlreadyFinished));
        assert_eq!(session.question_index, 1);
    }
}
