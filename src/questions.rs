//! # Interview Question Set
//!
//! The fixed, ordered list of questions asked to every candidate. The set is
//! a process-wide constant: identical across candidates and immutable for the
//! lifetime of the server. A candidate's session index always refers to a
//! position in this list (or one past the end, meaning "done").

/// The interview questions, in the order they are asked.
const QUESTIONS: &[&str] = &[
    "How many years of experience do you have?",
    "What is your current CTC?",
    "What is your expected CTC?",
    "Which is your current location?",
    "Are you open to relocation?",
    "What is your notice period?",
];

/// Read-only view over the fixed interview question list.
///
/// Constructed once at startup and shared; all accessors are index-based so
/// callers never need to compare question text (question text is not
/// guaranteed unique).
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionSet;

impl QuestionSet {
    pub fn new() -> Self {
        Self
    }

    /// Number of questions every candidate is asked.
    pub fn len(&self) -> usize {
        QUESTIONS.len()
    }

    pub fn is_empty(&self) -> bool {
        QUESTIONS.is_empty()
    }

    /// The question at `index`, or `None` once the index has walked past the
    /// end of the set.
    pub fn get(&self, index: usize) -> Option<&'static str> {
        QUESTIONS.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> {
        QUESTIONS.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_set_is_fixed() {
        let questions = QuestionSet::new();
        assert_eq!(questions.len(), 6);
        assert_eq!(
            questions.get(0),
            Some("How many years of experience do you have?")
        );
        assert_eq!(questions.get(5), Some("What is your notice period?"));
        assert_eq!(questions.get(6), None);
    }

    #[test]
    fn test_question_text_is_unique() {
        // update_answer addresses entries by index, but duplicate question
        // text would still make reports ambiguous.
        let questions = QuestionSet::new();
        let mut seen: Vec<&str> = questions.iter().collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), questions.len());
    }
}
