//! Request body types for the interview API.

use serde::Deserialize;

/// Body for `POST /api/start_interview`. Exactly one of the two lookup keys
/// is required; when both are present the id wins.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub candidate_id: Option<String>,
    pub email: Option<String>,
}

/// Body for `PUT /api/update_answer/{candidate_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateAnswerRequest {
    pub question_index: usize,
    pub new_answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_request_parsing() {
        let request: StartRequest = serde_json::from_str(r#"{"email": "a@x.com"}"#).unwrap();
        assert!(request.candidate_id.is_none());
        assert_eq!(request.email.as_deref(), Some("a@x.com"));

        let request: StartRequest =
            serde_json::from_str(r#"{"candidate_id": "C1", "email": null}"#).unwrap();
        assert_eq!(request.candidate_id.as_deref(), Some("C1"));
    }

    #[test]
    fn test_update_answer_request_parsing() {
        let request: UpdateAnswerRequest =
            serde_json::from_str(r#"{"question_index": 2, "new_answer": "Bangalore"}"#).unwrap();
        assert_eq!(request.question_index, 2);
        assert_eq!(request.new_answer, "Bangalore");

        assert!(serde_json::from_str::<UpdateAnswerRequest>(r#"{"new_answer": "x"}"#).is_err());
    }
}
