//! # Interview REST API Handlers
//!
//! HTTP endpoints for the interview workflow. Handlers stay thin: decode the
//! request, call the orchestrator, count the outcome, encode the response.
//!
//! ## Available Endpoints:
//! - `POST /api/start_interview` - Start (or restart) a candidate's interview
//! - `GET /api/question/{candidate_id}` - Current question text and audio
//! - `POST /api/submit_answer/{candidate_id}/{question_index}` - Upload an answer recording
//! - `GET|POST /api/finish_interview/{candidate_id}` - Close the interview, return transcript
//! - `GET /api/get_answers/{candidate_id}` - Transcript so far
//! - `PUT /api/update_answer/{candidate_id}` - Correct a recorded answer

use crate::error::AppError;
use crate::handlers::models::{StartRequest, UpdateAnswerRequest};
use crate::orchestrator::{AnswerStatus, NextQuestion};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::io::Write;

// Browser recordings of one spoken answer are well under this.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub async fn start_interview(
    state: web::Data<AppState>,
    body: web::Json<StartRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    let outcome = state
        .orchestrator
        .start(request.candidate_id.as_deref(), request.email.as_deref())
        .await?;

    state.record_interview_started();

    Ok(HttpResponse::Ok().json(json!({
        "message": "Interview started",
        "candidate_id": outcome.candidate.candidate_id,
        "name": outcome.candidate.name,
        "email": outcome.candidate.email,
        "total_questions": outcome.total_questions,
        "welcome_audio_url": outcome.welcome_audio_url,
        "question_url": format!("/api/question/{}", outcome.candidate.candidate_id)
    })))
}

pub async fn get_question(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let candidate_id = path.into_inner();

    match state.orchestrator.next_question(&candidate_id).await? {
        NextQuestion::Done => Ok(HttpResponse::Ok().json(json!({
            "done": true,
            "message": "Interview complete. Thank you!"
        }))),
        NextQuestion::Question {
            question_index,
            question,
            audio_url,
        } => Ok(HttpResponse::Ok().json(json!({
            "done": false,
            "question_index": question_index,
            "question": question,
            "audio_url": audio_url
        }))),
    }
}

pub async fn submit_answer(
    state: web::Data<AppState>,
    path: web::Path<(String, usize)>,
    payload: actix_multipart::Multipart,
) -> Result<HttpResponse, AppError> {
    let (candidate_id, question_index) = path.into_inner();

    let (bytes, filename) = read_audio_field(payload).await?;
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| format!(".{}", ext))
        .unwrap_or_default();

    // Spool the upload to disk for ffmpeg; the temp file is removed when
    // this binding drops, on success and on every error path alike.
    let mut upload = tempfile::NamedTempFile::new()?;
    upload.write_all(&bytes)?;
    upload.flush()?;

    let outcome = state
        .orchestrator
        .submit_answer(&candidate_id, question_index, upload.path(), &extension)
        .await?;

    state.record_answer(outcome.status == AnswerStatus::Error);

    Ok(HttpResponse::Ok().json(outcome))
}

pub async fn finish_interview(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let candidate_id = path.into_inner();
    let report = state.orchestrator.finish(&candidate_id).await?;

    state.record_interview_finished();

    Ok(HttpResponse::Ok().json(json!({
        "message": "Interview finished",
        "candidate_id": report.candidate_id,
        "answers": report.entries,
        "transcript": report.transcript
    })))
}

pub async fn get_answers(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let candidate_id = path.into_inner();
    let report = state.orchestrator.report(&candidate_id).await?;
    Ok(HttpResponse::Ok().json(report))
}

pub async fn update_answer(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateAnswerRequest>,
) -> Result<HttpResponse, AppError> {
    let candidate_id = path.into_inner();
    let request = body.into_inner();

    state
        .orchestrator
        .update_answer(&candidate_id, request.question_index, &request.new_answer)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Answer updated",
        "candidate_id": candidate_id,
        "question_index": request.question_index
    })))
}

/// Pull the uploaded recording out of the multipart body. The field may be
/// named either `audio` or `file`; anything else is ignored.
async fn read_audio_field(
    mut payload: actix_multipart::Multipart,
) -> Result<(Vec<u8>, String), AppError> {
    use futures_util::stream::StreamExt;

    let mut audio_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = item
            .map_err(|e| AppError::ValidationError(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::ValidationError("Missing content disposition".to_string()))?;
        let field_name = content_disposition
            .get_name()
            .ok_or_else(|| AppError::ValidationError("Missing field name".to_string()))?;

        if field_name == "audio" || field_name == "file" {
            filename = content_disposition.get_filename().map(|s| s.to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk
                    .map_err(|e| AppError::ValidationError(format!("Chunk error: {}", e)))?;
                if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                    return Err(AppError::ValidationError(format!(
                        "Audio file too large (max {} bytes)",
                        MAX_UPLOAD_BYTES
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            audio_data = Some(bytes);
        }
    }

    let bytes = audio_data
        .ok_or_else(|| AppError::ValidationError("No audio file provided".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::ValidationError("Audio file is empty".to_string()));
    }

    Ok((bytes, filename.unwrap_or_else(|| "answer.webm".to_string())))
}
