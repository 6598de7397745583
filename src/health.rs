use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.get_config();
    let recognizer = state.recognizer_status();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.get_uptime_seconds(),
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "interview": {
            "total_questions": state.orchestrator.total_questions(),
            "interviews_started": metrics.interviews_started,
            "interviews_finished": metrics.interviews_finished
        },
        "recognizer": {
            "model": recognizer.model,
            // The model downloads lazily on the first answer, so "loaded"
            // stays false until someone has actually spoken to the bot.
            "loaded": recognizer.loaded,
            "language": config.models.language
        },
        "storage": {
            "backend": config.storage.backend,
            "bucket": config.storage.bucket
        }
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let total_answers = metrics.answers_transcribed + metrics.answers_degraded;

    let mut endpoint_stats = Vec::new();
    for (endpoint, metric) in metrics.endpoint_metrics.iter() {
        endpoint_stats.push(json!({
            "endpoint": endpoint,
            "request_count": metric.request_count,
            "error_count": metric.error_count,
            "error_rate": metric.error_rate(),
            "average_duration_ms": metric.average_duration_ms(),
            "total_duration_ms": metric.total_duration_ms
        }));
    }

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "requests": {
            "total": metrics.request_count,
            "errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            },
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "interviews": {
            "started": metrics.interviews_started,
            "finished": metrics.interviews_finished,
            "answers_transcribed": metrics.answers_transcribed,
            "answers_degraded": metrics.answers_degraded,
            "degraded_rate": if total_answers > 0 {
                metrics.answers_degraded as f64 / total_answers as f64
            } else {
                0.0
            }
        },
        "endpoints": endpoint_stats
    }))
}
