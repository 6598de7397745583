//! # Interview Voice Backend - Main Application Entry Point
//!
//! HTTP server for a voice-driven screening interview bot. A candidate
//! starts a session, hears synthesized questions, answers by uploading
//! audio, and the recordings are transcribed and persisted as a transcript.
//!
//! ## Application Architecture:
//! - **config**: Configuration (TOML file + environment variables)
//! - **state**: Shared application state, adapter wiring, and metrics
//! - **questions / session**: The fixed script and the per-candidate state machine
//! - **store**: Candidate directory, session store, and transcript store
//! - **blobstore / tts / audio / transcription**: External adapters
//! - **orchestrator**: The interview workflow itself
//! - **handlers**: HTTP request handlers for the /api routes

mod audio;
mod blobstore;
mod config;
mod error;
mod handlers;
mod health;
mod middleware;
mod orchestrator;
mod questions;
mod session;
mod state;
mod store;
mod transcription;
mod tts;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use anyhow::Result;
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting interview-voice-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);
    info!(
        "Storage backend: {}, whisper model: {}",
        config.storage.backend, config.models.whisper_model
    );

    // Question audio is cached here and served under /static.
    std::fs::create_dir_all(&config.interview.static_dir)?;

    let app_state = AppState::build(config.clone())?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let static_dir = config.interview.static_dir.clone();
    let cors_allow_any = config.cors_allow_any();
    let allowed_origins = config.cors.allowed_origins.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);
        if cors_allow_any {
            cors = cors.allow_any_origin();
        } else {
            for origin in &allowed_origins {
                cors = cors.allowed_origin(origin);
            }
        }

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .service(
                web::scope("/api")
                    .route("/start_interview", web::post().to(handlers::start_interview))
                    .route("/question/{candidate_id}", web::get().to(handlers::get_question))
                    .route(
                        "/submit_answer/{candidate_id}/{question_index}",
                        web::post().to(handlers::submit_answer),
                    )
                    .route(
                        "/finish_interview/{candidate_id}",
                        web::get().to(handlers::finish_interview),
                    )
                    .route(
                        "/finish_interview/{candidate_id}",
                        web::post().to(handlers::finish_interview),
                    )
                    .route("/get_answers/{candidate_id}", web::get().to(handlers::get_answers))
                    .route("/update_answer/{candidate_id}", web::put().to(handlers::update_answer)),
            )
            .service(actix_files::Files::new("/static", &static_dir))
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(health::detailed_metrics))
            .route("/", web::get().to(index))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "message": "Interview bot backend is running"
    }))
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interview_voice_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// SIGTERM/SIGINT flip the global flag; the select in `main` sees it and
/// stops the server with in-flight requests allowed to finish.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
