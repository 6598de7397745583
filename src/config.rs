//! # Configuration Management
//!
//! Loads application configuration from multiple sources, in priority order
//! (highest first):
//!
//! 1. Well-known deployment environment variables (`HOST`, `PORT`,
//!    `SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY`, `SUPABASE_BUCKET`,
//!    `CORS_ALLOWED_ORIGINS`)
//! 2. Environment variables with the `APP_` prefix, with `__` between the
//!    section and the field so multi-word field names stay unambiguous
//!    (e.g. `APP_MODELS__WHISPER_MODEL=base`,
//!    `APP_INTERVIEW__STATIC_DIR=/var/audio`)
//! 3. An optional `config.toml` next to the binary
//! 4. Built-in defaults
//!
//! The `.env` file (if any) is loaded by `main` before this runs, so local
//! development can keep the Supabase credentials out of the shell.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub storage: StorageConfig,
    pub interview: InterviewConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Speech recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Whisper model size: "tiny", "base", "small", "medium", "large".
    /// Tiny keeps cold-start and memory down; answers are short utterances
    /// so the accuracy loss is acceptable.
    pub whisper_model: String,
    /// Language hint passed to the recognizer (ISO 639-1).
    pub language: String,
}

/// Where the authoritative store and the audio blobs live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "supabase" for the real deployment, "memory" for local development
    /// and tests (sessions and transcripts in process, blobs under the
    /// static dir).
    pub backend: String,
    pub supabase_url: String,
    pub supabase_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    /// Directory for generated speech files, served under `/static`.
    pub static_dir: String,
    /// Spoken greeting synthesized at interview start. Empty disables it.
    pub welcome_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origin allowlist; a single "*" entry means allow any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            models: ModelsConfig {
                whisper_model: "tiny".to_string(),
                language: "en".to_string(),
            },
            storage: StorageConfig {
                backend: "memory".to_string(),
                supabase_url: String::new(),
                supabase_key: String::new(),
                bucket: "interview-audios".to_string(),
            },
            interview: InterviewConfig {
                static_dir: "static".to_string(),
                welcome_message: "Welcome to your interview. Let's begin.".to_string(),
            },
            cors: CorsConfig {
                allowed_origins: vec!["*".to_string()],
            },
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        // Deployment platforms and the original service's .env contract use
        // bare variable names that don't follow the APP_ convention.
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }
        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }
        if let Ok(url) = env::var("SUPABASE_URL") {
            settings = settings
                .set_override("storage.supabase_url", url)?
                .set_override("storage.backend", "supabase")?;
        }
        if let Ok(key) = env::var("SUPABASE_SERVICE_ROLE_KEY") {
            settings = settings.set_override("storage.supabase_key", key)?;
        }
        if let Ok(bucket) = env::var("SUPABASE_BUCKET") {
            settings = settings.set_override("storage.bucket", bucket)?;
        }
        if let Ok(origins) = env::var("CORS_ALLOWED_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            settings = settings.set_override("cors.allowed_origins", origins)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        match self.storage.backend.as_str() {
            "memory" => {}
            "supabase" => {
                if self.storage.supabase_url.is_empty() {
                    return Err(anyhow::anyhow!(
                        "storage.supabase_url is required for the supabase backend"
                    ));
                }
                if self.storage.supabase_key.is_empty() {
                    return Err(anyhow::anyhow!(
                        "storage.supabase_key is required for the supabase backend"
                    ));
                }
                if self.storage.bucket.is_empty() {
                    return Err(anyhow::anyhow!(
                        "storage.bucket is required for the supabase backend"
                    ));
                }
            }
            other => {
                return Err(anyhow::anyhow!("Unknown storage backend: {}", other));
            }
        }

        if self.interview.static_dir.is_empty() {
            return Err(anyhow::anyhow!("interview.static_dir cannot be empty"));
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(anyhow::anyhow!(
                "cors.allowed_origins must list at least one origin (or \"*\")"
            ));
        }

        Ok(())
    }

    /// Whether CORS should accept any origin.
    pub fn cors_allow_any(&self) -> bool {
        self.cors.allowed_origins.iter().any(|o| o == "*")
    }
}
