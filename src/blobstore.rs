//! # Blob Store Adapter
//!
//! Uploads audio files under a logical key and hands back a publicly
//! resolvable address. Two implementations: Supabase Storage for real
//! deployments, and a local filesystem store that serves through `/static`
//! for the memory backend.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload (or overwrite, when `upsert` is set) `bytes` under `key` and
    /// return the public URL of the stored object.
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<String>;
}

/// Supabase Storage over its REST API. Objects land in one configured
/// bucket; public URLs follow the bucket's `/object/public/` scheme, so the
/// bucket is expected to be public-read.
pub struct SupabaseBlobStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl SupabaseBlobStore {
    pub fn new(base_url: &str, api_key: &str, bucket: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to build storage HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, key
        )
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, key
        )
    }
}

#[async_trait]
impl BlobStore for SupabaseBlobStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<String> {
        let mut request = self
            .client
            .post(self.object_url(key))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", content_type)
            .body(bytes);
        if upsert {
            request = request.header("x-upsert", "true");
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Storage upload failed: {} - {}", status, body));
        }

        Ok(self.public_url(key))
    }
}

/// Filesystem-backed store for local development: blobs are written under
/// the static directory and addressed as `/static/<key>`.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
        upsert: bool,
    ) -> Result<String> {
        // Keys are service-generated ("{candidate}/{file}"), never taken
        // verbatim from a request path, but reject traversal anyway.
        if key.split('/').any(|part| part == "..") {
            return Err(anyhow!("Invalid blob key: {}", key));
        }

        let path = self.root.join(key);
        if !upsert && tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(format!("/static/{}", key));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create blob dir {:?}", parent))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write blob {:?}", path))?;

        Ok(format!("/static/{}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supabase_url_layout() {
        let store = SupabaseBlobStore::new("https://example.supabase.co/", "k", "audios").unwrap();
        assert_eq!(
            store.object_url("c1/bot_q_0.mp3"),
            "https://example.supabase.co/storage/v1/object/audios/c1/bot_q_0.mp3"
        );
        assert_eq!(
            store.public_url("c1/bot_q_0.mp3"),
            "https://example.supabase.co/storage/v1/object/public/audios/c1/bot_q_0.mp3"
        );
    }

    #[tokio::test]
    async fn test_local_store_writes_and_addresses() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let url = store
            .upload("c1/answer.webm", b"blob".to_vec(), "audio/webm", false)
            .await
            .unwrap();
        assert_eq!(url, "/static/c1/answer.webm");
        let written = std::fs::read(dir.path().join("c1/answer.webm")).unwrap();
        assert_eq!(written, b"blob");
    }

    #[tokio::test]
    async fn test_local_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        assert!(store
            .upload("../escape.bin", vec![0], "application/octet-stream", true)
            .await
            .is_err());
    }
}
