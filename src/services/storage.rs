// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Blob storage for verification documents.
//!
//! Production uses the Firebase Storage REST API; tests and local runs use
//! the in-memory store.

use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{DocumentKind, DocumentUpload};

const FIREBASE_STORAGE_HOST: &str = "https://firebasestorage.googleapis.com";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// A blob that was written successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Object path, used for deletion
    pub path: String,
    /// Public download URL
    pub url: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredBlob, AppError>;

    async fn delete(&self, path: &str) -> Result<(), AppError>;
}

/// Object path for a verification document:
/// `verification-documents/{uid}/{kind}-{millis}-{digest}.{ext}`.
pub fn verification_document_path(
    user_id: &str,
    kind: DocumentKind,
    doc: &DocumentUpload,
    uploaded_at_millis: i64,
) -> String {
    let digest = hex::encode(Sha256::digest(&doc.bytes));
    format!(
        "verification-documents/{}/{}-{}-{}.{}",
        user_id,
        kind.slug(),
        uploaded_at_millis,
        &digest[..12],
        doc.extension().to_ascii_lowercase()
    )
}

// ─── Firebase Storage ────────────────────────────────────────

/// Firebase Storage over its JSON/REST interface.
pub struct FirebaseStorage {
    http_client: reqwest::Client,
    base_url: String,
    bucket: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

impl FirebaseStorage {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .context("failed building storage HTTP client")?;

        let base_url = match &config.storage_emulator_host {
            Some(host) => format!("http://{}", host.trim_end_matches('/')),
            None => FIREBASE_STORAGE_HOST.to_string(),
        };

        tracing::info!(bucket = %config.storage_bucket, base_url = %base_url, "Initialized Firebase Storage client");

        Ok(Self {
            http_client,
            base_url,
            bucket: config.storage_bucket.clone(),
            access_token: config.storage_access_token.clone(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/v0/b/{}/o/{}",
            self.base_url,
            self.bucket,
            urlencoding::encode(path)
        )
    }

    fn download_url(&self, path: &str, token: Option<&str>) -> String {
        match token {
            Some(token) => format!(
                "{}?alt=media&token={}",
                self.object_url(path),
                urlencoding::encode(token)
            ),
            None => format!("{}?alt=media", self.object_url(path)),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl BlobStore for FirebaseStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredBlob, AppError> {
        let url = format!(
            "{}/v0/b/{}/o?name={}",
            self.base_url,
            self.bucket,
            urlencoding::encode(path)
        );

        let response = self
            .authorize(self.http_client.post(&url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("upload request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!(
                "upload of {path} returned {status}: {body}"
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("invalid upload response: {e}")))?;

        // Several comma-separated tokens may exist; any one works.
        let token = uploaded
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').next());

        tracing::debug!(path = %uploaded.name, size = bytes.len(), "Uploaded blob");

        Ok(StoredBlob {
            url: self.download_url(&uploaded.name, token),
            path: uploaded.name,
        })
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        let response = self
            .authorize(self.http_client.delete(self.object_url(path)))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("delete request failed: {e}")))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            reqwest::StatusCode::NOT_FOUND => Ok(()),
            s => Err(AppError::Storage(format!("delete of {path} returned {s}"))),
        }
    }
}

// ─── In-memory ───────────────────────────────────────────────

/// Blob store kept in process memory. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<DashMap<String, (String, Vec<u8>)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.blobs.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredBlob, AppError> {
        self.blobs.insert(
            path.to_string(),
            (content_type.to_string(), bytes.to_vec()),
        );
        Ok(StoredBlob {
            path: path.to_string(),
            url: format!("memory://{path}"),
        })
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.blobs.remove(path);
        Ok(())
    }
}
