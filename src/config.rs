// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup; Cloud Run injects secrets as environment variables.

use std::env;
use std::time::Duration;

/// Which document store backs the repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store, for local development and tests.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL (CORS origin)
    pub frontend_url: String,
    /// Firebase / GCP project ID (token audience, Firestore project)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,

    /// Firebase Storage bucket for verification documents
    pub storage_bucket: String,
    /// OAuth access token for Storage uploads; None against the emulator
    pub storage_access_token: Option<String>,
    /// `host:port` of the Firebase Storage emulator
    pub storage_emulator_host: Option<String>,

    /// Where verification notifications are POSTed; None logs them instead
    pub notify_webhook_url: Option<String>,
    /// Address that receives "new verification request" alerts
    pub operator_email: String,
    /// Firebase uids allowed to decide verification requests
    pub admin_uids: Vec<String>,
    pub notify_attempts: u32,
    pub notify_backoff: Duration,

    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            storage_bucket: "test-project.appspot.com".to_string(),
            storage_access_token: None,
            storage_emulator_host: None,
            notify_webhook_url: None,
            operator_email: DEFAULT_OPERATOR_EMAIL.to_string(),
            admin_uids: vec!["admin-uid".to_string()],
            notify_attempts: 3,
            notify_backoff: Duration::from_millis(10),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

const DEFAULT_OPERATOR_EMAIL: &str = "administrador@parchesolidario.com";

impl Config {
    /// Default config for tests.
    pub fn test_default() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StoreBackend::Firestore,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| format!("{gcp_project_id}.appspot.com")),
            storage_access_token: optional_var("STORAGE_ACCESS_TOKEN"),
            storage_emulator_host: optional_var("FIREBASE_STORAGE_EMULATOR_HOST"),
            notify_webhook_url: optional_var("NOTIFY_WEBHOOK_URL"),
            operator_email: env::var("OPERATOR_EMAIL")
                .unwrap_or_else(|_| DEFAULT_OPERATOR_EMAIL.to_string()),
            admin_uids: env::var("ADMIN_UIDS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            notify_attempts: env::var("NOTIFY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            notify_backoff: Duration::from_millis(
                env::var("NOTIFY_BACKOFF_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(500),
            ),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            gcp_project_id,
        })
    }

    /// Whether `uid` may act on the admin verification queue.
    pub fn is_admin(&self, uid: &str) -> bool {
        self.admin_uids.iter().any(|a| a == uid)
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
