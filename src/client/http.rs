// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the JSON API, used by the cache and the admin panel when
//! they run outside the server process.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::client::activities::ActivitySource;
use crate::client::admin::VerificationQueue;
use crate::error::{AppError, Result};
use crate::models::{Activity, UserProfile, VerificationDecision};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    violations: Vec<String>,
}

/// Authenticated API client.
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session_token: Option<String>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed building API HTTP client")?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let request = match &self.session_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body: ApiErrorBody = response.json().await.unwrap_or_default();
            return Err(error_from_response(status, body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid API response: {e}")))
    }
}

fn error_from_response(status: StatusCode, body: ApiErrorBody) -> AppError {
    let invariant = body.error == "invariant_violation";
    let details = body.details.unwrap_or(body.error);
    match status {
        StatusCode::BAD_REQUEST if !body.violations.is_empty() => {
            AppError::Validation(body.violations)
        }
        StatusCode::BAD_REQUEST => AppError::BadRequest(details),
        StatusCode::UNAUTHORIZED => AppError::Unauthorized,
        StatusCode::FORBIDDEN => AppError::Permission(details),
        StatusCode::NOT_FOUND => AppError::NotFound(details),
        StatusCode::CONFLICT if invariant => AppError::InvariantViolation(details),
        StatusCode::CONFLICT => AppError::Conflict(details),
        StatusCode::GATEWAY_TIMEOUT => AppError::Timeout(details),
        StatusCode::SERVICE_UNAVAILABLE => AppError::Database(details),
        s => AppError::Internal(anyhow::anyhow!("API returned {s}: {details}")),
    }
}

#[async_trait]
impl ActivitySource for ApiClient {
    async fn fetch_activities(&self) -> Result<Vec<Activity>> {
        self.send(self.http_client.get(self.url("/api/activities")))
            .await
    }
}

#[derive(serde::Serialize)]
struct DecisionBody {
    decision: VerificationDecision,
}

#[async_trait]
impl VerificationQueue for ApiClient {
    async fn pending_verifications(&self) -> Result<Vec<UserProfile>> {
        self.send(self.http_client.get(self.url("/api/admin/verifications")))
            .await
    }

    async fn decide(&self, user_id: &str, decision: VerificationDecision) -> Result<UserProfile> {
        let path = format!("/api/admin/verifications/{}", urlencoding::encode(user_id));
        self.send(
            self.http_client
                .post(self.url(&path))
                .json(&DecisionBody { decision }),
        )
        .await
    }
}
