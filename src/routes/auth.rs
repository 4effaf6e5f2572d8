// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in and sign-out routes.
//!
//! The browser signs in with Firebase Authentication and posts the resulting
//! ID token here. After verification the user gets a session cookie.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::UserProfile;
use crate::services::firebase_auth::{extract_bearer_token, FirebaseIdentity};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(create_session))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: FirebaseIdentity,
    pub profile: UserProfile,
    /// Session token for clients that prefer the Authorization header
    pub token: String,
}

/// Exchange a Firebase ID token for a session.
///
/// The token is read from the JSON body, or from `Authorization: Bearer`.
async fn create_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    body: Option<Json<SessionRequest>>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let body_token = body.and_then(|Json(req)| req.id_token);
    let id_token = body_token
        .as_deref()
        .or_else(|| extract_bearer_token(headers.get(axum::http::header::AUTHORIZATION)))
        .ok_or(AppError::Unauthorized)?;

    let identity = state.token_verifier.verify_id_token(id_token).await?;
    let profile = state.profiles.ensure_profile(&identity).await?;

    let token = create_jwt(&identity.uid, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(uid = %identity.uid, "Session created");

    let mut cookie = session_cookie(token.clone(), &state.config.frontend_url);
    cookie.set_max_age(time::Duration::seconds(SESSION_TTL_SECS as i64));

    Ok((
        jar.add(cookie),
        Json(SessionResponse {
            user: identity,
            profile,
            token,
        }),
    ))
}

/// Clear the session cookie. The removal carries the same attributes the
/// cookie was set with, or browsers keep the original.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(session_cookie(String::new(), &state.config.frontend_url));
    (jar, StatusCode::NO_CONTENT)
}

fn session_cookie(value: String, frontend_url: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .secure(!is_local(frontend_url))
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn is_local(frontend_url: &str) -> bool {
    frontend_url.starts_with("http://localhost") || frontend_url.starts_with("http://127.0.0.1")
}
