// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Parche Solidario: a community board for solidarity activities
//!
//! This crate provides the backend API for publishing and finding
//! community activities on a map, and for the manual profile verification
//! workflow, plus the client-side activity cache and admin review panel.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod validation;

use config::Config;
use services::{ActivityService, FirebaseTokenVerifier, ProfileService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub activities: ActivityService,
    pub profiles: ProfileService,
    pub token_verifier: Arc<FirebaseTokenVerifier>,
}
