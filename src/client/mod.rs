// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side state: the shared activity cache and the admin review panel.

pub mod activities;
pub mod admin;
pub mod http;

pub use activities::{ActivityCache, ActivitySource, LoadOutcome, DEFAULT_LOAD_TIMEOUT};
pub use admin::{AdminVerificationPanel, VerificationQueue};
pub use http::ApiClient;
