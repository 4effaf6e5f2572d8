// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Parche Solidario API Server
//!
//! Community activity board with map search and manual profile
//! verification, backed by Firebase.

use parche_solidario::{
    config::{Config, StoreBackend},
    db::{ActivityRepository, FirestoreDb, MemoryDb, ProfileRepository},
    services::{
        notifier_from_config, ActivityService, BlobStore, FirebaseStorage, FirebaseTokenVerifier,
        MemoryBlobStore, NotificationDispatcher, ProfileService,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, backend = ?config.store_backend, "Starting Parche Solidario API");

    let (activity_repo, profile_repo, blobs): (
        Arc<dyn ActivityRepository>,
        Arc<dyn ProfileRepository>,
        Arc<dyn BlobStore>,
    ) = match config.store_backend {
        StoreBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            let storage = FirebaseStorage::new(&config)?;
            (Arc::new(db.clone()), Arc::new(db), Arc::new(storage))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            let db = MemoryDb::new();
            (
                Arc::new(db.clone()),
                Arc::new(db),
                Arc::new(MemoryBlobStore::new()),
            )
        }
    };

    let notifications = NotificationDispatcher::new(
        notifier_from_config(&config)?,
        config.notify_attempts,
        config.notify_backoff,
    );

    let token_verifier = Arc::new(FirebaseTokenVerifier::new(&config)?);

    let state = Arc::new(AppState {
        activities: ActivityService::new(activity_repo),
        profiles: ProfileService::new(profile_repo, blobs, notifications),
        token_verifier,
        config: config.clone(),
    });

    let app = parche_solidario::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("parche_solidario=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
