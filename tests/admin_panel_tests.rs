// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin review panel tests against the profile service.

use chrono::{Duration as ChronoDuration, Utc};
use parche_solidario::client::AdminVerificationPanel;
use parche_solidario::db::{MemoryDb, ProfileRepository};
use parche_solidario::error::AppError;
use parche_solidario::models::{UserProfile, VerificationDecision, VerificationStatus};
use parche_solidario::services::{
    LogNotifier, MemoryBlobStore, NotificationDispatcher, ProfileService,
};
use std::sync::Arc;
use std::time::Duration;

fn profile_service(db: &MemoryDb) -> ProfileService {
    ProfileService::new(
        Arc::new(db.clone()),
        Arc::new(MemoryBlobStore::new()),
        NotificationDispatcher::new(
            Arc::new(LogNotifier::new("ops@example.com")),
            1,
            Duration::from_millis(1),
        ),
    )
}

async fn seed_pending(db: &MemoryDb, user_id: &str, minutes_ago: i64) {
    let now = Utc::now();
    let mut profile = UserProfile::stub(user_id, Some("Tienda"), Some("t@example.com"), now);
    profile.set_verification_status(VerificationStatus::Pending);
    profile.submitted_at = Some(now - ChronoDuration::minutes(minutes_ago));
    db.save_profile(&profile).await.unwrap();
}

#[tokio::test]
async fn test_approve_removes_request_and_verifies_profile() {
    let db = MemoryDb::new();
    seed_pending(&db, "older", 30).await;
    seed_pending(&db, "newer", 5).await;
    let service = profile_service(&db);
    let panel = AdminVerificationPanel::new(Arc::new(service.clone()));

    assert_eq!(panel.load_pending().await.unwrap(), 2);
    let queued: Vec<String> = panel.pending().await.into_iter().map(|p| p.user_id).collect();
    assert_eq!(queued, ["newer", "older"]);

    let approved = panel
        .verify_profile("older", VerificationDecision::Approved)
        .await
        .unwrap();
    assert!(approved.is_verified);
    assert_eq!(approved.verification_status, VerificationStatus::Approved);

    let queued: Vec<String> = panel.pending().await.into_iter().map(|p| p.user_id).collect();
    assert_eq!(queued, ["newer"]);
    assert!(service.is_user_verified("older").await.unwrap());

    // A fresh fetch agrees with the local working set.
    assert_eq!(panel.load_pending().await.unwrap(), 1);
}

#[tokio::test]
async fn test_reject_allows_later_resubmission_state() {
    let db = MemoryDb::new();
    seed_pending(&db, "u1", 1).await;
    let panel = AdminVerificationPanel::new(Arc::new(profile_service(&db)));
    panel.load_pending().await.unwrap();

    let rejected = panel
        .verify_profile("u1", VerificationDecision::Rejected)
        .await
        .unwrap();
    assert!(!rejected.is_verified);
    assert_eq!(rejected.verification_status, VerificationStatus::Rejected);
    assert!(rejected.verification_status.ensure_can_submit().is_ok());
    assert!(panel.pending().await.is_empty());
}

#[tokio::test]
async fn test_failed_decision_keeps_entry() {
    let db = MemoryDb::new();
    seed_pending(&db, "u1", 1).await;
    let service = profile_service(&db);
    let panel = AdminVerificationPanel::new(Arc::new(service.clone()));
    panel.load_pending().await.unwrap();

    // Another admin decided first.
    service
        .decide("u1", VerificationDecision::Approved)
        .await
        .unwrap();

    let err = panel
        .verify_profile("u1", VerificationDecision::Rejected)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(panel.pending().await.len(), 1);

    // Unknown users fail without touching the working set either.
    let err = panel
        .verify_profile("nobody", VerificationDecision::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(panel.pending().await.len(), 1);
}
