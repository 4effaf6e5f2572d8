// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile service: self-service edits, the verification workflow, and the
//! admin review decisions.
//!
//! Verification states move `none -> pending -> approved | rejected`, and a
//! rejected profile may submit again. A submission either persists fully
//! (fields, document URLs and `pending` in one write) or leaves no uploaded
//! blobs behind.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::db::ProfileRepository;
use crate::error::{AppError, Result};
use crate::models::{
    DocumentKind, ProfileData, ProfileUpdate, UserProfile, VerificationDecision,
    VerificationStatus, VerificationUploads,
};
use crate::services::firebase_auth::FirebaseIdentity;
use crate::services::notify::{NotificationDispatcher, NotificationReport, VerificationNotice};
use crate::services::storage::{verification_document_path, BlobStore, StoredBlob};
use crate::validation::{validate_profile_data, validate_profile_update};

/// Result of a successful verification submission.
pub struct Submission {
    /// Profile as stored, now `pending`
    pub profile: UserProfile,
    /// Notification task; awaiting it is optional
    pub notifications: JoinHandle<NotificationReport>,
}

#[derive(Clone)]
pub struct ProfileService {
    repo: Arc<dyn ProfileRepository>,
    blobs: Arc<dyn BlobStore>,
    notifications: NotificationDispatcher,
}

impl ProfileService {
    pub fn new(
        repo: Arc<dyn ProfileRepository>,
        blobs: Arc<dyn BlobStore>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            repo,
            blobs,
            notifications,
        }
    }

    /// Return the user's profile, creating a minimal one on first sign-in.
    pub async fn ensure_profile(&self, identity: &FirebaseIdentity) -> Result<UserProfile> {
        if let Some(profile) = self.repo.find_profile(&identity.uid).await? {
            return Ok(profile);
        }

        let profile = UserProfile::stub(
            identity.uid.as_str(),
            identity.display_name.as_deref(),
            identity.email.as_deref(),
            Utc::now(),
        );
        self.repo.save_profile(&profile).await?;

        tracing::info!(user_id = %identity.uid, "Created profile stub");
        Ok(profile)
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile> {
        self.repo
            .find_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))
    }

    /// Whether the user holds an approved verification. Unknown users are not.
    pub async fn is_user_verified(&self, user_id: &str) -> Result<bool> {
        Ok(self
            .repo
            .find_profile(user_id)
            .await?
            .is_some_and(|p| p.is_verified))
    }

    /// Lightweight edit allowed in any verification state.
    pub async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<UserProfile> {
        let now = Utc::now();
        let mut profile = self.load_or_stub(user_id, now).await?;

        let business = profile.business().apply(update.is_business)?;
        update.merge_into(&mut profile);
        profile.set_business(business);
        validate_profile_update(&profile)?;

        profile.updated_at = now;
        self.repo.save_profile(&profile).await?;

        tracing::info!(user_id, "Updated profile");
        Ok(profile)
    }

    /// Explicit switch to business mode. Requires `confirmed = true`, and an
    /// individual profile may only switch while no review is pending or
    /// approved. Confirming an already confirmed business is a no-op write.
    pub async fn confirm_business_status(
        &self,
        user_id: &str,
        confirmed: bool,
    ) -> Result<UserProfile> {
        if !confirmed {
            return Err(AppError::validation(
                "business status must be explicitly confirmed",
            ));
        }

        let now = Utc::now();
        let mut profile = self.load_or_stub(user_id, now).await?;
        if !profile.is_business_confirmed {
            profile.verification_status.ensure_can_become_business()?;
        }
        profile.set_business(profile.business().confirm());
        profile.updated_at = now;
        self.repo.save_profile(&profile).await?;

        tracing::info!(user_id, "Confirmed business status");
        Ok(profile)
    }

    /// Submit the profile for manual verification.
    ///
    /// Validation and state checks happen before any upload. If persisting
    /// fails, uploaded blobs are removed and the original error is returned.
    /// Once the write succeeds the submission succeeds; notifications go out
    /// afterwards and cannot fail it.
    pub async fn submit_verification(
        &self,
        user_id: &str,
        data: &ProfileData,
        uploads: &VerificationUploads,
    ) -> Result<Submission> {
        let existing = self.repo.find_profile(user_id).await?;

        existing
            .as_ref()
            .map(|p| p.verification_status)
            .unwrap_or_default()
            .ensure_can_submit()?;

        let data = data.normalized();
        let business = existing
            .as_ref()
            .map(UserProfile::business)
            .unwrap_or_default()
            .apply(data.is_business)?;

        validate_profile_data(&data, business.is_business, uploads)?;

        let now = Utc::now();
        let stored = if business.is_business {
            self.upload_documents(user_id, uploads, now).await?
        } else {
            Vec::new()
        };

        let mut profile = match existing {
            Some(profile) => profile,
            None => UserProfile::stub(user_id, None, None, now),
        };
        profile.apply_data(&data);
        profile.set_business(business);
        for (kind, blob) in &stored {
            match kind {
                DocumentKind::Camera => profile.documents.camera_document_url = Some(blob.url.clone()),
                DocumentKind::Commerce => {
                    profile.documents.commerce_document_url = Some(blob.url.clone())
                }
            }
        }
        profile.set_verification_status(VerificationStatus::Pending);
        profile.submitted_at = Some(now);
        profile.updated_at = now;

        if let Err(e) = self.repo.save_profile(&profile).await {
            tracing::error!(user_id, error = %e, "Persisting verification request failed");
            self.discard_blobs(&stored).await;
            return Err(e);
        }

        // Read-back is best effort once the write has succeeded.
        let profile = match self.repo.find_profile(user_id).await {
            Ok(Some(stored_profile)) => stored_profile,
            Ok(None) => {
                tracing::warn!(user_id, "Profile missing on read-back after submit");
                profile
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Profile read-back after submit failed");
                profile
            }
        };

        tracing::info!(
            user_id,
            is_business = profile.is_business,
            documents = stored.len(),
            "Verification request submitted"
        );

        let notifications = self
            .notifications
            .dispatch(VerificationNotice::from_profile(&profile));

        Ok(Submission {
            profile,
            notifications,
        })
    }

    /// Admin decision on a pending request.
    pub async fn decide(
        &self,
        user_id: &str,
        decision: VerificationDecision,
    ) -> Result<UserProfile> {
        let mut profile = self.get_profile(user_id).await?;
        let next = profile.verification_status.decide(decision)?;

        profile.set_verification_status(next);
        profile.updated_at = Utc::now();
        self.repo.save_profile(&profile).await?;

        tracing::info!(user_id, status = %next, "Verification decided");
        Ok(profile)
    }

    /// Profiles awaiting review, most recently submitted first.
    pub async fn pending_verifications(&self) -> Result<Vec<UserProfile>> {
        let mut profiles = self
            .repo
            .find_by_verification_status(VerificationStatus::Pending)
            .await?;
        profiles.sort_by_key(|p| std::cmp::Reverse(p.submitted_at.unwrap_or(p.updated_at)));
        Ok(profiles)
    }

    async fn load_or_stub(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserProfile> {
        Ok(self
            .repo
            .find_profile(user_id)
            .await?
            .unwrap_or_else(|| UserProfile::stub(user_id, None, None, now)))
    }

    /// Upload both documents. If the second upload fails the first is removed.
    async fn upload_documents(
        &self,
        user_id: &str,
        uploads: &VerificationUploads,
        now: DateTime<Utc>,
    ) -> Result<Vec<(DocumentKind, StoredBlob)>> {
        let mut stored = Vec::new();
        for kind in [DocumentKind::Camera, DocumentKind::Commerce] {
            let Some(doc) = uploads.get(kind) else {
                continue;
            };
            let path = verification_document_path(user_id, kind, doc, now.timestamp_millis());
            match self.blobs.upload(&path, &doc.bytes, &doc.content_type).await {
                Ok(blob) => stored.push((kind, blob)),
                Err(e) => {
                    tracing::error!(user_id, document = kind.label(), error = %e, "Document upload failed");
                    self.discard_blobs(&stored).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    /// Best-effort removal; failures are logged only.
    async fn discard_blobs(&self, stored: &[(DocumentKind, StoredBlob)]) {
        for (_, blob) in stored {
            if let Err(e) = self.blobs.delete(&blob.path).await {
                tracing::warn!(path = %blob.path, error = %e, "Failed to remove orphaned document");
            }
        }
    }
}
