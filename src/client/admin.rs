// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin review panel: the working set of pending verification requests.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{UserProfile, VerificationDecision};
use crate::services::ProfileService;

/// Backend the panel reads pending requests from and sends decisions to.
#[async_trait]
pub trait VerificationQueue: Send + Sync {
    async fn pending_verifications(&self) -> Result<Vec<UserProfile>>;

    async fn decide(&self, user_id: &str, decision: VerificationDecision) -> Result<UserProfile>;
}

#[async_trait]
impl VerificationQueue for ProfileService {
    async fn pending_verifications(&self) -> Result<Vec<UserProfile>> {
        ProfileService::pending_verifications(self).await
    }

    async fn decide(&self, user_id: &str, decision: VerificationDecision) -> Result<UserProfile> {
        ProfileService::decide(self, user_id, decision).await
    }
}

pub struct AdminVerificationPanel {
    queue: Arc<dyn VerificationQueue>,
    pending: RwLock<Vec<UserProfile>>,
}

impl AdminVerificationPanel {
    pub fn new(queue: Arc<dyn VerificationQueue>) -> Self {
        Self {
            queue,
            pending: RwLock::new(Vec::new()),
        }
    }

    /// Replace the working set with the current pending requests.
    pub async fn load_pending(&self) -> Result<usize> {
        let profiles = self.queue.pending_verifications().await?;
        let count = profiles.len();
        *self.pending.write().await = profiles;
        tracing::debug!(count, "Loaded pending verifications");
        Ok(count)
    }

    /// Apply a decision, then drop the request from the working set.
    /// On failure the entry stays so the admin can retry.
    pub async fn verify_profile(
        &self,
        user_id: &str,
        decision: VerificationDecision,
    ) -> Result<UserProfile> {
        let profile = self.queue.decide(user_id, decision).await?;
        self.pending
            .write()
            .await
            .retain(|p| p.user_id != user_id);
        Ok(profile)
    }

    pub async fn pending(&self) -> Vec<UserProfile> {
        self.pending.read().await.clone()
    }
}
