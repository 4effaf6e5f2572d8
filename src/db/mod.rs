// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: repository traits and their Firestore / in-memory backends.

pub mod document;
pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{
    Activity, ActivityCategory, ActivityStats, ActivityStatus, BoundingBox, CreateActivityRequest,
    UpdateActivityRequest, UserProfile, VerificationStatus,
};

/// Collection names as constants.
pub mod collections {
    pub const ACTIVITIES: &str = "activities";
    /// Profiles keyed by identity provider uid
    pub const USER_PROFILES: &str = "userProfiles";
}

/// Activity storage. Every list is ordered by `created_at`, newest first.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Activity>, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Activity>, AppError>;

    async fn find_by_category(&self, category: ActivityCategory)
        -> Result<Vec<Activity>, AppError>;

    async fn find_by_status(&self, status: ActivityStatus) -> Result<Vec<Activity>, AppError>;

    /// Activities whose coordinates fall inside `bounds` (edges included).
    async fn find_by_location_bounds(
        &self,
        bounds: &BoundingBox,
    ) -> Result<Vec<Activity>, AppError>;

    /// Assign an id and timestamps, store, and return the stored record.
    async fn create(&self, request: &CreateActivityRequest) -> Result<Activity, AppError>;

    /// Apply a patch, refresh `updated_at`, and return the stored record.
    /// `NotFound` if the activity does not exist.
    async fn update(&self, request: &UpdateActivityRequest) -> Result<Activity, AppError>;

    async fn delete(&self, id: &str) -> Result<(), AppError>;

    async fn get_stats(&self) -> Result<ActivityStats, AppError> {
        let activities = self.find_all().await?;
        Ok(ActivityStats::from_activities(&activities))
    }
}

/// Profile storage, one document per user id.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError>;

    /// Write the whole profile (create or replace).
    async fn save_profile(&self, profile: &UserProfile) -> Result<(), AppError>;

    async fn find_by_verification_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<UserProfile>, AppError>;
}

/// Sort newest first. Ties keep their existing relative order.
pub(crate) fn sort_newest_first(activities: &mut [Activity]) {
    activities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Build the record for a new activity with a fresh id.
pub(crate) fn new_activity(request: &CreateActivityRequest, now: DateTime<Utc>) -> Activity {
    Activity {
        id: uuid::Uuid::new_v4().simple().to_string(),
        title: request.title.clone(),
        description: request.description.clone(),
        category: request.category,
        location: Some(request.location),
        venue: request.venue.clone(),
        participants: request.participants,
        capacity: request.capacity,
        date: request.date,
        time: request.time.clone(),
        fundraising_goal: request.fundraising_goal.clone(),
        status: request.status,
        created_by: request.created_by.clone(),
        created_at: now,
        updated_at: now,
    }
}
