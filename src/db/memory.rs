// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store for local development and tests.
//!
//! Holds the same raw documents the Firestore backend does and decodes them
//! through the same boundary, so legacy and corrupt documents behave alike.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::db::document::{
    decode_activities, decode_activity, decode_profile, decode_profiles, ActivityDocument,
    ProfileDocument,
};
use crate::db::{ActivityRepository, ProfileRepository};
use crate::error::AppError;
use crate::models::{
    Activity, ActivityCategory, ActivityStatus, BoundingBox, CreateActivityRequest,
    UpdateActivityRequest, UserProfile, VerificationStatus,
};

struct StoredActivity {
    /// Insertion order, breaks `created_at` ties
    seq: u64,
    doc: ActivityDocument,
}

#[derive(Default)]
struct Inner {
    activities: DashMap<String, StoredActivity>,
    profiles: DashMap<String, ProfileDocument>,
    next_seq: AtomicU64,
}

/// In-memory repository backend. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Inner>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw activity document as-is (for seeding legacy data).
    pub fn insert_activity_document(&self, id: &str, mut doc: ActivityDocument) {
        doc.id = Some(id.to_string());
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
        self.inner
            .activities
            .insert(id.to_string(), StoredActivity { seq, doc });
    }

    /// Store a raw profile document as-is.
    pub fn insert_profile_document(&self, user_id: &str, mut doc: ProfileDocument) {
        doc.doc_id = Some(user_id.to_string());
        self.inner.profiles.insert(user_id.to_string(), doc);
    }

    pub fn activity_count(&self) -> usize {
        self.inner.activities.len()
    }

    /// Snapshot of every activity, newest first (insertion order on ties).
    fn snapshot(&self) -> Vec<Activity> {
        let mut docs: Vec<(u64, ActivityDocument)> = self
            .inner
            .activities
            .iter()
            .map(|entry| (entry.seq, entry.doc.clone()))
            .collect();
        docs.sort_by(|a, b| b.0.cmp(&a.0));

        let mut activities = decode_activities(docs.into_iter().map(|(_, doc)| doc).collect());
        // Stable sort keeps newest-inserted first among equal timestamps.
        super::sort_newest_first(&mut activities);
        activities
    }

    fn write_activity(&self, activity: &Activity) {
        let doc = ActivityDocument::from_activity(activity);
        match self.inner.activities.get_mut(&activity.id) {
            Some(mut existing) => existing.doc = doc,
            None => {
                let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
                self.inner
                    .activities
                    .insert(activity.id.clone(), StoredActivity { seq, doc });
            }
        }
    }
}

#[async_trait]
impl ActivityRepository for MemoryDb {
    async fn find_all(&self) -> Result<Vec<Activity>, AppError> {
        Ok(self.snapshot())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Activity>, AppError> {
        let Some(doc) = self.inner.activities.get(id).map(|e| e.doc.clone()) else {
            return Ok(None);
        };
        match decode_activity(doc) {
            Ok(activity) => Ok(Some(activity)),
            Err(e) => {
                tracing::warn!(id = %e.id, reason = %e.reason, "Skipping unreadable activity document");
                Ok(None)
            }
        }
    }

    async fn find_by_category(
        &self,
        category: ActivityCategory,
    ) -> Result<Vec<Activity>, AppError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|a| a.category == category)
            .collect())
    }

    async fn find_by_status(&self, status: ActivityStatus) -> Result<Vec<Activity>, AppError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|a| a.status == status)
            .collect())
    }

    async fn find_by_location_bounds(
        &self,
        bounds: &BoundingBox,
    ) -> Result<Vec<Activity>, AppError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|a| a.location.is_some_and(|p| bounds.contains(&p)))
            .collect())
    }

    async fn create(&self, request: &CreateActivityRequest) -> Result<Activity, AppError> {
        let now = Utc::now();
        let activity = super::new_activity(request, now);
        self.write_activity(&activity);

        self.find_by_id(&activity.id)
            .await?
            .ok_or_else(|| AppError::Database(format!("activity {} vanished after create", activity.id)))
    }

    async fn update(&self, request: &UpdateActivityRequest) -> Result<Activity, AppError> {
        let current = self
            .find_by_id(&request.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", request.id)))?;

        let updated = request.apply_to(&current, Utc::now());
        self.write_activity(&updated);

        self.find_by_id(&request.id)
            .await?
            .ok_or_else(|| AppError::Database(format!("activity {} vanished after update", request.id)))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.inner.activities.remove(id);
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MemoryDb {
    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        let Some(doc) = self.inner.profiles.get(user_id).map(|d| d.value().clone()) else {
            return Ok(None);
        };
        decode_profile(doc)
            .map(Some)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.inner.profiles.insert(
            profile.user_id.clone(),
            ProfileDocument::from_profile(profile),
        );
        Ok(())
    }

    async fn find_by_verification_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<UserProfile>, AppError> {
        let docs = self
            .inner
            .profiles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        Ok(decode_profiles(docs)
            .into_iter()
            .filter(|p| p.verification_status == status)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;
    use chrono::NaiveDate;

    fn request(title: &str, lat: f64, lng: f64) -> CreateActivityRequest {
        CreateActivityRequest {
            title: title.to_string(),
            description: "desc".to_string(),
            category: ActivityCategory::Refugios,
            location: GeoPoint::new(lat, lng),
            venue: None,
            participants: 0,
            capacity: None,
            date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            time: None,
            fundraising_goal: None,
            status: ActivityStatus::Upcoming,
            created_by: "owner".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let db = MemoryDb::new();
        let a = db.create(&request("Refugio", 6.2, -75.5)).await.unwrap();
        assert!(!a.id.is_empty());
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(db.find_by_id(&a.id).await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn test_find_all_is_newest_first() {
        let db = MemoryDb::new();
        let first = db.create(&request("uno", 1.0, 1.0)).await.unwrap();
        let second = db.create(&request("dos", 2.0, 2.0)).await.unwrap();
        let ids: Vec<String> = db.find_all().await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = MemoryDb::new();
        let patch = UpdateActivityRequest {
            id: "nope".to_string(),
            ..Default::default()
        };
        assert!(matches!(db.update(&patch).await, Err(AppError::NotFound(_))));
    }
}
