// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing the repository traits.
//!
//! Collections:
//! - `activities` (community activities, flat `latitude`/`longitude` fields)
//! - `userProfiles` (one document per Firebase uid)

use async_trait::async_trait;
use chrono::Utc;

use crate::db::collections;
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

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator takes an unauthenticated connection; skip ADC lookup.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client; every operation returns `AppError::Database`.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn get_activity_document(
        &self,
        id: &str,
    ) -> Result<Option<ActivityDocument>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_activity_document(
        &self,
        id: &str,
        doc: &ActivityDocument,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

// ─── Activity Operations ─────────────────────────────────────

#[async_trait]
impl ActivityRepository for FirestoreDb {
    async fn find_all(&self) -> Result<Vec<Activity>, AppError> {
        let docs: Vec<ActivityDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(decode_activities(docs))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Activity>, AppError> {
        let Some(doc) = self.get_activity_document(id).await? else {
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
        let docs: Vec<ActivityDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(|q| q.for_all([q.field("category").eq(category.as_str())]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(decode_activities(docs))
    }

    async fn find_by_status(&self, status: ActivityStatus) -> Result<Vec<Activity>, AppError> {
        let docs: Vec<ActivityDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(|q| q.for_all([q.field("status").eq(status.as_str())]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(decode_activities(docs))
    }

    /// Firestore allows range filters on one field only, so latitude is
    /// filtered server-side and longitude (plus ordering) here.
    async fn find_by_location_bounds(
        &self,
        bounds: &BoundingBox,
    ) -> Result<Vec<Activity>, AppError> {
        let (south, north) = (bounds.south, bounds.north);
        let docs: Vec<ActivityDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("latitude").greater_than_or_equal(south),
                    q.field("latitude").less_than_or_equal(north),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut activities: Vec<Activity> = decode_activities(docs)
            .into_iter()
            .filter(|a| a.location.is_some_and(|p| bounds.contains(&p)))
            .collect();
        super::sort_newest_first(&mut activities);
        Ok(activities)
    }

    async fn create(&self, request: &CreateActivityRequest) -> Result<Activity, AppError> {
        let activity = super::new_activity(request, Utc::now());
        let doc = ActivityDocument::from_activity(&activity);

        let _: ActivityDocument = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::ACTIVITIES)
            .document_id(&activity.id)
            .object(&doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(activity_id = %activity.id, created_by = %activity.created_by, "Activity created");

        self.find_by_id(&activity.id).await?.ok_or_else(|| {
            AppError::Database(format!("activity {} missing after create", activity.id))
        })
    }

    async fn update(&self, request: &UpdateActivityRequest) -> Result<Activity, AppError> {
        let current = self
            .find_by_id(&request.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", request.id)))?;

        let updated = request.apply_to(&current, Utc::now());
        self.set_activity_document(&updated.id, &ActivityDocument::from_activity(&updated))
            .await?;

        self.find_by_id(&request.id).await?.ok_or_else(|| {
            AppError::Database(format!("activity {} missing after update", request.id))
        })
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::ACTIVITIES)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

// ─── Profile Operations ──────────────────────────────────────

#[async_trait]
impl ProfileRepository for FirestoreDb {
    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        let doc: Option<ProfileDocument> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_PROFILES)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        doc.map(decode_profile)
            .transpose()
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_PROFILES)
            .document_id(&profile.user_id)
            .object(&ProfileDocument::from_profile(profile))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn find_by_verification_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<UserProfile>, AppError> {
        let docs: Vec<ProfileDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USER_PROFILES)
            .filter(|q| q.for_all([q.field("verificationStatus").eq(status.as_str())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(decode_profiles(docs))
    }
}
