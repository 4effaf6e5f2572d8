// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON API routes.
//!
//! Activity reads are public. Writes, profile routes and admin routes
//! require a session; the middleware is applied in routes/mod.rs.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    Activity, ActivityCategory, ActivityStats, ActivityStatus, BoundingBox, CreateActivityDto,
    DocumentUpload, ProfileData, ProfileUpdate, UpdateActivityDto, UserProfile,
    VerificationDecision, VerificationUploads,
};
use crate::services::ActivityFilter;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Largest accepted verification request body (two base64 documents).
const VERIFICATION_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Routes readable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(list_activities))
        .route("/api/activities/map", get(activity_map))
        .route("/api/activities/stats", get(activity_stats))
        .route("/api/activities/{id}", get(get_activity))
}

/// Routes that need a signed-in user.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", post(create_activity))
        .route(
            "/api/activities/{id}",
            axum::routing::put(update_activity).delete(delete_activity),
        )
        .route("/api/profile", get(get_profile).put(update_profile))
        .route(
            "/api/profile/business-confirmation",
            post(confirm_business),
        )
        .route(
            "/api/profile/verification",
            post(submit_verification).layer(DefaultBodyLimit::max(VERIFICATION_BODY_LIMIT)),
        )
}

/// Routes for administrators. Needs both auth and admin middleware.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/verifications", get(list_pending_verifications))
        .route(
            "/api/admin/verifications/{user_id}",
            post(decide_verification),
        )
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ActivitiesQuery {
    category: Option<String>,
    status: Option<String>,
    north: Option<f64>,
    south: Option<f64>,
    east: Option<f64>,
    west: Option<f64>,
}

impl ActivitiesQuery {
    fn into_filter(self) -> Result<ActivityFilter> {
        let category = self
            .category
            .as_deref()
            .map(str::parse::<ActivityCategory>)
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<ActivityStatus>)
            .transpose()?;
        let bounds = match (self.north, self.south, self.east, self.west) {
            (None, None, None, None) => None,
            (Some(n), Some(s), Some(e), Some(w)) => Some(BoundingBox::new(n, s, e, w)?),
            _ => {
                return Err(AppError::validation(
                    "north, south, east and west must be given together",
                ))
            }
        };
        Ok(ActivityFilter {
            category,
            status,
            bounds,
        })
    }
}

async fn list_activities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActivitiesQuery>,
) -> Result<Json<Vec<Activity>>> {
    let filter = query.into_filter()?;
    Ok(Json(state.activities.list_activities(&filter).await?))
}

/// Activities with usable coordinates as a GeoJSON FeatureCollection.
async fn activity_map(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActivitiesQuery>,
) -> Result<Json<FeatureCollection>> {
    let filter = query.into_filter()?;
    let activities = state.activities.list_activities(&filter).await?;
    Ok(Json(activities_to_geojson(&activities)))
}

async fn activity_stats(State(state): State<Arc<AppState>>) -> Result<Json<ActivityStats>> {
    Ok(Json(state.activities.get_stats().await?))
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Activity>> {
    Ok(Json(state.activities.get_activity(&id).await?))
}

async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(dto): Json<CreateActivityDto>,
) -> Result<(StatusCode, Json<Activity>)> {
    let activity = state.activities.create_activity(&dto, &user.uid).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn update_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(dto): Json<UpdateActivityDto>,
) -> Result<Json<Activity>> {
    Ok(Json(
        state
            .activities
            .update_activity(&id, &dto, Some(&user.uid))
            .await?,
    ))
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.activities.delete_activity(&id, &user.uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn activities_to_geojson(activities: &[Activity]) -> FeatureCollection {
    let features = activities
        .iter()
        .filter_map(|activity| {
            let point = activity.map_point()?;
            let mut properties = JsonObject::new();
            properties.insert("title".to_string(), activity.title.clone().into());
            properties.insert("category".to_string(), activity.category.as_str().into());
            properties.insert("status".to_string(), activity.status.as_str().into());
            properties.insert("date".to_string(), activity.date.to_string().into());
            properties.insert("participants".to_string(), activity.participants.into());

            Some(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    point.longitude,
                    point.latitude,
                ]))),
                id: Some(geojson::feature::Id::String(activity.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

// ─── Profile ─────────────────────────────────────────────────

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.profiles.get_profile(&user.uid).await?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.profiles.update_profile(&user.uid, &update).await?))
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BusinessConfirmationRequest {
    pub confirmed: bool,
}

async fn confirm_business(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<BusinessConfirmationRequest>,
) -> Result<Json<UserProfile>> {
    Ok(Json(
        state
            .profiles
            .confirm_business_status(&user.uid, request.confirmed)
            .await?,
    ))
}

/// A document file sent inline as base64.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DocumentPayload {
    pub file_name: String,
    pub content_type: String,
    /// Standard base64, no data-URL prefix
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VerificationRequest {
    pub profile: ProfileData,
    pub camera_document: Option<DocumentPayload>,
    pub commerce_document: Option<DocumentPayload>,
}

impl VerificationRequest {
    fn uploads(&self) -> Result<VerificationUploads> {
        let mut errors = Vec::new();
        let mut decode = |payload: &Option<DocumentPayload>, label: &str| {
            let payload = payload.as_ref()?;
            match STANDARD.decode(payload.data.trim()) {
                Ok(bytes) => Some(DocumentUpload {
                    file_name: payload.file_name.clone(),
                    content_type: payload.content_type.clone(),
                    bytes,
                }),
                Err(_) => {
                    errors.push(format!("{label} is not valid base64"));
                    None
                }
            }
        };
        let camera_document = decode(&self.camera_document, "camera document");
        let commerce_document = decode(&self.commerce_document, "commerce document");

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        Ok(VerificationUploads {
            camera_document,
            commerce_document,
        })
    }
}

async fn submit_verification(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<VerificationRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    let uploads = request.uploads()?;
    let submission = state
        .profiles
        .submit_verification(&user.uid, &request.profile, &uploads)
        .await?;
    // Notifications finish on their own.
    drop(submission.notifications);
    Ok((StatusCode::ACCEPTED, Json(submission.profile)))
}

// ─── Admin ───────────────────────────────────────────────────

async fn list_pending_verifications(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserProfile>>> {
    Ok(Json(state.profiles.pending_verifications().await?))
}

#[derive(Debug, Deserialize, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DecisionRequest {
    pub decision: VerificationDecision,
}

async fn decide_verification(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<UserProfile>> {
    tracing::info!(admin = %admin.uid, user_id = %user_id, decision = ?request.decision, "Admin verification decision");
    Ok(Json(
        state.profiles.decide(&user_id, request.decision).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn activity(id: &str, location: Option<GeoPoint>) -> Activity {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        Activity {
            id: id.to_string(),
            title: "Colecta de útiles".to_string(),
            description: "Útiles escolares".to_string(),
            category: ActivityCategory::Colectas,
            location,
            venue: None,
            participants: 4,
            capacity: None,
            date: NaiveDate::from_ymd_opt(2030, 2, 1).unwrap(),
            time: None,
            fundraising_goal: None,
            status: ActivityStatus::Upcoming,
            created_by: "u1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_geojson_skips_unmappable_activities() {
        let collection = activities_to_geojson(&[
            activity("a", Some(GeoPoint::new(6.25, -75.56))),
            activity("b", None),
            activity("c", Some(GeoPoint::new(f64::NAN, 1.0))),
        ]);
        assert_eq!(collection.features.len(), 1);
        let feature = &collection.features[0];
        assert_eq!(
            feature.geometry.as_ref().map(|g| g.value.clone()),
            Some(Value::Point(vec![-75.56, 6.25]))
        );
        assert_eq!(
            feature.property("category").and_then(|v| v.as_str()),
            Some("colectas")
        );
    }

    #[test]
    fn test_partial_bounds_rejected() {
        let query = ActivitiesQuery {
            north: Some(1.0),
            ..Default::default()
        };
        assert!(matches!(query.into_filter(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let query = ActivitiesQuery {
            category: Some("fiestas".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.into_filter(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_bad_base64_is_validation_error() {
        let request = VerificationRequest {
            profile: ProfileData::default(),
            camera_document: Some(DocumentPayload {
                file_name: "c.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                data: "%%%".to_string(),
            }),
            commerce_document: None,
        };
        let err = request.uploads().unwrap_err();
        assert_eq!(err.violations(), ["camera document is not valid base64"]);
    }
}
