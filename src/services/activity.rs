// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity service.
//!
//! Validates input, enforces ownership, and delegates storage to an
//! [`ActivityRepository`].

use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::db::ActivityRepository;
use crate::error::{AppError, Result};
use crate::models::{
    Activity, ActivityCategory, ActivityStats, ActivityStatus, BoundingBox, CreateActivityDto,
    UpdateActivityDto,
};
use crate::validation::{validate_create_activity, validate_update_activity};

/// Optional list filters. At most one is applied, in the order
/// category, status, bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivityFilter {
    pub category: Option<ActivityCategory>,
    pub status: Option<ActivityStatus>,
    pub bounds: Option<BoundingBox>,
}

#[derive(Clone)]
pub struct ActivityService {
    repo: Arc<dyn ActivityRepository>,
}

impl ActivityService {
    pub fn new(repo: Arc<dyn ActivityRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_activity(
        &self,
        dto: &CreateActivityDto,
        created_by: &str,
    ) -> Result<Activity> {
        let request = validate_create_activity(dto, created_by, today())?;
        let activity = self.repo.create(&request).await?;

        tracing::info!(
            activity_id = %activity.id,
            category = %activity.category,
            created_by = %activity.created_by,
            "Created activity"
        );
        Ok(activity)
    }

    pub async fn get_activity(&self, id: &str) -> Result<Activity> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))
    }

    pub async fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        if let Some(category) = filter.category {
            return self.repo.find_by_category(category).await;
        }
        if let Some(status) = filter.status {
            return self.repo.find_by_status(status).await;
        }
        if let Some(bounds) = &filter.bounds {
            return self.repo.find_by_location_bounds(bounds).await;
        }
        self.repo.find_all().await
    }

    /// Apply a patch. When `requester` is given, only the owner may edit.
    pub async fn update_activity(
        &self,
        id: &str,
        dto: &UpdateActivityDto,
        requester: Option<&str>,
    ) -> Result<Activity> {
        let current = self.get_activity(id).await?;
        if let Some(requester) = requester {
            ensure_owner(&current, requester, "edit")?;
        }

        let request = validate_update_activity(id, dto, today())?;
        let activity = self.repo.update(&request).await?;

        tracing::info!(activity_id = %activity.id, "Updated activity");
        Ok(activity)
    }

    /// Delete an activity owned by `requester`. Nothing changes on failure.
    pub async fn delete_activity(&self, id: &str, requester: &str) -> Result<()> {
        let current = self.get_activity(id).await?;
        ensure_owner(&current, requester, "delete")?;

        self.repo.delete(id).await?;

        tracing::info!(activity_id = %id, requester = %requester, "Deleted activity");
        Ok(())
    }

    pub async fn get_stats(&self) -> Result<ActivityStats> {
        self.repo.get_stats().await
    }
}

fn ensure_owner(activity: &Activity, requester: &str, action: &str) -> Result<()> {
    if activity.created_by != requester {
        tracing::warn!(
            activity_id = %activity.id,
            requester = %requester,
            "Rejected {} by non-owner",
            action
        );
        return Err(AppError::Permission(format!(
            "only the creator can {} this activity",
            action
        )));
    }
    Ok(())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;

    fn service() -> ActivityService {
        ActivityService::new(Arc::new(MemoryDb::new()))
    }

    fn dto(category: ActivityCategory) -> CreateActivityDto {
        CreateActivityDto {
            title: "Olla comunitaria".to_string(),
            description: "Almuerzo para 200 personas".to_string(),
            category: Some(category.as_str().to_string()),
            latitude: Some(6.2442),
            longitude: Some(-75.5812),
            participants: 0,
            capacity: Some(200),
            date: Some(today().to_string()),
            time: Some("12:30".to_string()),
            venue: None,
            fundraising_goal: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_filter_precedence_category_over_status() {
        let svc = service();
        svc.create_activity(&dto(ActivityCategory::Colectas), "u1")
            .await
            .unwrap();
        svc.create_activity(&dto(ActivityCategory::Eventos), "u1")
            .await
            .unwrap();

        let filter = ActivityFilter {
            category: Some(ActivityCategory::Colectas),
            status: Some(ActivityStatus::Completed),
            bounds: None,
        };
        let found = svc.list_activities(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, ActivityCategory::Colectas);
    }

    #[tokio::test]
    async fn test_update_checks_existence_before_validation() {
        let svc = service();
        let patch = UpdateActivityDto {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            svc.update_activity("missing", &patch, None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_by_non_owner_is_rejected() {
        let svc = service();
        let a = svc
            .create_activity(&dto(ActivityCategory::Eventos), "owner")
            .await
            .unwrap();
        let patch = UpdateActivityDto {
            title: Some("Nuevo".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            svc.update_activity(&a.id, &patch, Some("intruder")).await,
            Err(AppError::Permission(_))
        ));
        let updated = svc
            .update_activity(&a.id, &patch, Some("owner"))
            .await
            .unwrap();
        assert_eq!(updated.title, "Nuevo");
    }
}
