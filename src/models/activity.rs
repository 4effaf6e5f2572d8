// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Community activity model for storage and API.

use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use geo::{coord, Intersects, Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Kind of community activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ActivityCategory {
    Eventos,
    Colectas,
    Refugios,
    Protestas,
}

impl ActivityCategory {
    pub const ALL: [ActivityCategory; 4] = [
        ActivityCategory::Eventos,
        ActivityCategory::Colectas,
        ActivityCategory::Refugios,
        ActivityCategory::Protestas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityCategory::Eventos => "eventos",
            ActivityCategory::Colectas => "colectas",
            ActivityCategory::Refugios => "refugios",
            ActivityCategory::Protestas => "protestas",
        }
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("unknown category: {s}")))
    }
}

/// Lifecycle label set by the organiser; never derived from the date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ActivityStatus {
    Upcoming,
    Active,
    Completed,
}

impl ActivityStatus {
    pub const ALL: [ActivityStatus; 3] = [
        ActivityStatus::Upcoming,
        ActivityStatus::Active,
        ActivityStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Upcoming => "upcoming",
            ActivityStatus::Active => "active",
            ActivityStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityStatus::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("unknown status: {s}")))
    }
}

/// WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and inside ±90 / ±180.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    fn as_point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Axis-aligned lat/lng box, inclusive on every edge.
///
/// Boxes crossing the antimeridian are not representable: `west` must not
/// exceed `east`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Build a box, rejecting inverted or non-finite edges.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, AppError> {
        let mut violations = Vec::new();
        if ![north, south, east, west].iter().all(|v| v.is_finite()) {
            violations.push("bounding box edges must be finite numbers".to_string());
        } else {
            if south > north {
                violations.push(format!(
                    "bounding box south ({south}) is greater than north ({north})"
                ));
            }
            if west > east {
                violations.push(format!(
                    "bounding box west ({west}) is greater than east ({east}); boxes crossing the antimeridian are not supported"
                ));
            }
        }
        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }
        Ok(Self {
            north,
            south,
            east,
            west,
        })
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        if !point.is_valid() {
            return false;
        }
        let rect = Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        );
        // Intersects includes the boundary, Contains would not.
        rect.intersects(&point.as_point())
    }
}

/// Stored activity, as returned by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Activity {
    /// Store-assigned document ID
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: ActivityCategory,
    /// None only for legacy documents written without coordinates
    pub location: Option<GeoPoint>,
    /// Free-text venue ("Parque Berrío, frente a la estación")
    pub venue: Option<String>,
    pub participants: u32,
    pub capacity: Option<u32>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    /// Local start time, `HH:MM`
    pub time: Option<String>,
    /// What the organiser is collecting ("100 mercados", "$2.000.000")
    pub fundraising_goal: Option<String>,
    pub status: ActivityStatus,
    /// Owner uid; immutable
    pub created_by: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Coordinates usable for map display.
    pub fn map_point(&self) -> Option<GeoPoint> {
        self.location.filter(GeoPoint::is_valid)
    }
}

// ─── Wire DTOs ───────────────────────────────────────────────

/// Create request as received over the wire, before validation.
///
/// Numbers are signed and coordinates optional so that bad input reaches
/// validation instead of failing deserialization with a single opaque error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateActivityDto {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Category label, parsed during validation
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub participants: i64,
    pub capacity: Option<i64>,
    /// `YYYY-MM-DD` or an RFC3339 timestamp (only the date part is used)
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(alias = "location")]
    pub venue: Option<String>,
    pub fundraising_goal: Option<String>,
    /// Status label; `upcoming` when absent
    pub status: Option<String>,
}

/// Partial update as received over the wire. Absent fields are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UpdateActivityDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub participants: Option<i64>,
    pub capacity: Option<i64>,
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(alias = "location")]
    pub venue: Option<String>,
    pub fundraising_goal: Option<String>,
    pub status: Option<String>,
}

// ─── Validated requests ──────────────────────────────────────

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateActivityRequest {
    pub title: String,
    pub description: String,
    pub category: ActivityCategory,
    pub location: GeoPoint,
    pub venue: Option<String>,
    pub participants: u32,
    pub capacity: Option<u32>,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub fundraising_goal: Option<String>,
    pub status: ActivityStatus,
    pub created_by: String,
}

/// A validated patch. `id` names the target; every other field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateActivityRequest {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<ActivityCategory>,
    pub location: Option<GeoPoint>,
    pub venue: Option<String>,
    pub participants: Option<u32>,
    pub capacity: Option<u32>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub fundraising_goal: Option<String>,
    pub status: Option<ActivityStatus>,
}

impl UpdateActivityRequest {
    /// Apply the patch to a copy of `activity`, leaving immutable fields alone.
    pub fn apply_to(&self, activity: &Activity, now: DateTime<Utc>) -> Activity {
        let mut updated = activity.clone();
        if let Some(v) = &self.title {
            updated.title = v.clone();
        }
        if let Some(v) = &self.description {
            updated.description = v.clone();
        }
        if let Some(v) = self.category {
            updated.category = v;
        }
        if let Some(v) = self.location {
            updated.location = Some(v);
        }
        if let Some(v) = &self.venue {
            updated.venue = Some(v.clone());
        }
        if let Some(v) = self.participants {
            updated.participants = v;
        }
        if let Some(v) = self.capacity {
            updated.capacity = Some(v);
        }
        if let Some(v) = self.date {
            updated.date = v;
        }
        if let Some(v) = &self.time {
            updated.time = Some(v.clone());
        }
        if let Some(v) = &self.fundraising_goal {
            updated.fundraising_goal = Some(v.clone());
        }
        if let Some(v) = self.status {
            updated.status = v;
        }
        updated.updated_at = now.max(activity.created_at);
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_names() {
        for c in ActivityCategory::ALL {
            assert_eq!(c.as_str().parse::<ActivityCategory>().unwrap(), c);
        }
        assert!("conciertos".parse::<ActivityCategory>().is_err());
    }

    #[test]
    fn test_bounding_box_is_inclusive() {
        let bounds = BoundingBox::new(10.0, 0.0, 10.0, 0.0).unwrap();
        assert!(bounds.contains(&GeoPoint::new(0.0, 0.0)));
        assert!(bounds.contains(&GeoPoint::new(10.0, 10.0)));
        assert!(bounds.contains(&GeoPoint::new(5.0, 5.0)));
        assert!(!bounds.contains(&GeoPoint::new(10.0001, 5.0)));
        assert!(!bounds.contains(&GeoPoint::new(5.0, -0.0001)));
        assert!(!bounds.contains(&GeoPoint::new(f64::NAN, 5.0)));
    }

    #[test]
    fn test_bounding_box_rejects_inverted_edges() {
        let err = BoundingBox::new(0.0, 10.0, 10.0, 0.0).unwrap_err();
        assert_eq!(err.violations().len(), 1);

        // Antimeridian-crossing box
        let err = BoundingBox::new(10.0, 0.0, -170.0, 170.0).unwrap_err();
        assert!(err.violations()[0].contains("antimeridian"));
    }

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint::new(0.0, 0.0).is_valid());
        assert!(GeoPoint::new(-90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(90.5, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
    }
}
