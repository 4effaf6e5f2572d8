// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stored document shapes and the single decode boundary.
//!
//! Documents in `activities` and `userProfiles` were written by several
//! generations of clients, so every field is optional here. `decode_activity`
//! and `decode_profile` turn a raw document into a domain value (or explain
//! why they can't); nothing else in the crate reads raw documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    Activity, ActivityCategory, ActivityStatus, GeoPoint, SocialMedia, UserProfile,
    VerificationDocuments, VerificationStatus,
};
use crate::validation::parse_activity_date;

/// `location` holds coordinates in older documents and the venue text in
/// newer ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationField {
    Point(GeoPoint),
    Venue(String),
}

/// Raw `activities/{id}` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDocument {
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location: Option<LocationField>,
    pub participants: Option<f64>,
    pub capacity: Option<f64>,
    /// `YYYY-MM-DD`; older documents hold a full timestamp string
    pub date: Option<String>,
    pub time: Option<String>,
    pub fundraising_goal: Option<String>,
    pub status: Option<String>,
    pub created_by: Option<String>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ActivityDocument {
    pub fn from_activity(activity: &Activity) -> Self {
        Self {
            id: Some(activity.id.clone()),
            title: Some(activity.title.clone()),
            description: Some(activity.description.clone()),
            category: Some(activity.category.as_str().to_string()),
            latitude: activity.location.map(|p| p.latitude),
            longitude: activity.location.map(|p| p.longitude),
            location: activity.venue.clone().map(LocationField::Venue),
            participants: Some(f64::from(activity.participants)),
            capacity: activity.capacity.map(f64::from),
            date: Some(activity.date.format("%Y-%m-%d").to_string()),
            time: activity.time.clone(),
            fundraising_goal: activity.fundraising_goal.clone(),
            status: Some(activity.status.as_str().to_string()),
            created_by: Some(activity.created_by.clone()),
            created_at: Some(activity.created_at),
            updated_at: Some(activity.updated_at),
        }
    }
}

/// Why a stored document could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("document {id}: {reason}")]
pub struct DecodeError {
    pub id: String,
    pub reason: String,
}

fn decode_error(id: &str, reason: impl Into<String>) -> DecodeError {
    DecodeError {
        id: id.to_string(),
        reason: reason.into(),
    }
}

/// Decode a stored activity, normalizing legacy shapes.
pub fn decode_activity(doc: ActivityDocument) -> Result<Activity, DecodeError> {
    let id = doc.id.clone().unwrap_or_default();
    if id.is_empty() {
        return Err(decode_error("<unknown>", "missing document id"));
    }

    let title = doc
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| decode_error(&id, "missing title"))?;
    let category: ActivityCategory = doc
        .category
        .as_deref()
        .ok_or_else(|| decode_error(&id, "missing category"))?
        .parse()
        .map_err(|e| decode_error(&id, format!("{e}")))?;
    // Status was optional in the first schema; those activities were all upcoming.
    let status = match doc.status.as_deref() {
        None => ActivityStatus::Upcoming,
        Some(s) => s.parse().map_err(|e| decode_error(&id, format!("{e}")))?,
    };
    let created_by = doc
        .created_by
        .filter(|c| !c.is_empty())
        .ok_or_else(|| decode_error(&id, "missing createdBy"))?;
    let date = doc
        .date
        .as_deref()
        .and_then(parse_activity_date)
        .ok_or_else(|| decode_error(&id, format!("unreadable date {:?}", doc.date)))?;

    let (location, venue) = match (doc.latitude, doc.longitude, doc.location) {
        (Some(lat), Some(lng), loc) => (
            Some(GeoPoint::new(lat, lng)),
            match loc {
                Some(LocationField::Venue(v)) => Some(v),
                _ => None,
            },
        ),
        (_, _, Some(LocationField::Point(p))) => (Some(p), None),
        (_, _, Some(LocationField::Venue(v))) => (None, Some(v)),
        (_, _, None) => (None, None),
    };

    let participants = doc
        .participants
        .filter(|p| p.is_finite() && *p >= 0.0)
        .map(|p| p.round().min(f64::from(u32::MAX)) as u32)
        .unwrap_or(0);
    let capacity = doc
        .capacity
        .filter(|c| c.is_finite() && *c >= 1.0)
        .map(|c| c.round().min(f64::from(u32::MAX)) as u32);

    let created_at = doc
        .created_at
        .or(doc.updated_at)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let updated_at = doc.updated_at.unwrap_or(created_at).max(created_at);

    Ok(Activity {
        id,
        title,
        description: doc.description.unwrap_or_default(),
        category,
        location,
        venue: venue.filter(|v| !v.trim().is_empty()),
        participants,
        capacity,
        date,
        time: doc.time.filter(|t| !t.is_empty()),
        fundraising_goal: doc.fundraising_goal.filter(|g| !g.is_empty()),
        status,
        created_by,
        created_at,
        updated_at,
    })
}

/// Decode a batch, skipping (and logging) documents that cannot be read.
pub fn decode_activities(docs: Vec<ActivityDocument>) -> Vec<Activity> {
    docs.into_iter()
        .filter_map(|doc| match decode_activity(doc) {
            Ok(activity) => Some(activity),
            Err(e) => {
                tracing::warn!(id = %e.id, reason = %e.reason, "Skipping unreadable activity document");
                None
            }
        })
        .collect()
}

/// Raw `userProfiles/{uid}` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub doc_id: Option<String>,
    pub user_id: Option<String>,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub social_media: Option<SocialMedia>,
    pub is_business: Option<bool>,
    pub is_business_confirmed: Option<bool>,
    pub documents: Option<VerificationDocuments>,
    pub is_verified: Option<bool>,
    pub verification_status: Option<String>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileDocument {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            doc_id: Some(profile.user_id.clone()),
            user_id: Some(profile.user_id.clone()),
            full_name: Some(profile.full_name.clone()),
            description: Some(profile.description.clone()),
            location: Some(profile.location.clone()),
            phone: Some(profile.phone.clone()),
            email: Some(profile.email.clone()),
            social_media: Some(profile.social_media.clone()),
            is_business: Some(profile.is_business),
            is_business_confirmed: Some(profile.is_business_confirmed),
            documents: Some(profile.documents.clone()),
            is_verified: Some(profile.is_verified),
            verification_status: Some(profile.verification_status.as_str().to_string()),
            submitted_at: profile.submitted_at,
            created_at: Some(profile.created_at),
            updated_at: Some(profile.updated_at),
        }
    }
}

/// Decode a stored profile. A missing status reads as `none`, and
/// `is_verified` is recomputed from the status rather than trusted.
pub fn decode_profile(doc: ProfileDocument) -> Result<UserProfile, DecodeError> {
    let user_id = doc
        .doc_id
        .clone()
        .or(doc.user_id.clone())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| decode_error("<unknown>", "missing user id"))?;

    let verification_status = match doc.verification_status.as_deref() {
        None | Some("") | Some("none") => VerificationStatus::None,
        Some("pending") => VerificationStatus::Pending,
        Some("approved") => VerificationStatus::Approved,
        Some("rejected") => VerificationStatus::Rejected,
        Some(other) => {
            return Err(decode_error(
                &user_id,
                format!("unknown verificationStatus {other}"),
            ))
        }
    };

    let is_business_confirmed = doc.is_business_confirmed.unwrap_or(false);
    let created_at = doc
        .created_at
        .or(doc.updated_at)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Ok(UserProfile {
        user_id,
        full_name: doc.full_name.unwrap_or_default(),
        description: doc.description.unwrap_or_default(),
        location: doc.location.unwrap_or_default(),
        phone: doc.phone.unwrap_or_default(),
        email: doc.email.unwrap_or_default(),
        social_media: doc.social_media.unwrap_or_default(),
        // A confirmed business is a business even if an old client cleared the flag.
        is_business: doc.is_business.unwrap_or(false) || is_business_confirmed,
        is_business_confirmed,
        documents: doc.documents.unwrap_or_default(),
        is_verified: verification_status == VerificationStatus::Approved,
        verification_status,
        submitted_at: doc.submitted_at,
        created_at,
        updated_at: doc.updated_at.unwrap_or(created_at).max(created_at),
    })
}

pub fn decode_profiles(docs: Vec<ProfileDocument>) -> Vec<UserProfile> {
    docs.into_iter()
        .filter_map(|doc| match decode_profile(doc) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(id = %e.id, reason = %e.reason, "Skipping unreadable profile document");
                None
            }
        })
        .collect()
}
