// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Input validation for activities and profiles.
//!
//! Every check collects all violated rules instead of stopping at the first,
//! and a successful check yields a typed request.

use chrono::{DateTime, NaiveDate, NaiveTime};
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::models::profile::{ALLOWED_DOCUMENT_TYPES, MAX_DOCUMENT_BYTES};
use crate::models::{
    ActivityCategory, ActivityStatus, CreateActivityDto, CreateActivityRequest, DocumentKind,
    DocumentUpload, GeoPoint, ProfileData, UpdateActivityDto, UpdateActivityRequest, UserProfile,
    VerificationUploads,
};

// ─── Activities ──────────────────────────────────────────────

/// Validate a create request. `today` is the current UTC calendar date.
pub fn validate_create_activity(
    dto: &CreateActivityDto,
    created_by: &str,
    today: NaiveDate,
) -> Result<CreateActivityRequest> {
    let mut errors = Vec::new();

    let title = required_text(&dto.title, "title", &mut errors);
    let description = required_text(&dto.description, "description", &mut errors);

    let category = match dto.category.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push("category is required".to_string());
            None
        }
        Some(raw) => parse_label::<ActivityCategory>(raw, &mut errors),
    };
    let status = match dto.status.as_deref().map(str::trim) {
        None | Some("") => Some(ActivityStatus::Upcoming),
        Some(raw) => parse_label::<ActivityStatus>(raw, &mut errors),
    };

    let date = match dto.date.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push("date is required".to_string());
            None
        }
        Some(raw) => check_date(raw, today, &mut errors),
    };

    let participants = check_participants(dto.participants, &mut errors);
    let location = check_location(dto.latitude, dto.longitude, &mut errors);
    let capacity = dto
        .capacity
        .and_then(|c| check_capacity(c, &mut errors));
    let time = check_time(dto.time.as_deref(), &mut errors);

    if created_by.trim().is_empty() {
        errors.push("createdBy is required".to_string());
    }

    match (category, status, date, participants, location) {
        (Some(category), Some(status), Some(date), Some(participants), Some(location))
            if errors.is_empty() =>
        {
            Ok(CreateActivityRequest {
                title,
                description,
                category,
                location,
                venue: non_empty(dto.venue.as_deref()),
                participants,
                capacity,
                date,
                time,
                fundraising_goal: non_empty(dto.fundraising_goal.as_deref()),
                status,
                created_by: created_by.trim().to_string(),
            })
        }
        _ => Err(AppError::Validation(errors)),
    }
}

/// Validate a patch. Only fields present in `dto` are checked.
pub fn validate_update_activity(
    id: &str,
    dto: &UpdateActivityDto,
    today: NaiveDate,
) -> Result<UpdateActivityRequest> {
    let mut errors = Vec::new();

    let title = dto
        .title
        .as_deref()
        .map(|t| required_text(t, "title", &mut errors));
    let description = dto
        .description
        .as_deref()
        .map(|d| required_text(d, "description", &mut errors));
    let category = dto
        .category
        .as_deref()
        .and_then(|raw| parse_label::<ActivityCategory>(raw.trim(), &mut errors));
    let status = dto
        .status
        .as_deref()
        .and_then(|raw| parse_label::<ActivityStatus>(raw.trim(), &mut errors));
    let date = dto
        .date
        .as_deref()
        .and_then(|raw| check_date(raw.trim(), today, &mut errors));
    let participants = dto
        .participants
        .and_then(|p| check_participants(p, &mut errors));
    let capacity = dto
        .capacity
        .and_then(|c| check_capacity(c, &mut errors));
    let time = check_time(dto.time.as_deref(), &mut errors);

    let location = match (dto.latitude, dto.longitude) {
        (None, None) => None,
        (lat, lng) => check_location(lat, lng, &mut errors),
    };

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(UpdateActivityRequest {
        id: id.to_string(),
        title,
        description,
        category,
        location,
        venue: dto.venue.as_deref().map(|v| v.trim().to_string()),
        participants,
        capacity,
        date,
        time,
        fundraising_goal: dto.fundraising_goal.as_deref().map(|v| v.trim().to_string()),
        status,
    })
}

/// Parse `YYYY-MM-DD`, or take the calendar date of an RFC3339 timestamp as
/// written (its own offset, not converted to UTC).
pub fn parse_activity_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
}

fn required_text(value: &str, field: &str, errors: &mut Vec<String>) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(format!("{field} is required"));
    }
    trimmed.to_string()
}

/// Parse a category or status label, recording the violation on failure.
fn parse_label<T: FromStr<Err = AppError>>(raw: &str, errors: &mut Vec<String>) -> Option<T> {
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            errors.extend(e.violations().iter().cloned());
            None
        }
    }
}

fn check_date(raw: &str, today: NaiveDate, errors: &mut Vec<String>) -> Option<NaiveDate> {
    match parse_activity_date(raw) {
        None => {
            errors.push(format!("date is not a valid date: {raw}"));
            None
        }
        Some(date) if date < today => {
            errors.push(format!("date {date} is in the past"));
            None
        }
        Some(date) => Some(date),
    }
}

fn check_participants(value: i64, errors: &mut Vec<String>) -> Option<u32> {
    match u32::try_from(value) {
        Ok(v) => Some(v),
        Err(_) if value < 0 => {
            errors.push("participants cannot be negative".to_string());
            None
        }
        Err(_) => {
            errors.push("participants is too large".to_string());
            None
        }
    }
}

fn check_capacity(value: i64, errors: &mut Vec<String>) -> Option<u32> {
    if value < 1 {
        errors.push("capacity must be at least 1".to_string());
        return None;
    }
    match u32::try_from(value) {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push("capacity is too large".to_string());
            None
        }
    }
}

fn check_time(value: Option<&str>, errors: &mut Vec<String>) -> Option<String> {
    let value = value.map(str::trim).filter(|t| !t.is_empty())?;
    if NaiveTime::parse_from_str(value, "%H:%M").is_err() {
        errors.push(format!("time must be HH:MM, got {value}"));
        return None;
    }
    Some(value.to_string())
}

fn check_location(
    latitude: Option<f64>,
    longitude: Option<f64>,
    errors: &mut Vec<String>,
) -> Option<GeoPoint> {
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        errors.push("location requires both latitude and longitude".to_string());
        return None;
    };
    let point = GeoPoint::new(latitude, longitude);
    if point.is_valid() {
        return Some(point);
    }
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        errors.push(format!("latitude must be between -90 and 90, got {latitude}"));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        errors.push(format!(
            "longitude must be between -180 and 180, got {longitude}"
        ));
    }
    None
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

// ─── Profiles ────────────────────────────────────────────────

/// `local@domain.tld`: one `@`, no whitespace, a dot inside the domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .match_indices('.')
        .any(|(i, _)| i > 0 && i + 1 < domain.len())
}

pub fn is_http_url(url: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()))
}

/// Full check for a verification submission. `data` should already be
/// normalized. Documents are only required for business profiles.
pub fn validate_profile_data(
    data: &ProfileData,
    is_business: bool,
    uploads: &VerificationUploads,
) -> Result<()> {
    let mut errors = Vec::new();

    for (value, field) in [
        (&data.full_name, "fullName"),
        (&data.description, "description"),
        (&data.location, "location"),
        (&data.email, "email"),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{field} is required"));
        }
    }
    if !data.email.trim().is_empty() && !is_valid_email(&data.email) {
        errors.push("email is not a valid address".to_string());
    }

    for (network, url) in data.social_media.links() {
        if !is_http_url(url) {
            errors.push(format!(
                "{network} URL must start with http:// or https://"
            ));
        }
    }

    if is_business {
        for kind in [DocumentKind::Camera, DocumentKind::Commerce] {
            match uploads.get(kind) {
                None => errors.push(format!("{} is required", kind.label())),
                Some(doc) => errors.extend(document_violations(kind, doc)),
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Lightweight check applied to the merged result of a profile edit.
pub fn validate_profile_update(profile: &UserProfile) -> Result<()> {
    let mut errors = Vec::new();
    if profile.full_name.trim().is_empty() {
        errors.push("fullName is required".to_string());
    }
    if profile.email.trim().is_empty() {
        errors.push("email is required".to_string());
    } else if !is_valid_email(&profile.email) {
        errors.push("email is not a valid address".to_string());
    }
    for (network, url) in profile.social_media.links() {
        if !is_http_url(url) {
            errors.push(format!(
                "{network} URL must start with http:// or https://"
            ));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Size and type rules for a single document.
pub fn document_violations(kind: DocumentKind, doc: &DocumentUpload) -> Vec<String> {
    let mut errors = Vec::new();
    if doc.size() > MAX_DOCUMENT_BYTES {
        errors.push(format!(
            "{} is too large ({} bytes, maximum 5MB)",
            kind.label(),
            doc.size()
        ));
    }
    if !ALLOWED_DOCUMENT_TYPES.contains(&doc.content_type.as_str()) {
        errors.push(format!(
            "{} must be PDF, JPG, JPEG or PNG (got {})",
            kind.label(),
            doc.content_type
        ));
    }
    errors
}
