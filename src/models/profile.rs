// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile model and the verification state machine.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Maximum size of a single verification document.
pub const MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

/// MIME types accepted for verification documents.
pub const ALLOWED_DOCUMENT_TYPES: [&str; 4] =
    ["application/pdf", "image/jpeg", "image/jpg", "image/png"];

/// Progress of a manual verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum VerificationStatus {
    #[default]
    None,
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::None => "none",
            VerificationStatus::Pending => "pending",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }

    /// Check that a self-service submission may start from this state.
    pub fn ensure_can_submit(&self) -> Result<(), AppError> {
        match self {
            VerificationStatus::None | VerificationStatus::Rejected => Ok(()),
            VerificationStatus::Pending => Err(AppError::Conflict(
                "a verification request is already pending review".to_string(),
            )),
            VerificationStatus::Approved => Err(AppError::Conflict(
                "profile is already verified".to_string(),
            )),
        }
    }

    /// Check that an individual profile may switch to business mode. A
    /// pending or approved review covers the profile as it was submitted.
    pub fn ensure_can_become_business(&self) -> Result<(), AppError> {
        match self {
            VerificationStatus::None | VerificationStatus::Rejected => Ok(()),
            VerificationStatus::Pending => Err(AppError::Conflict(
                "cannot switch to business while a verification request is pending".to_string(),
            )),
            VerificationStatus::Approved => Err(AppError::Conflict(
                "a verified individual profile cannot switch to business".to_string(),
            )),
        }
    }

    /// Resulting state of an admin decision, or Conflict if the profile is
    /// not awaiting review.
    pub fn decide(&self, decision: VerificationDecision) -> Result<Self, AppError> {
        if *self != VerificationStatus::Pending {
            return Err(AppError::Conflict(format!(
                "cannot {} a profile in state {}",
                decision.verb(),
                self
            )));
        }
        Ok(match decision {
            VerificationDecision::Approved => VerificationStatus::Approved,
            VerificationDecision::Rejected => VerificationStatus::Rejected,
        })
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome an admin can assign to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum VerificationDecision {
    Approved,
    Rejected,
}

impl VerificationDecision {
    fn verb(&self) -> &'static str {
        match self {
            VerificationDecision::Approved => "approve",
            VerificationDecision::Rejected => "reject",
        }
    }
}

/// Business mode flags. `confirmed` is a one-way latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusinessStatus {
    pub is_business: bool,
    pub confirmed: bool,
}

impl BusinessStatus {
    /// Apply a requested `is_business` value from an ordinary profile write.
    ///
    /// Switching business mode on must go through the explicit confirmation
    /// action, and a confirmed business cannot switch it off again.
    pub fn apply(self, requested: Option<bool>) -> Result<Self, AppError> {
        match requested {
            None => Ok(self),
            Some(true) if self.confirmed => Ok(Self {
                is_business: true,
                confirmed: true,
            }),
            Some(true) => Err(AppError::InvariantViolation(
                "business mode must be enabled through the confirmation step".to_string(),
            )),
            Some(false) if self.confirmed => Err(AppError::InvariantViolation(
                "a confirmed business profile cannot be reverted".to_string(),
            )),
            Some(false) => Ok(Self {
                is_business: false,
                confirmed: false,
            }),
        }
    }

    /// The explicit confirmation action. Idempotent.
    pub fn confirm(self) -> Self {
        Self {
            is_business: true,
            confirmed: true,
        }
    }
}

/// Social network links; each must be an http(s) URL when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SocialMedia {
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
}

impl SocialMedia {
    /// `(network label, url)` for every link that is set.
    pub fn links(&self) -> Vec<(&'static str, &str)> {
        [
            ("Facebook", &self.facebook),
            ("Instagram", &self.instagram),
            ("Twitter", &self.twitter),
            ("LinkedIn", &self.linkedin),
        ]
        .into_iter()
        .filter_map(|(label, v)| v.as_deref().map(|url| (label, url)))
        .collect()
    }

    fn trimmed(&self) -> Self {
        Self {
            facebook: trim_optional(&self.facebook),
            instagram: trim_optional(&self.instagram),
            twitter: trim_optional(&self.twitter),
            linkedin: trim_optional(&self.linkedin),
        }
    }
}

/// Download URLs of the uploaded verification documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VerificationDocuments {
    pub camera_document_url: Option<String>,
    pub commerce_document_url: Option<String>,
}

/// One profile per user, keyed by the identity provider uid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub user_id: String,
    pub full_name: String,
    pub description: String,
    pub location: String,
    pub phone: String,
    pub email: String,
    pub social_media: SocialMedia,
    pub is_business: bool,
    pub is_business_confirmed: bool,
    pub documents: VerificationDocuments,
    /// True iff `verification_status` is approved
    pub is_verified: bool,
    pub verification_status: VerificationStatus,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub submitted_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Minimal profile created the first time a user signs in.
    pub fn stub(
        user_id: impl Into<String>,
        display_name: Option<&str>,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            full_name: display_name.unwrap_or_default().trim().to_string(),
            description: String::new(),
            location: String::new(),
            phone: String::new(),
            email: email.unwrap_or_default().trim().to_string(),
            social_media: SocialMedia::default(),
            is_business: false,
            is_business_confirmed: false,
            documents: VerificationDocuments::default(),
            is_verified: false,
            verification_status: VerificationStatus::None,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn business(&self) -> BusinessStatus {
        BusinessStatus {
            is_business: self.is_business,
            confirmed: self.is_business_confirmed,
        }
    }

    pub fn set_business(&mut self, status: BusinessStatus) {
        self.is_business = status.is_business;
        self.is_business_confirmed = status.confirmed;
    }

    /// Move to a new verification state, keeping `is_verified` in step.
    pub fn set_verification_status(&mut self, status: VerificationStatus) {
        self.verification_status = status;
        self.is_verified = status == VerificationStatus::Approved;
    }

    /// Copy the editable fields of `data` onto this profile.
    pub fn apply_data(&mut self, data: &ProfileData) {
        self.full_name = data.full_name.clone();
        self.description = data.description.clone();
        self.location = data.location.clone();
        self.phone = data.phone.clone();
        self.email = data.email.clone();
        self.social_media = data.social_media.clone();
    }
}

/// Profile fields submitted with a verification request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileData {
    pub full_name: String,
    pub description: String,
    pub location: String,
    pub phone: String,
    pub email: String,
    pub social_media: SocialMedia,
    /// Requested business mode; None keeps the stored value
    pub is_business: Option<bool>,
}

impl ProfileData {
    /// Trim every text field; empty social links become None.
    pub fn normalized(&self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            description: self.description.trim().to_string(),
            location: self.location.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            social_media: self.social_media.trimmed(),
            is_business: self.is_business,
        }
    }
}

/// Partial profile edit. Never touches documents or verification state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub social_media: Option<SocialMedia>,
    pub is_business: Option<bool>,
}

impl ProfileUpdate {
    /// Merge onto `profile` (trimmed). Business flags are handled separately.
    pub fn merge_into(&self, profile: &mut UserProfile) {
        let set = |target: &mut String, value: &Option<String>| {
            if let Some(v) = value {
                *target = v.trim().to_string();
            }
        };
        set(&mut profile.full_name, &self.full_name);
        set(&mut profile.description, &self.description);
        set(&mut profile.location, &self.location);
        set(&mut profile.phone, &self.phone);
        set(&mut profile.email, &self.email);
        if let Some(social) = &self.social_media {
            profile.social_media = social.trimmed();
        }
    }
}

/// Which verification document a file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Chamber of commerce registration
    Camera,
    /// Commercial licence
    Commerce,
}

impl DocumentKind {
    pub fn slug(&self) -> &'static str {
        match self {
            DocumentKind::Camera => "camera-document",
            DocumentKind::Commerce => "commerce-document",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Camera => "camera document",
            DocumentKind::Commerce => "commerce document",
        }
    }
}

/// A document file received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// File extension used for the stored blob.
    pub fn extension(&self) -> &str {
        match self.content_type.as_str() {
            "application/pdf" => "pdf",
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            _ => self
                .file_name
                .rsplit_once('.')
                .map(|(_, ext)| ext)
                .unwrap_or("bin"),
        }
    }
}

/// Documents attached to a verification submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationUploads {
    pub camera_document: Option<DocumentUpload>,
    pub commerce_document: Option<DocumentUpload>,
}

impl VerificationUploads {
    pub fn get(&self, kind: DocumentKind) -> Option<&DocumentUpload> {
        match kind {
            DocumentKind::Camera => self.camera_document.as_ref(),
            DocumentKind::Commerce => self.commerce_document.as_ref(),
        }
    }
}

fn trim_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_allowed_states() {
        assert!(VerificationStatus::None.ensure_can_submit().is_ok());
        assert!(VerificationStatus::Rejected.ensure_can_submit().is_ok());
        assert!(matches!(
            VerificationStatus::Pending.ensure_can_submit(),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            VerificationStatus::Approved.ensure_can_submit(),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_business_switch_allowed_states() {
        assert!(VerificationStatus::None.ensure_can_become_business().is_ok());
        assert!(VerificationStatus::Rejected
            .ensure_can_become_business()
            .is_ok());
        for state in [VerificationStatus::Pending, VerificationStatus::Approved] {
            assert!(matches!(
                state.ensure_can_become_business(),
                Err(AppError::Conflict(_))
            ));
        }
    }

    #[test]
    fn test_decide_only_from_pending() {
        let pending = VerificationStatus::Pending;
        assert_eq!(
            pending.decide(VerificationDecision::Approved).unwrap(),
            VerificationStatus::Approved
        );
        assert_eq!(
            pending.decide(VerificationDecision::Rejected).unwrap(),
            VerificationStatus::Rejected
        );
        for state in [
            VerificationStatus::None,
            VerificationStatus::Approved,
            VerificationStatus::Rejected,
        ] {
            assert!(state.decide(VerificationDecision::Approved).is_err());
        }
    }

    #[test]
    fn test_business_latch() {
        let plain = BusinessStatus::default();
        assert!(matches!(
            plain.apply(Some(true)),
            Err(AppError::InvariantViolation(_))
        ));
        assert_eq!(plain.apply(Some(false)).unwrap(), plain);

        let confirmed = plain.confirm();
        assert!(confirmed.is_business && confirmed.confirmed);
        assert!(matches!(
            confirmed.apply(Some(false)),
            Err(AppError::InvariantViolation(_))
        ));
        assert_eq!(confirmed.apply(Some(true)).unwrap(), confirmed);
        assert_eq!(confirmed.apply(None).unwrap(), confirmed);
        assert_eq!(confirmed.confirm(), confirmed);
    }

    #[test]
    fn test_verified_flag_follows_status() {
        let mut profile = UserProfile::stub("u1", Some("Ana"), None, Utc::now());
        profile.set_verification_status(VerificationStatus::Approved);
        assert!(profile.is_verified);
        profile.set_verification_status(VerificationStatus::Rejected);
        assert!(!profile.is_verified);
    }

    #[test]
    fn test_normalized_trims_and_drops_empty_links() {
        let data = ProfileData {
            full_name: "  Ana Pérez ".to_string(),
            email: " ana@example.com".to_string(),
            social_media: SocialMedia {
                facebook: Some("   ".to_string()),
                instagram: Some(" https://instagram.com/ana ".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let n = data.normalized();
        assert_eq!(n.full_name, "Ana Pérez");
        assert_eq!(n.email, "ana@example.com");
        assert_eq!(n.social_media.facebook, None);
        assert_eq!(
            n.social_media.instagram.as_deref(),
            Some("https://instagram.com/ana")
        );
    }

    #[test]
    fn test_document_extension() {
        let doc = DocumentUpload {
            file_name: "rut.PDF".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: vec![],
        };
        assert_eq!(doc.extension(), "pdf");
        let doc = DocumentUpload {
            file_name: "scan.tiff".to_string(),
            content_type: "image/tiff".to_string(),
            bytes: vec![],
        };
        assert_eq!(doc.extension(), "tiff");
    }
}
