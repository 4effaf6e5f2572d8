// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod activity;
pub mod profile;
pub mod stats;

pub use activity::{
    Activity, ActivityCategory, ActivityStatus, BoundingBox, CreateActivityDto,
    CreateActivityRequest, GeoPoint, UpdateActivityDto, UpdateActivityRequest,
};
pub use profile::{
    BusinessStatus, DocumentKind, DocumentUpload, ProfileData, ProfileUpdate, SocialMedia,
    UserProfile, VerificationDecision, VerificationDocuments, VerificationStatus,
    VerificationUploads,
};
pub use stats::ActivityStats;
