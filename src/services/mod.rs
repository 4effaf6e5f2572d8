// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod firebase_auth;
pub mod notify;
pub mod profile;
pub mod storage;

pub use activity::{ActivityFilter, ActivityService};
pub use firebase_auth::{FirebaseIdentity, FirebaseTokenVerifier};
pub use notify::{
    notifier_from_config, LogNotifier, NotificationDispatcher, NotificationReport, Notifier,
    VerificationNotice, WebhookNotifier,
};
pub use profile::{ProfileService, Submission};
pub use storage::{BlobStore, FirebaseStorage, MemoryBlobStore, StoredBlob};
