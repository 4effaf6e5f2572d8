// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use parche_solidario::config::Config;
use parche_solidario::db::{FirestoreDb, MemoryDb};
use parche_solidario::middleware::auth::create_jwt;
use parche_solidario::models::{ActivityCategory, CreateActivityDto};
use parche_solidario::routes::create_router;
use parche_solidario::services::{
    ActivityService, FirebaseTokenVerifier, LogNotifier, MemoryBlobStore, NotificationDispatcher,
    ProfileService,
};
use parche_solidario::AppState;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Key id the static test verifier accepts.
#[allow(dead_code)]
pub const TEST_KID: &str = "test-kid";

const PRIVATE_KEY_PEM: &[u8] = include_bytes!("../fixtures/firebase_test_key.pem");
const PUBLIC_KEY_PEM: &[u8] = include_bytes!("../fixtures/firebase_test_key.pub.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Everything a router test needs to reach behind the HTTP surface.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub blobs: MemoryBlobStore,
}

#[allow(dead_code)]
impl TestApp {
    /// Session token for `uid`, as `/auth/session` would issue it.
    pub fn session_token(&self, uid: &str) -> String {
        create_jwt(uid, &self.state.config.jwt_signing_key).unwrap()
    }

    pub fn bearer(&self, uid: &str) -> String {
        format!("Bearer {}", self.session_token(uid))
    }
}

/// Create a test app backed by the in-memory store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> TestApp {
    create_test_app_with_config(Config {
        frontend_url: frontend_url.to_string(),
        ..Config::test_default()
    })
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let db = MemoryDb::new();
    let blobs = MemoryBlobStore::new();
    let notifications = NotificationDispatcher::new(
        Arc::new(LogNotifier::new(&config.operator_email)),
        1,
        Duration::from_millis(1),
    );
    let token_verifier = Arc::new(static_verifier(&config));

    let state = Arc::new(AppState {
        activities: ActivityService::new(Arc::new(db.clone())),
        profiles: ProfileService::new(
            Arc::new(db.clone()),
            Arc::new(blobs.clone()),
            notifications,
        ),
        token_verifier,
        config,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        blobs,
    }
}

/// Verifier that trusts the fixture key under [`TEST_KID`].
#[allow(dead_code)]
pub fn static_verifier(config: &Config) -> FirebaseTokenVerifier {
    let key = DecodingKey::from_rsa_pem(PUBLIC_KEY_PEM).expect("fixture public key");
    FirebaseTokenVerifier::new_with_static_key(config, TEST_KID, key).unwrap()
}

/// Claims of a Firebase ID token.
#[derive(Debug, Clone, Serialize)]
#[allow(dead_code)]
pub struct IdTokenClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub auth_time: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[allow(dead_code)]
impl IdTokenClaims {
    /// Valid claims for `uid` against the test project.
    pub fn for_user(uid: &str) -> Self {
        let now = now_secs();
        Self {
            iss: "https://securetoken.google.com/test-project".to_string(),
            aud: "test-project".to_string(),
            sub: uid.to_string(),
            iat: now,
            exp: now + 3600,
            auth_time: now,
            name: Some("Ana Gómez".to_string()),
            email: Some("ana@example.com".to_string()),
        }
    }
}

/// Sign an ID token with the fixture private key.
#[allow(dead_code)]
pub fn sign_id_token(claims: &IdTokenClaims, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM).expect("fixture private key");
    encode(&header, claims, &key).unwrap()
}

#[allow(dead_code)]
pub fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

/// A create request that passes validation, dated a week from now.
#[allow(dead_code)]
pub fn activity_dto(title: &str, category: ActivityCategory, lat: f64, lng: f64) -> CreateActivityDto {
    CreateActivityDto {
        title: title.to_string(),
        description: format!("{title} en el barrio"),
        category: Some(category.as_str().to_string()),
        latitude: Some(lat),
        longitude: Some(lng),
        participants: 0,
        capacity: None,
        date: Some(
            (Utc::now().date_naive() + ChronoDuration::days(7))
                .format("%Y-%m-%d")
                .to_string(),
        ),
        time: None,
        venue: None,
        fundraising_goal: None,
        status: None,
    }
}
