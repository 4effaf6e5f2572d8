// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Router tests over the in-memory backend.
//!
//! These tests verify that:
//! 1. Activity reads are public and writes need a session
//! 2. Validation failures come back as 400 with every violation listed
//! 3. Only the creator may delete an activity
//! 4. Admin routes are closed to non-admins
//! 5. Verification submissions decode base64 documents and store them

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parche_solidario::models::{ActivityCategory, VerificationStatus};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{activity_dto, create_test_app, TestApp};

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: Method, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

async fn create_activity(app: &TestApp, uid: &str, title: &str, lat: f64, lng: f64) -> Value {
    let dto = activity_dto(title, ActivityCategory::Eventos, lat, lng);
    let response = send(
        app,
        json_request(
            Method::POST,
            "/api/activities",
            Some(&app.bearer(uid)),
            serde_json::to_value(&dto).unwrap(),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let response = send(&app, get("/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = create_test_app();

    for uri in ["/health", "/api/profile"] {
        let response = send(&app, get(uri, None)).await;
        let headers = response.headers();
        assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
        assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
        assert_eq!(headers.get("Cache-Control").unwrap(), "no-store");
    }
}

#[tokio::test]
async fn test_writes_require_session() {
    let app = create_test_app();
    let dto = activity_dto("Olla comunitaria", ActivityCategory::Colectas, 6.2, -75.5);

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/activities",
            None,
            serde_json::to_value(&dto).unwrap(),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "unauthorized");

    let response = send(&app, get("/api/profile", Some("Bearer not-a-jwt"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_token");

    assert_eq!(app.db.activity_count(), 0);
}

#[tokio::test]
async fn test_create_and_read_back_publicly() {
    let app = create_test_app();
    let created = create_activity(&app, "u1", "Jornada de siembra", 6.25, -75.56).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["createdBy"], "u1");
    assert_eq!(created["status"], "upcoming");

    let response = send(&app, get(&format!("/api/activities/{id}"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["title"], "Jornada de siembra");

    let response = send(&app, get("/api/activities?category=eventos", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = send(&app, get("/api/activities/missing", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_validation_lists_violations() {
    let app = create_test_app();
    let body = json!({
        "title": "",
        "description": "",
        "category": "eventos",
        "latitude": 120.0,
        "longitude": -75.0,
        "participants": -1,
        "date": "2001-01-01",
    });

    let response = send(
        &app,
        json_request(Method::POST, "/api/activities", Some(&app.bearer("u1")), body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    let violations = body["violations"].as_array().unwrap();
    assert!(violations.len() >= 5, "got {violations:?}");
    assert_eq!(app.db.activity_count(), 0);
}

#[tokio::test]
async fn test_bad_category_reported_with_other_violations() {
    let app = create_test_app();
    let auth = app.bearer("u1");

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/activities",
            Some(&auth),
            json!({
                "title": "",
                "description": "Fiesta del barrio",
                "category": "fiestas",
                "latitude": 120.0,
                "longitude": -75.0,
                "participants": -1,
                "date": "2099-01-01",
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(
        body["violations"],
        json!([
            "title is required",
            "unknown category: fiestas",
            "participants cannot be negative",
            "latitude must be between -90 and 90, got 120",
        ])
    );

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/activities",
            Some(&auth),
            json!({
                "title": "Sin categoría",
                "description": "Falta la categoría",
                "latitude": 6.2,
                "longitude": -75.5,
                "date": "2099-01-01",
                "status": "someday",
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["violations"],
        json!(["category is required", "unknown status: someday"])
    );
    assert_eq!(app.db.activity_count(), 0);
}

#[tokio::test]
async fn test_partial_bounds_rejected() {
    let app = create_test_app();
    let response = send(&app, get("/api/activities?north=10&south=0", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bounds_query_filters() {
    let app = create_test_app();
    create_activity(&app, "u1", "dentro", 5.0, 5.0).await;
    create_activity(&app, "u1", "fuera", 20.0, 5.0).await;

    let response = send(
        &app,
        get("/api/activities?north=10&south=0&east=10&west=0", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["dentro"]);
}

#[tokio::test]
async fn test_delete_only_by_creator() {
    let app = create_test_app();
    let created = create_activity(&app, "owner", "Marcha", 4.6, -74.1).await;
    let uri = format!("/api/activities/{}", created["id"].as_str().unwrap());

    let delete = |auth: String| {
        Request::builder()
            .method(Method::DELETE)
            .uri(&uri)
            .header(header::AUTHORIZATION, auth)
            .body(Body::empty())
            .unwrap()
    };

    let response = send(&app, delete(app.bearer("intruder"))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.db.activity_count(), 1);

    let response = send(&app, delete(app.bearer("owner"))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.db.activity_count(), 0);
}

#[tokio::test]
async fn test_update_by_creator() {
    let app = create_test_app();
    let created = create_activity(&app, "owner", "Colecta", 4.6, -74.1).await;
    let uri = format!("/api/activities/{}", created["id"].as_str().unwrap());

    let response = send(
        &app,
        json_request(
            Method::PUT,
            &uri,
            Some(&app.bearer("intruder")),
            json!({ "status": "active" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        json_request(
            Method::PUT,
            &uri,
            Some(&app.bearer("owner")),
            json!({ "status": "active", "participants": 8 }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "active");
    assert_eq!(body["participants"], 8);
    assert_eq!(body["createdAt"], created["createdAt"]);
}

#[tokio::test]
async fn test_map_is_geojson() {
    let app = create_test_app();
    create_activity(&app, "u1", "Punto", 6.25, -75.56).await;

    let response = send(&app, get("/api/activities/map", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["type"], "FeatureCollection");
    let feature = &body["features"][0];
    assert_eq!(feature["geometry"]["type"], "Point");
    assert_eq!(feature["geometry"]["coordinates"], json!([-75.56, 6.25]));
    assert_eq!(feature["properties"]["title"], "Punto");
}

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();
    create_activity(&app, "u1", "a", 1.0, 1.0).await;
    create_activity(&app, "u2", "b", 1.0, 1.0).await;

    let response = send(&app, get("/api/activities/stats", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["byCategory"]["eventos"], 2);
}

#[tokio::test]
async fn test_admin_routes_need_admin() {
    let app = create_test_app();

    let response = send(&app, get("/api/admin/verifications", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        get("/api/admin/verifications", Some(&app.bearer("regular-user"))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        get("/api/admin/verifications", Some(&app.bearer("admin-uid"))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_verification_submission_and_admin_approval() {
    let app = create_test_app();
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/profile/business-confirmation",
            Some(&app.bearer("u1")),
            json!({ "confirmed": true }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json!({
        "profile": {
            "fullName": "Tienda La Esquina",
            "description": "Tienda de barrio",
            "location": "Medellín",
            "phone": "+57 300 000 0000",
            "email": "tienda@example.com",
            "socialMedia": {},
        },
        "cameraDocument": {
            "fileName": "camara.pdf",
            "contentType": "application/pdf",
            "data": STANDARD.encode(b"%PDF-1.4 test document"),
        },
        "commerceDocument": {
            "fileName": "rut.png",
            "contentType": "image/png",
            "data": STANDARD.encode(b"\x89PNG test image"),
        },
    });

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/profile/verification",
            Some(&app.bearer("u1")),
            body,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let profile = body_json(response).await;
    assert_eq!(profile["verificationStatus"], "pending");
    assert_eq!(profile["isBusiness"], true);
    assert!(profile["documents"]["cameraDocumentUrl"].is_string());
    assert!(profile["documents"]["commerceDocumentUrl"].is_string());
    assert_eq!(app.blobs.len(), 2);

    let response = send(
        &app,
        get("/api/admin/verifications", Some(&app.bearer("admin-uid"))),
    )
    .await;
    let pending = body_json(response).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["userId"], "u1");

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/admin/verifications/u1",
            Some(&app.bearer("admin-uid")),
            json!({ "decision": "approved" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["isVerified"], true);

    let stored = app.state.profiles.get_profile("u1").await.unwrap();
    assert_eq!(stored.verification_status, VerificationStatus::Approved);

    // A second decision on the same profile conflicts.
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/admin/verifications/u1",
            Some(&app.bearer("admin-uid")),
            json!({ "decision": "rejected" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_business_mode_only_through_confirmation() {
    let app = create_test_app();
    let auth = app.bearer("shop");

    let response = send(
        &app,
        json_request(
            Method::PUT,
            "/api/profile",
            Some(&auth),
            json!({ "fullName": "Tienda", "email": "t@example.com", "isBusiness": true }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "invariant_violation");

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/profile/business-confirmation",
            Some(&auth),
            json!({ "confirmed": false }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/profile/business-confirmation",
            Some(&auth),
            json!({ "confirmed": true }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile = body_json(response).await;
    assert_eq!(profile["isBusiness"], true);
    assert_eq!(profile["isBusinessConfirmed"], true);

    let response = send(
        &app,
        json_request(
            Method::PUT,
            "/api/profile",
            Some(&auth),
            json!({ "isBusiness": false }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let stored = app.state.profiles.get_profile("shop").await.unwrap();
    assert!(stored.is_business && stored.is_business_confirmed);
}
