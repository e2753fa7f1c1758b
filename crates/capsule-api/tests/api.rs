//! End-to-end tests of the HTTP surface against an in-memory database.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use capsule_api::{AppState, AppStateInner, router};
use capsule_db::{CapsuleRow, Database};
use capsule_types::api::{AuthResponse, OpenCapsuleResponse, PublicPage};
use capsule_types::models::Capsule;

const SECRET: &str = "test-secret";

fn state() -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: SECRET.into(),
    })
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

async fn register(app: &Router, email: &str) -> AuthResponse {
    let (status, body) = call(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    serde_json::from_value(body).unwrap()
}

/// Insert straight into storage so tests can use unlock times in the past.
fn seed(state: &AppState, owner: Uuid, open_at: DateTime<Utc>, opened_at: Option<DateTime<Utc>>) -> Uuid {
    let capsule = Capsule {
        id: Uuid::new_v4(),
        owner_id: owner,
        title: Some("hello".into()),
        content: "c2VhbGVk".into(),
        created_at: Utc::now() - Duration::days(10),
        open_at,
        opened_at,
    };
    state.db.insert_capsule(&CapsuleRow::from(&capsule)).unwrap();
    capsule.id
}

#[tokio::test]
async fn register_and_login() {
    let app = router(state());
    let reg = register(&app, "Alice@Example.com").await;
    assert_eq!(reg.email, "alice@example.com");

    let (status, _) = call(&app, "POST", "/auth/register", None, Some(json!({ "email": "alice@example.com", "password": "hunter22" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(&app, "POST", "/auth/login", None, Some(json!({ "email": "alice@example.com", "password": "hunter22" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], json!(reg.user_id));

    let (status, _) = call(&app, "POST", "/auth/login", None, Some(json!({ "email": "alice@example.com", "password": "wrong-pass" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_registrations_for_one_email_conflict() {
    let app = router(state());
    let body = json!({ "email": "race@example.com", "password": "hunter22" });

    let (a, b) = tokio::join!(
        call(&app, "POST", "/auth/register", None, Some(body.clone())),
        call(&app, "POST", "/auth/register", None, Some(body.clone())),
    );
    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);
}

#[tokio::test]
async fn malformed_bodies_and_ids_are_validation_errors() {
    let app = router(state());
    let me = register(&app, "me@example.com").await;

    let (status, body) = call(&app, "POST", "/capsules", Some(&me.token), Some(json!({ "content": "Y2lwaGVy" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("open_at"), "{body}");

    let (status, body) = call(&app, "POST", "/auth/login", None, Some(json!({ "email": "me@example.com" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = call(&app, "POST", "/capsules/not-a-uuid/open", Some(&me.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not-a-uuid"));

    let (status, _) = call(&app, "DELETE", "/capsules/not-a-uuid", Some(&me.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_validates_input() {
    let app = router(state());
    let (status, body) = call(&app, "POST", "/auth/register", None, Some(json!({ "email": "nope", "password": "hunter22" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("email"));

    let (status, _) = call(&app, "POST", "/auth/register", None, Some(json!({ "email": "a@b.c", "password": "123" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_requires_auth_and_future_open_at() {
    let app = router(state());
    let body = json!({ "title": "t", "content": "Y2lwaGVy", "open_at": Utc::now() + Duration::days(1) });

    let (status, _) = call(&app, "POST", "/capsules", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let me = register(&app, "me@example.com").await;
    let (status, created) = call(&app, "POST", "/capsules", Some(&me.token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["is_opened"], json!(false));
    assert_eq!(created["opened_at"], Value::Null);

    let past = json!({ "content": "Y2lwaGVy", "open_at": Utc::now() - Duration::days(1) });
    let (status, _) = call(&app, "POST", "/capsules", Some(&me.token), Some(past)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, mine) = call(&app, "GET", "/capsules/mine", Some(&me.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert!(mine[0].get("content").is_none());
}

#[tokio::test]
async fn public_feed_masks_authors_and_hides_own_capsules() {
    let st = state();
    let app = router(st.clone());
    let me = register(&app, "me@example.com").await;
    let other = register(&app, "abcdef@example.com").await;

    seed(&st, me.user_id, Utc::now() + Duration::days(1), None);
    for _ in 0..7 {
        seed(&st, other.user_id, Utc::now() + Duration::days(1), None);
    }

    let (status, body) = call(&app, "GET", "/capsules/public", Some(&me.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let page: PublicPage = serde_json::from_value(body).unwrap();
    assert_eq!(page.total, 7);
    assert_eq!(page.page_size, 6);
    assert_eq!(page.capsules.len(), 6);
    assert!(page.capsules.iter().all(|c| c.owner_id == other.user_id));
    assert!(page.capsules.iter().all(|c| c.author == "ab****@example.com"));

    let (_, body) = call(&app, "GET", "/capsules/public?page=2", Some(&me.token), None).await;
    assert_eq!(body["capsules"].as_array().unwrap().len(), 1);

    let (_, body) = call(&app, "GET", "/capsules/public", None, None).await;
    assert_eq!(body["total"], json!(8));

    let (status, _) = call(&app, "GET", "/capsules/public", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn open_flow() {
    let st = state();
    let app = router(st.clone());
    let me = register(&app, "me@example.com").await;
    let stranger = register(&app, "stranger@example.com").await;

    let sealed = seed(&st, me.user_id, Utc::now() + Duration::days(1), None);
    let (status, _) = call(&app, "POST", &format!("/capsules/{sealed}/open"), Some(&me.token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let ready = seed(&st, me.user_id, Utc::now() - Duration::hours(1), None);
    let (status, _) = call(&app, "POST", &format!("/capsules/{ready}/open"), Some(&stranger.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, "POST", &format!("/capsules/{ready}/open"), Some(&me.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let first: OpenCapsuleResponse = serde_json::from_value(body).unwrap();
    assert!(!first.already_opened);
    assert!(first.capsule.is_opened);
    assert_eq!(first.content, "c2VhbGVk");

    // Second open is a no-op that returns the original stamp.
    let (status, body) = call(&app, "POST", &format!("/capsules/{ready}/open"), Some(&me.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let second: OpenCapsuleResponse = serde_json::from_value(body).unwrap();
    assert!(second.already_opened);
    assert_eq!(second.capsule.opened_at, first.capsule.opened_at);

    let (status, _) = call(&app, "POST", &format!("/capsules/{}/open", Uuid::new_v4()), Some(&me.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_flow() {
    let st = state();
    let app = router(st.clone());
    let me = register(&app, "me@example.com").await;
    let stranger = register(&app, "stranger@example.com").await;

    let sealed = seed(&st, me.user_id, Utc::now() + Duration::days(1), None);
    let (status, _) = call(&app, "DELETE", &format!("/capsules/{sealed}"), Some(&stranger.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "DELETE", &format!("/capsules/{sealed}"), Some(&me.token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, "DELETE", &format!("/capsules/{sealed}"), Some(&me.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let opened = seed(&st, me.user_id, Utc::now() - Duration::days(2), Some(Utc::now() - Duration::days(1)));
    let (status, _) = call(&app, "DELETE", &format!("/capsules/{opened}"), Some(&me.token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(st.db.get_capsule(&opened.to_string()).unwrap().is_some());
}

#[tokio::test]
async fn health_is_public() {
    let app = router(state());
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
