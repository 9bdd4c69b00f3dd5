//! Router-level API tests over the in-memory backend

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDateTime, Utc};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use shareloop_server::{
    api,
    config::AppConfig,
    models::{booking::ConflictPolicy, item::Item, user::User},
    repository::{memory::MemoryBackend, Repository},
    services::Services,
    AppState,
};

const OWNER: i64 = 1;
const BOOKER: i64 = 2;
const STRANGER: i64 = 3;
const DRILL: i64 = 10;

fn test_app(policy: ConflictPolicy) -> Router {
    let backend = MemoryBackend::new();
    backend.add_user(User {
        id: OWNER,
        name: "Olga".to_string(),
        email: "olga@example.com".to_string(),
    });
    backend.add_user(User {
        id: BOOKER,
        name: "Maya".to_string(),
        email: "maya@example.com".to_string(),
    });
    backend.add_user(User {
        id: STRANGER,
        name: "Piotr".to_string(),
        email: "piotr@example.com".to_string(),
    });
    backend.add_item(Item {
        id: DRILL,
        name: "Cordless drill".to_string(),
        description: "18V".to_string(),
        available: true,
        owner_id: OWNER,
        request_id: None,
    });

    let mut config = AppConfig::default();
    config.booking.conflict_policy = policy;

    let repository = Repository::memory(&backend);
    let services = Services::new(repository, &config.booking);

    api::create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
        request = request.header("X-Sharer-User-Id", id.to_string());
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn fmt(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn hours_from_now(hours: i64) -> NaiveDateTime {
    (Utc::now() + Duration::hours(hours)).naive_utc()
}

fn booking_body(start: NaiveDateTime, end: NaiveDateTime) -> Value {
    json!({ "itemId": DRILL, "start": fmt(start), "end": fmt(end) })
}

async fn create_booking(app: &Router, booker: i64, start_h: i64, end_h: i64) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/bookings",
        Some(booker),
        Some(booking_body(hours_from_now(start_h), hours_from_now(end_h))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn approve(app: &Router, owner: i64, booking_id: i64, approved: bool) -> (StatusCode, Value) {
    send(
        app,
        Method::PATCH,
        &format!("/bookings/{booking_id}?approved={approved}"),
        Some(owner),
        None,
    )
    .await
}

#[tokio::test]
async fn health_endpoints_respond() {
    let app = test_app(ConflictPolicy::Advisory);
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn create_booking_returns_wire_format() {
    let app = test_app(ConflictPolicy::Advisory);
    let start = hours_from_now(1);
    let end = hours_from_now(2);

    let (status, body) = send(
        &app,
        Method::POST,
        "/bookings",
        Some(BOOKER),
        Some(booking_body(start, end)),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "WAITING");
    assert_eq!(body["booker"]["id"], BOOKER);
    assert_eq!(body["booker"]["name"], "Maya");
    assert_eq!(body["item"]["id"], DRILL);
    assert_eq!(body["item"]["name"], "Cordless drill");
    // local date-time, no offset
    assert_eq!(body["start"], fmt(start));
    assert_eq!(body["end"], fmt(end));
    assert!(body["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn identity_header_is_required_and_checked() {
    let app = test_app(ConflictPolicy::Advisory);

    let (status, body) = send(&app, Method::GET, "/bookings", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");

    let (status, body) = send(&app, Method::GET, "/bookings", Some(99), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn invalid_time_range_is_a_validation_error() {
    let app = test_app(ConflictPolicy::Advisory);
    let start = hours_from_now(2);

    let (status, body) = send(
        &app,
        Method::POST,
        "/bookings",
        Some(BOOKER),
        Some(booking_body(start, start)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");
}

#[tokio::test]
async fn approval_flow_and_access_control() {
    let app = test_app(ConflictPolicy::Advisory);
    let booking = create_booking(&app, BOOKER, 1, 2).await;
    let booking_id = booking["id"].as_i64().unwrap();

    // owner approves
    let (status, body) = approve(&app, OWNER, booking_id, true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "APPROVED");

    // approving again is rejected
    let (status, body) = approve(&app, OWNER, booking_id, true).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    // a stranger can neither approve nor see the booking
    let (status, _) = approve(&app, STRANGER, booking_id, false).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/bookings/{booking_id}"),
        Some(STRANGER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "PermissionDenied");

    // booker and owner can
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/bookings/{booking_id}"),
        Some(BOOKER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn strict_policy_rejects_overlapping_creation() {
    let app = test_app(ConflictPolicy::Strict);
    let booking = create_booking(&app, BOOKER, 1, 3).await;
    let (status, _) = approve(&app, OWNER, booking["id"].as_i64().unwrap(), true).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/bookings",
        Some(STRANGER),
        Some(booking_body(hours_from_now(2), hours_from_now(4))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");
}

#[tokio::test]
async fn listing_filters_and_rejects_unknown_state() {
    let app = test_app(ConflictPolicy::Advisory);
    let first = create_booking(&app, BOOKER, 1, 2).await;
    let second = create_booking(&app, BOOKER, 5, 6).await;
    approve(&app, OWNER, first["id"].as_i64().unwrap(), true).await;

    // owner's waiting bookings only, newest start first
    let (status, body) = send(
        &app,
        Method::GET,
        "/bookings/owner?state=waiting",
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], second["id"]);
    assert_eq!(list[0]["status"], "WAITING");

    // ALL, descending by start
    let (status, body) = send(&app, Method::GET, "/bookings?state=ALL", Some(BOOKER), None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list[0]["id"], second["id"]);
    assert_eq!(list[1]["id"], first["id"]);

    let (status, body) = send(
        &app,
        Method::GET,
        "/bookings?state=SOMETHING",
        Some(BOOKER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unknown state: SOMETHING");
}

#[tokio::test]
async fn item_views_expose_history_to_owner_only() {
    let app = test_app(ConflictPolicy::Advisory);

    let past = create_booking(&app, BOOKER, -48, -24).await;
    approve(&app, OWNER, past["id"].as_i64().unwrap(), true).await;
    let next = create_booking(&app, BOOKER, 24, 48).await;
    approve(&app, OWNER, next["id"].as_i64().unwrap(), true).await;

    let (status, body) = send(&app, Method::GET, "/items", Some(OWNER), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["lastBooking"]["id"], past["id"]);
    assert_eq!(items[0]["lastBooking"]["bookerId"], BOOKER);
    assert_eq!(items[0]["nextBooking"]["id"], next["id"]);

    // non-owner item details carry no booking history
    let uri = format!("/items/{DRILL}");
    let (status, body) = send(&app, Method::GET, &uri, Some(BOOKER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("lastBooking").is_none());
    assert!(body.get("nextBooking").is_none());
}

#[tokio::test]
async fn comments_require_a_finished_booking() {
    let app = test_app(ConflictPolicy::Advisory);
    let uri = format!("/items/{DRILL}/comment");

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(BOOKER),
        Some(json!({ "text": "Solid drill" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");

    let past = create_booking(&app, BOOKER, -48, -24).await;
    approve(&app, OWNER, past["id"].as_i64().unwrap(), true).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(BOOKER),
        Some(json!({ "text": "Solid drill" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authorName"], "Maya");

    let (_, body) = send(&app, Method::GET, &format!("/items/{DRILL}"), Some(BOOKER), None).await;
    assert_eq!(body["comments"][0]["text"], "Solid drill");
}
