use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use coachline_api::auth::{issue_token, ROLE_ADMIN};
use coachline_api::state::{AppState, AuthConfig, Backends};
use coachline_api::app;
use coachline_core::memory::InMemoryStore;
use coachline_core::payout::MockPayoutAdapter;
use coachline_core::settings::StaticSettings;
use coachline_core::{FixedClock, SignalBus, TrainerProfile};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    store: InMemoryStore,
    payouts: Arc<MockPayoutAdapter>,
    signals: SignalBus,
    trainer_id: Uuid,
}

async fn setup() -> TestApp {
    let store = InMemoryStore::new();
    let trainer_id = Uuid::new_v4();
    store
        .add_trainer(TrainerProfile {
            id: trainer_id,
            hourly_rate_cents: Some(6000),
            is_active: true,
        })
        .await;

    let payouts = Arc::new(MockPayoutAdapter::new());
    let backends = Backends {
        bookings: Arc::new(store.clone()),
        series: Arc::new(store.clone()),
        trainers: Arc::new(store.clone()),
        reviews: Arc::new(store.clone()),
        settings: Arc::new(StaticSettings::new(25.0, 5000)),
        payouts: payouts.clone(),
        clock: Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2026, 5, 20).unwrap())),
    };

    let signals = SignalBus::new();
    let state = AppState::build(
        backends,
        signals.clone(),
        AuthConfig {
            secret: SECRET.to_string(),
        },
        4,
    );

    TestApp {
        router: app(state),
        store,
        payouts,
        signals,
        trainer_id,
    }
}

fn token(user_id: Uuid, role: &str) -> String {
    issue_token(SECRET, user_id, role, 3600).unwrap()
}

fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn booking_body(trainer_id: Uuid) -> Value {
    json!({
        "trainer_id": trainer_id,
        "player_id": Uuid::new_v4(),
        "session_date": "2026-06-01",
        "start_time": "17:00:00",
        "duration_minutes": 60,
        "location": "Riverside Park"
    })
}

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_booking_requires_token() {
    let app = setup().await;
    let (status, body) = send(&app.router, post("/v1/bookings", None, booking_body(app.trainer_id))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");
}

#[tokio::test]
async fn test_create_booking_and_fetch() {
    let app = setup().await;
    let parent_id = Uuid::new_v4();
    let parent = token(parent_id, "parent");

    let (status, receipt) = send(
        &app.router,
        post("/v1/bookings", Some(&parent), booking_body(app.trainer_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(receipt["booking_number"].as_str().unwrap().starts_with("CL"));

    let id = receipt["booking_id"].as_str().unwrap();
    let (status, booking) = send(&app.router, get(&format!("/v1/bookings/{}", id), &parent)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["parent_id"], json!(parent_id));
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["total_amount_cents"], 6000);
    assert_eq!(booking["platform_fee_cents"], 1500);
    assert_eq!(booking["trainer_payout_cents"], 4500);

    let stranger = token(Uuid::new_v4(), "parent");
    let (status, _) = send(&app.router, get(&format!("/v1/bookings/{}", id), &stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_parent_cannot_book_for_someone_else() {
    let app = setup().await;
    let parent = token(Uuid::new_v4(), "parent");
    let mut body = booking_body(app.trainer_id);
    body["parent_id"] = json!(Uuid::new_v4());

    let (status, body) = send(&app.router, post("/v1/bookings", Some(&parent), body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn test_taken_slot_returns_conflict_code() {
    let app = setup().await;
    let first = token(Uuid::new_v4(), "parent");
    let second = token(Uuid::new_v4(), "parent");

    let (status, _) = send(
        &app.router,
        post("/v1/bookings", Some(&first), booking_body(app.trainer_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app.router,
        post("/v1/bookings", Some(&second), booking_body(app.trainer_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "slot_taken");
}

#[tokio::test]
async fn test_concurrent_requests_book_slot_once() {
    let app = setup().await;
    let requests = (0..6).map(|_| {
        let router = app.router.clone();
        let parent = token(Uuid::new_v4(), "parent");
        let body = booking_body(app.trainer_id);
        async move { send(&router, post("/v1/bookings", Some(&parent), body)).await }
    });

    let results = futures_util::future::join_all(requests).await;
    let created = results.iter().filter(|(s, _)| *s == StatusCode::CREATED).count();
    let conflicts = results.iter().filter(|(s, _)| *s == StatusCode::CONFLICT).count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, 5);
    assert_eq!(app.store.all_bookings().await.len(), 1);
}

#[tokio::test]
async fn test_missing_field_is_validation_error() {
    let app = setup().await;
    let parent = token(Uuid::new_v4(), "parent");
    let mut body = booking_body(app.trainer_id);
    body.as_object_mut().unwrap().remove("session_date");

    let (status, body) = send(&app.router, post("/v1/bookings", Some(&parent), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_dual_confirmation_completes_and_pays_out() {
    let app = setup().await;
    let parent_id = Uuid::new_v4();
    let parent = token(parent_id, "parent");
    let trainer = token(app.trainer_id, "trainer");

    let (_, receipt) = send(
        &app.router,
        post("/v1/bookings", Some(&parent), booking_body(app.trainer_id)),
    )
    .await;
    let id = receipt["booking_id"].as_str().unwrap().to_string();

    let (status, booking) = send(
        &app.router,
        post(&format!("/v1/bookings/{}/confirm/parent", id), Some(&parent), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["parent_confirmed"], true);
    assert_ne!(booking["status"], "completed");

    // The parent cannot stand in for the trainer
    let (status, _) = send(
        &app.router,
        post(&format!("/v1/bookings/{}/confirm/trainer", id), Some(&parent), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app.router,
        post(&format!("/v1/bookings/{}/confirm/trainer", id), Some(&trainer), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, booking) = send(&app.router, get(&format!("/v1/bookings/{}", id), &parent)).await;
    assert_eq!(booking["status"], "completed");
    app.signals.settled().await;
    assert_eq!(app.payouts.released(), vec![Uuid::parse_str(&id).unwrap()]);
}

#[tokio::test]
async fn test_status_update_rejects_unknown_status() {
    let app = setup().await;
    let parent = token(Uuid::new_v4(), "parent");
    let (_, receipt) = send(
        &app.router,
        post("/v1/bookings", Some(&parent), booking_body(app.trainer_id)),
    )
    .await;
    let id = receipt["booking_id"].as_str().unwrap();

    let (status, _) = send(
        &app.router,
        post(&format!("/v1/bookings/{}/status", id), Some(&parent), json!({ "status": "teleported" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Completion only comes from both parties confirming.
    let (status, body) = send(
        &app.router,
        post(&format!("/v1/bookings/{}/status", id), Some(&parent), json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert!(app.payouts.released().is_empty());

    let (status, booking) = send(
        &app.router,
        post(&format!("/v1/bookings/{}/status", id), Some(&parent), json!({ "status": " Cancelled " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["status"], "cancelled");
}

#[tokio::test]
async fn test_series_preview_and_create() {
    let app = setup().await;
    let parent_id = Uuid::new_v4();
    let parent = token(parent_id, "parent");

    let (status, preview) = send(
        &app.router,
        post(
            "/v1/series/preview",
            Some(&parent),
            json!({
                "trainer_id": app.trainer_id,
                "day_of_week": 1,
                "start_time": "17:00:00",
                "start_date": "2026-06-01",
                "count": 3
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["dates"], json!(["2026-06-01", "2026-06-08", "2026-06-15"]));
    assert_eq!(preview["conflicts"], json!([]));

    let (status, created) = send(
        &app.router,
        post(
            "/v1/series",
            Some(&parent),
            json!({
                "parent_id": parent_id,
                "trainer_id": app.trainer_id,
                "day_of_week": 1,
                "start_time": "17:00:00",
                "start_date": "2026-06-01",
                "total_sessions": 8
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["generation"]["created"], 4);
    assert_eq!(app.store.all_bookings().await.len(), 4);

    let series_id = created["series"]["id"].as_str().unwrap();
    let outsider = token(Uuid::new_v4(), "parent");
    let (status, _) = send(
        &app.router,
        post(&format!("/v1/series/{}/cancel", series_id), Some(&outsider), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, report) = send(
        &app.router,
        post(&format!("/v1/series/{}/cancel", series_id), Some(&parent), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["cancelled_bookings"], 4);
}

#[tokio::test]
async fn test_review_rescoring_and_admin_recompute() {
    let app = setup().await;
    let parent = token(Uuid::new_v4(), "parent");

    let (status, _) = send(
        &app.router,
        post(
            &format!("/v1/trainers/{}/reviews", app.trainer_id),
            Some(&parent),
            json!({ "rating": 6 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, score) = send(
        &app.router,
        post(
            &format!("/v1/trainers/{}/reviews", app.trainer_id),
            Some(&parent),
            json!({ "rating": 5, "comment": "Great drills" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(score["rating"], 100.0);

    let (status, fetched) = send(
        &app.router,
        get(&format!("/v1/trainers/{}/score", app.trainer_id), &parent),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["composite"], score["composite"]);

    let uri = format!("/v1/trainers/{}/score/recompute", app.trainer_id);
    let (status, _) = send(&app.router, post(&uri, Some(&parent), json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = token(Uuid::new_v4(), ROLE_ADMIN);
    let (status, _) = send(&app.router, post(&uri, Some(&admin), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
}
