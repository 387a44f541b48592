use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, TimeZone, Utc};
use courier_dispatch::api::rest::router;
use courier_dispatch::clock::ManualClock;
use courier_dispatch::config::Config;
use courier_dispatch::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

const ACTOR: &str = "x-actor-id";

fn setup() -> (axum::Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    ));
    let config = Config {
        code_seed: Some(11),
        notify_attempts: 1,
        ..Config::default()
    };
    let state = AppState::in_memory(&config, clock.clone());
    (router(Arc::new(state)), clock)
}

fn json_request(method: &str, uri: &str, actor: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header(ACTOR, actor)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, actor: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(ACTOR, actor)
        .body(Body::empty())
        .unwrap()
}

fn patch_request(uri: &str, actor: &str) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .header(ACTOR, actor)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn register_restaurant(app: &axum::Router, id: &str) {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/restaurants",
            id,
            json!({ "location": { "lat": 52.52, "lng": 13.405 } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

async fn register_courier(app: &axum::Router, clock: &ManualClock, id: &str) {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/couriers",
            id,
            json!({ "location": { "lat": 52.53, "lng": 13.41 }, "radius_km": 5.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    clock.advance(Duration::seconds(1));
}

async fn create_order(app: &axum::Router, restaurant: &str) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            restaurant,
            json!({ "description": "1x kofta" }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _clock) = setup();
    let response = app.oneshot(get_request("/health", "ops")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["couriers"], 0);
    assert_eq!(body["active_couriers"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _clock) = setup();
    let response = app.oneshot(get_request("/metrics", "ops")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("active_couriers"));
    assert!(body.contains("orders_expired_total"));
}

#[tokio::test]
async fn missing_actor_header_returns_400() {
    let (app, _clock) = setup();
    let request = Request::builder()
        .method("GET")
        .uri("/orders/restaurant")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_courier_returns_active_courier() {
    let (app, _clock) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/couriers",
            "alice",
            json!({ "location": { "lat": 52.52, "lng": 13.405 }, "radius_km": 3.5 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["id"], "alice");
    assert_eq!(body["radius_km"], 3.5);
    assert_eq!(body["is_active"], true);
}

#[tokio::test]
async fn register_courier_negative_radius_returns_400() {
    let (app, _clock) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/couriers",
            "bob",
            json!({ "location": { "lat": 52.52, "lng": 13.405 }, "radius_km": -2.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_courier_profile_returns_404() {
    let (app, _clock) = setup();
    let response = app
        .oneshot(get_request("/couriers/me", "nobody"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_courier_location_and_availability() {
    let (app, clock) = setup();
    register_courier(&app, &clock, "eve").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/couriers/me/location",
            "eve",
            json!({ "location": { "lat": 48.85, "lng": 2.35 }, "radius_km": 8.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["location"]["lat"], 48.85);
    assert_eq!(body["radius_km"], 8.0);

    let res = app
        .oneshot(json_request(
            "PATCH",
            "/couriers/me/active",
            "eve",
            json!({ "active": false }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["is_active"], false);
}

#[tokio::test]
async fn create_order_without_couriers_returns_503() {
    let (app, _clock) = setup();
    register_restaurant(&app, "r1").await;

    let response = create_order(&app, "r1").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = app
        .oneshot(get_request("/orders/restaurant", "r1"))
        .await
        .unwrap();
    let orders = body_json(res).await;
    assert_eq!(orders.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn full_order_flow() {
    let (app, clock) = setup();
    register_restaurant(&app, "r1").await;
    register_courier(&app, &clock, "dan").await;

    let res = create_order(&app, "r1").await;
    assert_eq!(res.status(), StatusCode::OK);
    let order = body_json(res).await;
    let order_id = order["id"].as_i64().unwrap();
    assert_eq!(order["state"], "PENDING");
    assert_eq!(order["courier_id"], "dan");
    assert_eq!(order["description"], "1x kofta");
    assert_eq!(order["code"].as_str().unwrap().len(), 6);

    let res = app
        .clone()
        .oneshot(get_request("/orders/courier", "dan"))
        .await
        .unwrap();
    let inbox = body_json(res).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);

    let res = app
        .clone()
        .oneshot(patch_request(&format!("/orders/{order_id}/fulfill"), "r1"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(patch_request(&format!("/orders/{order_id}/accept"), "dan"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["state"], "ACCEPTED");

    let res = app
        .clone()
        .oneshot(patch_request(&format!("/orders/{order_id}/fulfill"), "r1"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["state"], "FULFILLED");

    let res = app
        .oneshot(get_request("/orders/courier", "dan"))
        .await
        .unwrap();
    let inbox = body_json(res).await;
    assert_eq!(inbox.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn accept_by_another_courier_returns_404() {
    let (app, clock) = setup();
    register_restaurant(&app, "r1").await;
    register_courier(&app, &clock, "dan").await;
    register_courier(&app, &clock, "zoe").await;

    let order = body_json(create_order(&app, "r1").await).await;
    let order_id = order["id"].as_i64().unwrap();
    assert_eq!(order["courier_id"], "dan");

    let res = app
        .oneshot(patch_request(&format!("/orders/{order_id}/accept"), "zoe"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expired_order_is_reassigned_to_next_courier() {
    let (app, clock) = setup();
    register_restaurant(&app, "r1").await;
    register_courier(&app, &clock, "dan").await;
    register_courier(&app, &clock, "zoe").await;

    let order = body_json(create_order(&app, "r1").await).await;
    let order_id = order["id"].as_i64().unwrap();

    clock.advance(Duration::minutes(16));
    let res = app
        .clone()
        .oneshot(get_request("/orders/restaurant", "r1"))
        .await
        .unwrap();
    let orders = body_json(res).await;
    assert_eq!(orders[0]["state"], "EXPIRED");

    let res = app
        .clone()
        .oneshot(get_request("/couriers/me", "dan"))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["is_active"], false);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/reassign"),
            "r1",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let reassigned = body_json(res).await;
    assert_ne!(reassigned["id"], order["id"]);
    assert_eq!(reassigned["courier_id"], "zoe");
    assert_eq!(reassigned["description"], "1x kofta");

    let res = app
        .oneshot(get_request("/orders/restaurant", "r1"))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn cancel_pending_order_returns_409() {
    let (app, clock) = setup();
    register_restaurant(&app, "r1").await;
    register_courier(&app, &clock, "dan").await;

    let order = body_json(create_order(&app, "r1").await).await;
    let order_id = order["id"].as_i64().unwrap();

    let res = app
        .oneshot(patch_request(&format!("/orders/{order_id}/cancel"), "r1"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}
