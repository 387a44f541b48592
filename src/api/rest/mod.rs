pub mod couriers;
pub mod identity;
pub mod orders;
pub mod restaurants;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(couriers::router())
        .merge(orders::router())
        .merge(restaurants::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/notifications/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    couriers: usize,
    active_couriers: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.directory.list_couriers().await {
        Ok(couriers) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                couriers: couriers.len(),
                active_couriers: couriers.iter().filter(|c| c.is_active).count(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.directory.list_couriers().await {
        Ok(couriers) => {
            let active = couriers.iter().filter(|c| c.is_active).count();
            state.metrics.active_couriers.set(active as i64);
        }
        Err(err) => warn!(error = %err, "failed to count active couriers"),
    }

    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
