use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::api::rest::identity::ActorId;
use crate::error::AppError;
use crate::models::order::{Order, OrderId};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/restaurant", get(restaurant_orders))
        .route("/orders/courier", get(courier_orders))
        .route("/orders/:id/accept", patch(accept_order))
        .route("/orders/:id/reject", patch(reject_order))
        .route("/orders/:id/fulfill", patch(fulfill_order))
        .route("/orders/:id/cancel", patch(cancel_order))
        .route("/orders/:id/reassign", post(reassign_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub description: Option<String>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    ActorId(restaurant_id): ActorId,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let description = payload
        .description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    let order = state
        .dispatcher
        .create_order(&restaurant_id, description)
        .await?;
    Ok(Json(order))
}

async fn restaurant_orders(
    State(state): State<Arc<AppState>>,
    ActorId(restaurant_id): ActorId,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.reconciler.restaurant_orders(&restaurant_id).await?))
}

async fn courier_orders(
    State(state): State<Arc<AppState>>,
    ActorId(courier_id): ActorId,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.reconciler.courier_orders(&courier_id).await?))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    ActorId(courier_id): ActorId,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.lifecycle.accept_order(id, &courier_id).await?))
}

async fn reject_order(
    State(state): State<Arc<AppState>>,
    ActorId(courier_id): ActorId,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.lifecycle.reject_order(id, &courier_id).await?))
}

async fn fulfill_order(
    State(state): State<Arc<AppState>>,
    ActorId(restaurant_id): ActorId,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.lifecycle.fulfill_order(id, &restaurant_id).await?))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    ActorId(restaurant_id): ActorId,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.lifecycle.cancel_order(id, &restaurant_id).await?))
}

async fn reassign_order(
    State(state): State<Arc<AppState>>,
    ActorId(restaurant_id): ActorId,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.dispatcher.reassign_order(id, &restaurant_id).await?))
}
