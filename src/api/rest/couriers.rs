use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::api::rest::identity::ActorId;
use crate::error::AppError;
use crate::models::courier::{Courier, GeoPoint};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(register_courier))
        .route("/couriers/me", get(get_courier))
        .route("/couriers/me/location", patch(update_courier_location))
        .route("/couriers/me/active", patch(set_courier_active))
}

#[derive(Deserialize)]
pub struct RegisterCourierRequest {
    pub location: GeoPoint,
    pub radius_km: f64,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
    #[serde(default)]
    pub radius_km: Option<f64>,
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

async fn register_courier(
    State(state): State<Arc<AppState>>,
    ActorId(courier_id): ActorId,
    Json(payload): Json<RegisterCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    let courier = state
        .directory
        .register_courier(&courier_id, payload.location, payload.radius_km)
        .await?;
    Ok(Json(courier))
}

async fn get_courier(
    State(state): State<Arc<AppState>>,
    ActorId(courier_id): ActorId,
) -> Result<Json<Courier>, AppError> {
    Ok(Json(state.directory.get_courier(&courier_id).await?))
}

async fn update_courier_location(
    State(state): State<Arc<AppState>>,
    ActorId(courier_id): ActorId,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Courier>, AppError> {
    let courier = state
        .directory
        .update_courier_location(&courier_id, payload.location, payload.radius_km)
        .await?;
    Ok(Json(courier))
}

async fn set_courier_active(
    State(state): State<Arc<AppState>>,
    ActorId(courier_id): ActorId,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<Courier>, AppError> {
    let courier = state
        .directory
        .set_courier_active(&courier_id, payload.active)
        .await?;
    Ok(Json(courier))
}
