use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::api::rest::identity::ActorId;
use crate::error::AppError;
use crate::models::courier::GeoPoint;
use crate::models::restaurant::Restaurant;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/restaurants", post(register_restaurant))
}

#[derive(Deserialize)]
pub struct RegisterRestaurantRequest {
    pub location: GeoPoint,
}

async fn register_restaurant(
    State(state): State<Arc<AppState>>,
    ActorId(restaurant_id): ActorId,
    Json(payload): Json<RegisterRestaurantRequest>,
) -> Result<Json<Restaurant>, AppError> {
    let restaurant = state
        .directory
        .register_restaurant(&restaurant_id, payload.location)
        .await?;
    Ok(Json(restaurant))
}
