use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::AppError;
use crate::geo::covers;
use crate::models::courier::{Courier, GeoPoint};
use crate::models::restaurant::Restaurant;

/// Where couriers and restaurants are, and who should get the next order.
///
/// A courier is eligible for a restaurant when it is active and the restaurant
/// lies within its radius. Among eligible couriers the one with the oldest
/// `last_order_received` wins.
#[async_trait]
pub trait GeoDirectory: Send + Sync {
    async fn register_courier(
        &self,
        courier_id: &str,
        location: GeoPoint,
        radius_km: f64,
    ) -> Result<Courier, AppError>;

    async fn update_courier_location(
        &self,
        courier_id: &str,
        location: GeoPoint,
        radius_km: Option<f64>,
    ) -> Result<Courier, AppError>;

    async fn set_courier_active(&self, courier_id: &str, active: bool)
    -> Result<Courier, AppError>;

    async fn get_courier(&self, courier_id: &str) -> Result<Courier, AppError>;

    async fn list_couriers(&self) -> Result<Vec<Courier>, AppError>;

    async fn register_restaurant(
        &self,
        restaurant_id: &str,
        location: GeoPoint,
    ) -> Result<Restaurant, AppError>;

    async fn restaurant_location(&self, restaurant_id: &str) -> Result<GeoPoint, AppError>;

    /// Read-only lookup of the next courier in line for `location`.
    async fn find_eligible_courier(&self, location: GeoPoint) -> Result<Option<String>, AppError>;

    /// Selects the next courier in line and advances its fairness key to `at`
    /// in one step, so two concurrent dispatches never pick the same courier
    /// from the same snapshot.
    async fn claim_eligible_courier(
        &self,
        location: GeoPoint,
        at: DateTime<Utc>,
    ) -> Result<Option<String>, AppError>;

    /// Moves `last_order_received` forward to `at`. Never moves it back.
    async fn advance_courier_service(
        &self,
        courier_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn deactivate_courier(&self, courier_id: &str) -> Result<(), AppError>;
}

const MAX_CLAIM_ATTEMPTS: usize = 32;

#[derive(Debug, Clone)]
struct CourierRow {
    courier: Courier,
    revision: u64,
}

pub struct InMemoryGeoDirectory {
    couriers: DashMap<String, CourierRow>,
    restaurants: DashMap<String, Restaurant>,
    clock: Arc<dyn Clock>,
}

impl InMemoryGeoDirectory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            couriers: DashMap::new(),
            restaurants: DashMap::new(),
            clock,
        }
    }

    /// Next courier in line together with the row revision it was read at.
    fn next_in_line(&self, location: &GeoPoint) -> Option<(String, u64)> {
        self.couriers
            .iter()
            .filter(|entry| entry.courier.is_active && covers(&entry.courier, location))
            .min_by(|a, b| {
                a.courier
                    .last_order_received
                    .cmp(&b.courier.last_order_received)
                    .then_with(|| a.courier.id.cmp(&b.courier.id))
            })
            .map(|entry| (entry.key().clone(), entry.revision))
    }

    fn update_courier<F>(&self, courier_id: &str, apply: F) -> Result<Courier, AppError>
    where
        F: FnOnce(&mut Courier),
    {
        let mut row = self
            .couriers
            .get_mut(courier_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

        apply(&mut row.courier);
        row.courier.updated_at = self.clock.now();
        row.revision += 1;

        Ok(row.courier.clone())
    }
}

fn validate_radius(radius_km: f64) -> Result<(), AppError> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(AppError::BadRequest(format!(
            "radius must be a non-negative number of km, got {radius_km}"
        )));
    }
    Ok(())
}

#[async_trait]
impl GeoDirectory for InMemoryGeoDirectory {
    async fn register_courier(
        &self,
        courier_id: &str,
        location: GeoPoint,
        radius_km: f64,
    ) -> Result<Courier, AppError> {
        validate_radius(radius_km)?;
        let now = self.clock.now();

        let mut row = self
            .couriers
            .entry(courier_id.to_string())
            .or_insert_with(|| CourierRow {
                courier: Courier {
                    id: courier_id.to_string(),
                    location,
                    radius_km,
                    is_active: true,
                    last_order_received: now,
                    created_at: now,
                    updated_at: now,
                },
                revision: 0,
            });

        // Re-registering refreshes the profile but keeps the place in line.
        row.courier.location = location;
        row.courier.radius_km = radius_km;
        row.courier.updated_at = now;
        row.revision += 1;

        info!(courier_id, radius_km, "courier registered");
        Ok(row.courier.clone())
    }

    async fn update_courier_location(
        &self,
        courier_id: &str,
        location: GeoPoint,
        radius_km: Option<f64>,
    ) -> Result<Courier, AppError> {
        if let Some(radius_km) = radius_km {
            validate_radius(radius_km)?;
        }

        self.update_courier(courier_id, |courier| {
            courier.location = location;
            if let Some(radius_km) = radius_km {
                courier.radius_km = radius_km;
            }
        })
    }

    async fn set_courier_active(
        &self,
        courier_id: &str,
        active: bool,
    ) -> Result<Courier, AppError> {
        let courier = self.update_courier(courier_id, |courier| courier.is_active = active)?;
        info!(courier_id, active, "courier availability changed");
        Ok(courier)
    }

    async fn get_courier(&self, courier_id: &str) -> Result<Courier, AppError> {
        self.couriers
            .get(courier_id)
            .map(|row| row.courier.clone())
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))
    }

    async fn list_couriers(&self) -> Result<Vec<Courier>, AppError> {
        let mut couriers: Vec<Courier> = self
            .couriers
            .iter()
            .map(|entry| entry.courier.clone())
            .collect();
        couriers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(couriers)
    }

    async fn register_restaurant(
        &self,
        restaurant_id: &str,
        location: GeoPoint,
    ) -> Result<Restaurant, AppError> {
        let now = self.clock.now();

        let mut restaurant = self
            .restaurants
            .entry(restaurant_id.to_string())
            .or_insert_with(|| Restaurant {
                id: restaurant_id.to_string(),
                location,
                created_at: now,
                updated_at: now,
            });
        restaurant.location = location;
        restaurant.updated_at = now;

        info!(restaurant_id, "restaurant registered");
        Ok(restaurant.clone())
    }

    async fn restaurant_location(&self, restaurant_id: &str) -> Result<GeoPoint, AppError> {
        self.restaurants
            .get(restaurant_id)
            .map(|restaurant| restaurant.location)
            .ok_or_else(|| AppError::NotFound(format!("restaurant {restaurant_id} not found")))
    }

    async fn find_eligible_courier(&self, location: GeoPoint) -> Result<Option<String>, AppError> {
        Ok(self.next_in_line(&location).map(|(courier_id, _)| courier_id))
    }

    async fn claim_eligible_courier(
        &self,
        location: GeoPoint,
        at: DateTime<Utc>,
    ) -> Result<Option<String>, AppError> {
        for attempt in 0..MAX_CLAIM_ATTEMPTS {
            let Some((courier_id, seen_revision)) = self.next_in_line(&location) else {
                return Ok(None);
            };

            let Some(mut row) = self.couriers.get_mut(&courier_id) else {
                continue;
            };

            if row.revision != seen_revision {
                debug!(courier_id = %courier_id, attempt, "courier changed since selection; retrying");
                continue;
            }

            if row.courier.last_order_received < at {
                row.courier.last_order_received = at;
            }
            row.courier.updated_at = self.clock.now();
            row.revision += 1;

            return Ok(Some(courier_id));
        }

        Err(AppError::Internal(format!(
            "courier selection did not settle after {MAX_CLAIM_ATTEMPTS} attempts"
        )))
    }

    async fn advance_courier_service(
        &self,
        courier_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.update_courier(courier_id, |courier| {
            if courier.last_order_received < at {
                courier.last_order_received = at;
            }
        })?;
        Ok(())
    }

    async fn deactivate_courier(&self, courier_id: &str) -> Result<(), AppError> {
        self.update_courier(courier_id, |courier| courier.is_active = false)?;
        Ok(())
    }
}
