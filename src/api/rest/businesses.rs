use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::slots::{self, SlotAvailability};
use crate::error::AppError;
use crate::models::business::Business;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/businesses", post(create_business).get(list_businesses))
        .route("/businesses/:id/slot-availability", get(slot_availability))
}

#[derive(Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    pub address: String,
    pub max_orders_per_slot: u32,
}

#[derive(Deserialize)]
pub struct SlotQuery {
    pub time: DateTime<Utc>,
}

async fn create_business(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBusinessRequest>,
) -> Result<Json<Business>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if payload.max_orders_per_slot == 0 {
        return Err(AppError::Validation(
            "max_orders_per_slot must be > 0".to_string(),
        ));
    }

    let business = Business {
        id: Uuid::new_v4(),
        name: payload.name,
        address: payload.address,
        max_orders_per_slot: payload.max_orders_per_slot,
        created_at: Utc::now(),
    };

    state.businesses.insert(business.id, business.clone());
    Ok(Json(business))
}

async fn list_businesses(State(state): State<Arc<AppState>>) -> Json<Vec<Business>> {
    let businesses = state
        .businesses
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(businesses)
}

async fn slot_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<SlotAvailability>, AppError> {
    let availability = slots::check_delivery_slot_availability(&state, id, query.time)?;
    Ok(Json(availability))
}
